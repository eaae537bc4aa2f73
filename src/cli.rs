//! Interface de linha de comando do EPICFLOW baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (demo, replay, rank, states)
//! e flags globais (--auto-resume, --max-feedback, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// EPICFLOW — Plano de controle determinístico para orquestração multiagente.
#[derive(Debug, Parser)]
#[command(name = "epicflow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Retoma automaticamente o melhor épico pendente encontrado no boot.
    #[arg(long, global = true, default_value_t = false)]
    pub auto_resume: bool,

    /// Número máximo de rodadas de feedback não bloqueante na revisão do plano.
    #[arg(long, global = true)]
    pub max_feedback: Option<u32>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Executa o cenário de demonstração de ponta a ponta.
    Demo,

    /// Reproduz uma sequência de eventos de um arquivo JSON.
    Replay {
        /// Caminho para um arquivo JSON contendo um array de eventos.
        file: PathBuf,

        /// Estado inicial (padrão: boot, ou o snapshot persistido se houver).
        #[arg(long)]
        from_state: Option<String>,
    },

    /// Ordena candidatos a retomada lidos de um arquivo JSON.
    Rank {
        /// Caminho para um arquivo JSON contendo um array de candidatos.
        file: PathBuf,
    },

    /// Lista todos os estados da máquina.
    States,
}
