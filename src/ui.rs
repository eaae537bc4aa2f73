//! Interface de terminal do EPICFLOW — saída colorida.
//!
//! Usa a crate `console` para estilização com cores. O [`TransitionPrinter`]
//! mostra cada transição da máquina de estados no terminal.

use console::Style;

use crate::ranking::parse_updated_at;
use crate::state_machine::{Event, ResumeCandidate, Snapshot, State, TransitionResult};

/// Renderizador das transições e snapshots no terminal.
///
/// Transições que mudam de estado aparecem em verde, eventos ignorados em
/// amarelo e estados de falha/cancelamento em vermelho.
pub struct TransitionPrinter {
    // Estilo verde para mudanças de estado.
    green: Style,
    // Estilo vermelho para estados terminais de falha.
    red: Style,
    // Estilo amarelo para eventos absorvidos.
    yellow: Style,
    // Estilo discreto para comandos e detalhes.
    dim: Style,
}

impl Default for TransitionPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitionPrinter {
    pub fn new() -> Self {
        Self {
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
        }
    }

    /// Formata uma transição em uma ou mais linhas (estado e comandos emitidos).
    pub fn render(&self, from: State, event: &Event, result: &TransitionResult) -> String {
        let reason = result.reason.as_deref().unwrap_or("-");
        let mut out = if !result.changed {
            format!(
                "  {} {from} ⟵ {} ({reason})",
                self.yellow.apply_to("·"),
                event.kind()
            )
        } else {
            let style = match result.state {
                State::Failed | State::Cancelled => &self.red,
                _ => &self.green,
            };
            format!(
                "  {} {from} → {} on {} ({reason})",
                style.apply_to("✓"),
                style.apply_to(result.state),
                event.kind()
            )
        };

        for command in &result.commands {
            let payload = command
                .payload
                .as_ref()
                .map(|p| serde_json::Value::Object(p.clone()).to_string())
                .unwrap_or_default();
            out.push('\n');
            out.push_str(&format!(
                "      {} {} {}",
                self.dim.apply_to("⇢"),
                command.kind,
                self.dim.apply_to(payload)
            ));
        }
        out
    }

    /// Imprime uma transição no stdout.
    pub fn print(&self, from: State, event: &Event, result: &TransitionResult) {
        println!("{}", self.render(from, event, result));
    }

    /// Imprime o snapshot final formatado em JSON.
    pub fn print_snapshot(&self, snapshot: &Snapshot) {
        let style = if snapshot.state.is_terminal() {
            match snapshot.state {
                State::Complete => &self.green,
                _ => &self.red,
            }
        } else {
            &self.yellow
        };
        println!();
        println!("{}", style.apply_to("─── Snapshot ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(snapshot).unwrap_or_default()
        );
    }

    /// Imprime a lista ordenada de candidatos a retomada.
    pub fn print_ranking(&self, ranked: &[ResumeCandidate]) {
        for (i, candidate) in ranked.iter().enumerate() {
            let marker = if candidate.is_executable() {
                self.green.apply_to("ready  ")
            } else {
                self.red.apply_to("blocked")
            };
            println!(
                "  {:>2}. {marker} {} (priority {}, updated {}ms)",
                i + 1,
                candidate.epic_id,
                candidate.priority,
                parse_updated_at(&candidate.updated_at)
            );
        }
    }

    /// Lista todos os estados, destacando os terminais.
    pub fn print_states(&self) {
        for state in State::ALL {
            if state.is_terminal() {
                println!("  {} {}", state, self.dim.apply_to("(terminal)"));
            } else {
                println!("  {state}");
            }
        }
    }
}
