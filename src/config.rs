//! Configuração do EPICFLOW carregada a partir de `epicflow.toml`.
//!
//! A struct [`EpicflowConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `EPICFLOW_AUTO_RESUME` tem precedência sobre o arquivo.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{EpicflowError, Result};
use crate::state_machine::{Context, DEFAULT_MAX_REVIEWER_FEEDBACK_COUNT};

/// Nome do arquivo de configuração procurado no diretório atual.
pub const CONFIG_FILE: &str = "epicflow.toml";

/// Configuração de nível superior carregada de `epicflow.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct EpicflowConfig {
    /// Retoma automaticamente o melhor épico pendente sem perguntar ao usuário.
    #[serde(default)]
    pub auto_resume: bool,

    /// Rodadas de feedback não bloqueante aceitas antes de forçar o avanço para `observe`.
    #[serde(default = "default_max_reviewer_feedback_count")]
    pub max_reviewer_feedback_count: u32,

    /// Caminho do snapshot persistido após cada evento. `None` desativa a persistência.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,

    /// Filtro de log no formato do `EnvFilter` do tracing.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

// Valor padrão para o limite de feedback: 3.
fn default_max_reviewer_feedback_count() -> u32 {
    DEFAULT_MAX_REVIEWER_FEEDBACK_COUNT
}

// Valor padrão para o filtro de log: "epicflow=info".
fn default_log_filter() -> String {
    "epicflow=info".to_string()
}

impl Default for EpicflowConfig {
    fn default() -> Self {
        Self {
            auto_resume: false,
            max_reviewer_feedback_count: default_max_reviewer_feedback_count(),
            snapshot_path: None,
            log_filter: default_log_filter(),
        }
    }
}

impl EpicflowConfig {
    /// Carrega a configuração de `epicflow.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Carrega a configuração de um caminho explícito, aplicando as variáveis de ambiente.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<EpicflowConfig>(&contents)?
        } else {
            Self::default()
        };

        // Variável de ambiente tem precedência sobre o arquivo de configuração.
        if let Ok(raw) = std::env::var("EPICFLOW_AUTO_RESUME")
            && let Some(flag) = parse_flag(&raw)
        {
            config.auto_resume = flag;
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejeita valores que tornariam a máquina de estados incoerente.
    pub fn validate(&self) -> Result<()> {
        if self.max_reviewer_feedback_count == 0 {
            return Err(EpicflowError::Config(
                "max_reviewer_feedback_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Contexto inicial de uma nova execução derivado desta configuração.
    pub fn initial_context(&self) -> Context {
        Context {
            auto_resume: self.auto_resume,
            max_reviewer_feedback_count: self.max_reviewer_feedback_count,
            ..Context::default()
        }
    }
}

// Interpreta "1/true/yes/on" e "0/false/no/off"; qualquer outro valor é ignorado.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = EpicflowConfig::default();
        assert!(!config.auto_resume);
        assert_eq!(config.max_reviewer_feedback_count, 3);
        assert!(config.snapshot_path.is_none());
        assert_eq!(config.log_filter, "epicflow=info");
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            max_reviewer_feedback_count = 5
            snapshot_path = "run/snapshot.json"
        "#;
        let config: EpicflowConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.max_reviewer_feedback_count, 5);
        assert_eq!(
            config.snapshot_path.as_deref(),
            Some(Path::new("run/snapshot.json"))
        );
        assert!(!config.auto_resume);
        assert_eq!(config.log_filter, "epicflow=info");
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "log_filter = \"epicflow=debug\"\n").unwrap();
        let config = EpicflowConfig::load_from(&path).unwrap();
        assert_eq!(config.log_filter, "epicflow=debug");
    }

    #[test]
    fn load_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EpicflowConfig::load_from(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.max_reviewer_feedback_count, 3);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "auto_resume = \"sometimes\"").unwrap();
        assert!(EpicflowConfig::load_from(&path).is_err());
    }

    #[test]
    fn zero_feedback_bound_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "max_reviewer_feedback_count = 0").unwrap();
        let err = EpicflowConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, EpicflowError::Config(_)));
    }

    #[test]
    fn initial_context_carries_settings() {
        let config = EpicflowConfig {
            auto_resume: true,
            max_reviewer_feedback_count: 7,
            ..Default::default()
        };
        let ctx = config.initial_context();
        assert!(ctx.auto_resume);
        assert_eq!(ctx.max_reviewer_feedback_count, 7);
        assert_eq!(ctx.reviewer_feedback_count, 0);
    }

    #[test]
    fn parse_flag_values() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" yes "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
