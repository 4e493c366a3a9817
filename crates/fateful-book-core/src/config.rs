//! GatewayConfig — defaults, then an optional TOML file, then `FATEFUL__*` environment overrides.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::conversation::TurnLimits;
use crate::prompts::ReplyShape;

pub const DEFAULT_CONFIG_PATH: &str = "config/gateway";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),
    #[error("min_turns must be at least 1 (got {0})")]
    MinTurns(u32),
    #[error("max_turns ({max}) must not be below min_turns ({min})")]
    MaxBelowMin { min: u32, max: u32 },
    #[error("{key} must be at least 1 (got {value})")]
    ZeroLimit { key: &'static str, value: u64 },
}

/// Which generation backend to use. `Auto` picks the first provider with a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Auto,
    Groq,
    OpenAi,
    OpenRouter,
    Gemini,
    Mock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub llm_provider: LlmProvider,
    #[serde(default)]
    pub llm_model: Option<String>,
    pub min_turns: u32,
    pub max_turns: u32,
    pub reply_max_sentences: usize,
    pub reply_max_chars: usize,
    pub covers_enabled: bool,
    pub ledger_path: String,
    /// Seconds an untouched session is kept.
    pub session_idle_secs: u64,
    /// Seconds a finished session is kept for its shadow request.
    pub session_finished_secs: u64,
}

impl GatewayConfig {
    /// Reads the file named by `FATEFUL_CONFIG` (default `config/gateway`, extension optional).
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("FATEFUL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let built = config::Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 3000_i64)?
            .set_default("llm_provider", "auto")?
            .set_default("min_turns", 3_i64)?
            .set_default("max_turns", 15_i64)?
            .set_default("reply_max_sentences", 2_i64)?
            .set_default("reply_max_chars", 100_i64)?
            .set_default("covers_enabled", true)?
            .set_default("ledger_path", crate::ledger::DEFAULT_LEDGER_PATH)?
            .set_default("session_idle_secs", 1800_i64)?
            .set_default("session_finished_secs", 300_i64)?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("FATEFUL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: GatewayConfig = built.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_turns < 1 {
            return Err(ConfigError::MinTurns(self.min_turns));
        }
        if self.max_turns < self.min_turns {
            return Err(ConfigError::MaxBelowMin {
                min: self.min_turns,
                max: self.max_turns,
            });
        }
        let positive = [
            ("reply_max_sentences", self.reply_max_sentences as u64),
            ("reply_max_chars", self.reply_max_chars as u64),
            ("session_idle_secs", self.session_idle_secs),
            ("session_finished_secs", self.session_finished_secs),
        ];
        if let Some(&(key, value)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::ZeroLimit { key, value });
        }
        Ok(())
    }

    pub fn turn_limits(&self) -> TurnLimits {
        TurnLimits {
            min_turns: self.min_turns,
            max_turns: self.max_turns,
        }
    }

    pub fn reply_shape(&self) -> ReplyShape {
        ReplyShape {
            max_sentences: self.reply_max_sentences,
            max_chars: self.reply_max_chars,
        }
    }

    pub fn session_idle_ttl(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    pub fn session_finished_ttl(&self) -> Duration {
        Duration::from_secs(self.session_finished_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_without_a_file() {
        let cfg = GatewayConfig::load_from("does/not/exist").unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.llm_provider, LlmProvider::Auto);
        assert_eq!(cfg.turn_limits(), TurnLimits::default());
        assert_eq!(cfg.reply_shape(), ReplyShape::default());
        assert!(cfg.covers_enabled);
        assert!(cfg.llm_model.is_none());
        assert_eq!(cfg.session_idle_ttl(), Duration::from_secs(1800));
        assert_eq!(cfg.session_finished_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "min_turns = 1\nmax_turns = 10\nllm_provider = \"openrouter\"\nport = 8080").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let cfg = GatewayConfig::load_from(&path).unwrap();
        assert_eq!(cfg.turn_limits(), TurnLimits { min_turns: 1, max_turns: 10 });
        assert_eq!(cfg.llm_provider, LlmProvider::OpenRouter);
        assert_eq!(cfg.bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "min_turns = 5\nmax_turns = 4").unwrap();
        let path = file.path().to_string_lossy().to_string();

        assert!(matches!(
            GatewayConfig::load_from(&path),
            Err(ConfigError::MaxBelowMin { min: 5, max: 4 })
        ));
    }

    #[test]
    fn zero_minimum_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "min_turns = 0").unwrap();
        let path = file.path().to_string_lossy().to_string();
        assert!(matches!(GatewayConfig::load_from(&path), Err(ConfigError::MinTurns(0))));
    }

    #[test]
    fn zero_reply_shape_is_rejected() {
        for line in ["reply_max_sentences = 0", "reply_max_chars = 0"] {
            let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
            writeln!(file, "{line}").unwrap();
            let path = file.path().to_string_lossy().to_string();
            assert!(matches!(
                GatewayConfig::load_from(&path),
                Err(ConfigError::ZeroLimit { value: 0, .. })
            ));
        }
    }
}
