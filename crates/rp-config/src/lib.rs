#![forbid(unsafe_code)]

//! Runtime configuration for the rockpool server.
//!
//! Defaults overridable through `ROCKPOOL_*` environment variables; CLI
//! flags are layered on top by the server binary.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Log filter directive for the subscriber (`tracing` EnvFilter
    /// syntax).
    pub log_filter: String,
    /// Print a prompt before each line read by the shell.
    pub prompt: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_owned(),
            prompt: true,
        }
    }
}

impl ServerConfig {
    /// Defaults with `ROCKPOOL_LOG` and `ROCKPOOL_PROMPT` applied.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(filter) = std::env::var("ROCKPOOL_LOG") {
            if !filter.is_empty() {
                config.log_filter = filter;
            }
        }
        if let Ok(prompt) = std::env::var("ROCKPOOL_PROMPT") {
            config.prompt = parse_flag(&prompt).unwrap_or(config.prompt);
        }
        config
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = ServerConfig::default();
        assert_eq!(config.log_filter, "info");
        assert!(config.prompt);
    }

    #[test]
    fn flags_parse_common_spellings() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("ON"), Some(true));
        assert_eq!(parse_flag("false"), Some(false));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
