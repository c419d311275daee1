//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::HostConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<HostConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config = parse_config(&content)?;
    tracing::debug!(path = %path.display(), "Configuration loaded");
    Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<HostConfig, ConfigError> {
    let config: HostConfig = toml::from_str(content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;
    use crate::widget::{WidgetAppTheme, WidgetNetwork};

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, HostConfig::default());
        assert_eq!(
            config.bridge.allowed_origins,
            vec!["https://swap-widget.perawallet.app".to_string()]
        );
    }

    #[test]
    fn test_full_config() {
        let config = parse_config(
            r##"
            [widget]
            network = "testnet"
            theme = "dark"
            asset_in = 0
            asset_out = 10458941
            iframe_bg = "#242424"
            use_parent_signer = true
            account_address = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ"

            [bridge]
            allowed_origins = ["http://localhost:5173"]

            [quote_service]
            network = "testnet"
            timeout_secs = 10

            [observability]
            log_level = "swap_widget_host=debug"
            log_format = "json"
            "##,
        )
        .unwrap();

        assert_eq!(config.widget.network, Some(WidgetNetwork::Testnet));
        assert_eq!(config.widget.theme, Some(WidgetAppTheme::Dark));
        assert!(config.widget.to_widget_config().validate().is_ok());
        assert_eq!(config.quote_service.timeout_secs, 10);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn test_bad_address_is_parse_error() {
        let err = parse_config("[widget]\naccount_address = \"NOPE\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_semantic_errors_are_collected() {
        let err = parse_config("[widget]\nuse_parent_signer = true\n[quote_service]\ntimeout_secs = 0\n")
            .unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected {other}"),
        }
    }
}
