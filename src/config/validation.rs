//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the signer mode has an account to sign for
//! - Check URLs, origins and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HostConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::bridge::origin::normalize_origin;
use crate::config::schema::HostConfig;

/// One semantic problem, tied to the config key that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check everything serde cannot.
pub fn validate_config(config: &HostConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let widget = &config.widget;
    if let Err(e) = Url::parse(&widget.base_url) {
        errors.push(ValidationError::new("widget.base_url", e.to_string()));
    }
    if widget.use_parent_signer && widget.account_address.is_none() {
        errors.push(ValidationError::new(
            "widget.account_address",
            "required when use_parent_signer is true",
        ));
    }
    if widget.iframe_bg.as_deref().is_some_and(str::is_empty) {
        errors.push(ValidationError::new("widget.iframe_bg", "must not be empty"));
    }
    if widget.asset_in.is_some() && widget.asset_in == widget.asset_out {
        errors.push(ValidationError::new(
            "widget.asset_out",
            "must differ from widget.asset_in",
        ));
    }

    if config.bridge.allowed_origins.is_empty() {
        errors.push(ValidationError::new(
            "bridge.allowed_origins",
            "must list at least one origin (use \"*\" to accept any)",
        ));
    }
    for (i, origin) in config.bridge.allowed_origins.iter().enumerate() {
        if origin.trim() == "*" {
            continue;
        }
        if let Err(e) = normalize_origin(origin.trim()) {
            errors.push(ValidationError::new(
                format!("bridge.allowed_origins[{i}]"),
                e.to_string(),
            ));
        }
    }

    if let Some(base_url) = &config.quote_service.base_url {
        if let Err(e) = Url::parse(base_url) {
            errors.push(ValidationError::new("quote_service.base_url", e.to_string()));
        }
    }
    if config.quote_service.timeout_secs == 0 {
        errors.push(ValidationError::new(
            "quote_service.timeout_secs",
            "must be greater than 0",
        ));
    }

    if let Err(e) = EnvFilter::try_new(&config.observability.log_level) {
        errors.push(ValidationError::new("observability.log_level", e.to_string()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
