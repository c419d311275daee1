//! Origin allow-listing.

use thiserror::Error;
use url::Url;

use crate::widget::url::DEFAULT_WIDGET_URL;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OriginError {
    #[error("invalid origin '{origin}': {reason}")]
    Invalid { origin: String, reason: String },

    #[error("origin '{0}' has no host (opaque origin)")]
    Opaque(String),

    #[error("origin allow-list is empty")]
    Empty,
}

/// Which senders the host answers, and how replies are addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPolicy {
    /// Accept every origin and post replies with target origin `"*"`.
    Any,
    /// Accept only these normalized origins. Replies target the requester's
    /// exact origin.
    AllowList(Vec<String>),
}

impl OriginPolicy {
    /// Build a policy from configured entries. A `"*"` entry yields `Any`.
    pub fn allow_list<I, S>(origins: I) -> Result<Self, OriginError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized = Vec::new();
        for origin in origins {
            let origin = origin.as_ref().trim();
            if origin == "*" {
                return Ok(OriginPolicy::Any);
            }
            let origin = normalize_origin(origin)?;
            if !normalized.contains(&origin) {
                normalized.push(origin);
            }
        }
        if normalized.is_empty() {
            return Err(OriginError::Empty);
        }
        Ok(OriginPolicy::AllowList(normalized))
    }

    pub fn allows(&self, origin: &str) -> bool {
        match self {
            OriginPolicy::Any => true,
            OriginPolicy::AllowList(list) => normalize_origin(origin)
                .map(|o| list.contains(&o))
                .unwrap_or(false),
        }
    }

    /// Target origin for a reply to a message received from `requester`.
    pub fn target_origin_for(&self, requester: &str) -> String {
        match self {
            OriginPolicy::Any => "*".to_string(),
            OriginPolicy::AllowList(_) => requester.to_string(),
        }
    }
}

impl Default for OriginPolicy {
    /// Only the hosted widget.
    fn default() -> Self {
        let origin = normalize_origin(DEFAULT_WIDGET_URL)
            .unwrap_or_else(|_| DEFAULT_WIDGET_URL.to_string());
        OriginPolicy::AllowList(vec![origin])
    }
}

/// Reduce a URL or origin string to `scheme://host[:port]`.
pub fn normalize_origin(origin: &str) -> Result<String, OriginError> {
    let url = Url::parse(origin).map_err(|e| OriginError::Invalid {
        origin: origin.to_string(),
        reason: e.to_string(),
    })?;
    let origin_of = url.origin();
    if !origin_of.is_tuple() {
        return Err(OriginError::Opaque(origin.to_string()));
    }
    Ok(origin_of.ascii_serialization())
}
