//! Endpoint candidate resolution.
//!
//! The backend is usually deployed next to the frontend, where `localhost`
//! and `127.0.0.1` do not always resolve to the same listener. Each call to
//! [`EndpointRegistry::resolve_candidates`] rebuilds the ordered list from the
//! current inputs, so a changed override or origin applies to the next request.

use std::sync::{Arc, RwLock};

use url::Url;

/// Port the backend listens on when no explicit base URL is configured.
pub const DEFAULT_BACKEND_PORT: u16 = 8000;
/// Path prefix of the versioned API.
pub const DEFAULT_API_PREFIX: &str = "/api/v1";

// ============================================================================
// Origin
// ============================================================================

/// Scheme and host of the execution context (where the app itself is served from).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    scheme: String,
    host: String,
}

impl Origin {
    #[must_use]
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
        }
    }

    /// Parse an origin such as `http://app.local:3000`. The port is discarded.
    pub fn parse(value: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(value.trim())?;
        let host = url.host_str().ok_or(url::ParseError::EmptyHost)?;
        Ok(Self::new(url.scheme(), host))
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Backend base address on the same host as this origin.
    fn backend_base(&self, port: u16, prefix: &str) -> String {
        format!("{}://{}:{}{}", self.scheme, self.host, port, prefix)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Inputs read on every resolution.
#[derive(Debug, Clone)]
struct EndpointInputs {
    base_override: Option<String>,
    origin: Option<Origin>,
    backend_port: u16,
    api_prefix: String,
}

impl EndpointInputs {
    fn primary_base(&self) -> String {
        if let Some(base) = self.base_override.as_deref().map(str::trim)
            && !base.is_empty()
        {
            return base.to_string();
        }

        match &self.origin {
            Some(origin) => origin.backend_base(self.backend_port, &self.api_prefix),
            None => format!("http://localhost:{}{}", self.backend_port, self.api_prefix),
        }
    }
}

/// Produces the ordered, de-duplicated list of backend base addresses.
///
/// Cloning shares the same inputs.
#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    inputs: Arc<RwLock<EndpointInputs>>,
}

impl Default for EndpointRegistry {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl EndpointRegistry {
    /// Create a registry with the default port and API prefix.
    #[must_use]
    pub fn new(base_override: Option<String>, origin: Option<Origin>) -> Self {
        Self::with_layout(
            base_override,
            origin,
            DEFAULT_BACKEND_PORT,
            DEFAULT_API_PREFIX,
        )
    }

    /// Create a registry with an explicit backend port and API prefix.
    #[must_use]
    pub fn with_layout(
        base_override: Option<String>,
        origin: Option<Origin>,
        backend_port: u16,
        api_prefix: &str,
    ) -> Self {
        Self {
            inputs: Arc::new(RwLock::new(EndpointInputs {
                base_override,
                origin,
                backend_port,
                api_prefix: api_prefix.to_string(),
            })),
        }
    }

    /// Replace the explicit base address override.
    pub fn set_override(&self, base_override: Option<String>) {
        self.inputs
            .write()
            .expect("endpoint lock poisoned")
            .base_override = base_override;
    }

    /// Replace the execution-context origin.
    pub fn set_origin(&self, origin: Option<Origin>) {
        self.inputs.write().expect("endpoint lock poisoned").origin = origin;
    }

    /// The first candidate. Streaming requests only ever target this one.
    pub fn primary(&self) -> String {
        self.inputs
            .read()
            .expect("endpoint lock poisoned")
            .primary_base()
    }

    /// Build the ordered candidate list.
    ///
    /// Order: primary address, its loopback-name variants, then the
    /// same-origin fallback. Never empty and never contains duplicates.
    pub fn resolve_candidates(&self) -> Vec<String> {
        let inputs = self
            .inputs
            .read()
            .expect("endpoint lock poisoned")
            .clone();

        let mut candidates = Candidates::default();
        let primary = inputs.primary_base();
        candidates.add(&primary);
        candidates.add(&primary.replace("://localhost:", "://127.0.0.1:"));
        candidates.add(&primary.replace("://127.0.0.1:", "://localhost:"));

        if let Some(origin) = &inputs.origin {
            candidates.add(&origin.backend_base(inputs.backend_port, &inputs.api_prefix));
        }

        candidates.into_vec()
    }
}

/// Insertion-ordered set of base addresses.
#[derive(Default)]
struct Candidates {
    items: Vec<String>,
}

impl Candidates {
    fn add(&mut self, base: &str) {
        let value = base.trim();
        if value.is_empty() || self.items.iter().any(|existing| existing == value) {
            return;
        }
        self.items.push(value.to_string());
    }

    fn into_vec(self) -> Vec<String> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_duplicates(items: &[String]) -> bool {
        items
            .iter()
            .enumerate()
            .any(|(i, a)| items[i + 1..].iter().any(|b| a == b))
    }

    #[test]
    fn default_targets_localhost_then_loopback_ip() {
        let registry = EndpointRegistry::default();
        assert_eq!(
            registry.resolve_candidates(),
            vec![
                "http://localhost:8000/api/v1".to_string(),
                "http://127.0.0.1:8000/api/v1".to_string(),
            ]
        );
    }

    #[test]
    fn override_comes_first_and_is_trimmed() {
        let registry =
            EndpointRegistry::new(Some("  http://127.0.0.1:9000/api  ".to_string()), None);
        assert_eq!(
            registry.resolve_candidates(),
            vec![
                "http://127.0.0.1:9000/api".to_string(),
                "http://localhost:9000/api".to_string(),
            ]
        );
    }

    #[test]
    fn blank_override_falls_back_to_origin() {
        let origin = Origin::new("https", "mentor.example.com");
        let registry = EndpointRegistry::new(Some("   ".to_string()), Some(origin));
        assert_eq!(
            registry.resolve_candidates(),
            vec!["https://mentor.example.com:8000/api/v1".to_string()]
        );
    }

    #[test]
    fn origin_fallback_follows_override_variants() {
        let origin = Origin::new("http", "10.0.0.5");
        let registry = EndpointRegistry::new(
            Some("http://localhost:8000/api/v1".to_string()),
            Some(origin),
        );
        assert_eq!(
            registry.resolve_candidates(),
            vec![
                "http://localhost:8000/api/v1".to_string(),
                "http://127.0.0.1:8000/api/v1".to_string(),
                "http://10.0.0.5:8000/api/v1".to_string(),
            ]
        );
    }

    #[test]
    fn custom_layout_changes_derived_addresses() {
        let registry = EndpointRegistry::with_layout(None, None, 8080, "/v2");
        assert_eq!(registry.primary(), "http://localhost:8080/v2");
    }

    #[test]
    fn changes_apply_to_next_resolution() {
        let registry = EndpointRegistry::default();
        let shared = registry.clone();
        shared.set_override(Some("https://api.example.com/api/v1".to_string()));

        assert_eq!(
            registry.resolve_candidates(),
            vec!["https://api.example.com/api/v1".to_string()]
        );

        shared.set_override(None);
        shared.set_origin(Some(Origin::new("http", "localhost")));
        assert_eq!(registry.primary(), "http://localhost:8000/api/v1");
    }

    #[test]
    fn never_empty_and_never_duplicated() {
        let overrides = [
            None,
            Some(""),
            Some(" "),
            Some("http://localhost:8000/api/v1"),
            Some("http://127.0.0.1:8000/api/v1"),
            Some("http://localhost/api/v1"),
            Some("https://api.example.com"),
            Some("http://localhost:1/x?y=://127.0.0.1:2"),
        ];
        let origins = [
            None,
            Some(Origin::new("http", "localhost")),
            Some(Origin::new("http", "127.0.0.1")),
            Some(Origin::new("https", "example.com")),
        ];

        for base in overrides {
            for origin in &origins {
                let registry = EndpointRegistry::new(base.map(str::to_string), origin.clone());
                let candidates = registry.resolve_candidates();
                assert!(!candidates.is_empty(), "empty for {base:?} / {origin:?}");
                assert!(
                    !has_duplicates(&candidates),
                    "duplicates for {base:?} / {origin:?}: {candidates:?}"
                );
                assert_eq!(candidates[0], registry.primary());
            }
        }
    }

    #[test]
    fn parse_origin_drops_port_and_path() {
        let origin = Origin::parse("http://app.local:3000/chat").unwrap();
        assert_eq!(origin.scheme(), "http");
        assert_eq!(origin.host(), "app.local");
    }

    #[test]
    fn parse_origin_rejects_garbage() {
        assert!(Origin::parse("not a url").is_err());
    }
}
