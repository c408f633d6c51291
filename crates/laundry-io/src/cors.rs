//! Cross-origin headers for browser clients.

use tiny_http::Header;

pub const DEFAULT_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "https://laundryprogress.vercel.app",
];

/// Methods granted to preflights. Credentialed requests treat `*` as a
/// literal method name, so the list is spelled out.
pub const ALLOWED_METHODS: &[&str] = &["GET", "POST", "OPTIONS"];

const PREFLIGHT_MAX_AGE_SECS: &str = "600";

/// An `OPTIONS` request carrying both `Origin` and
/// `Access-Control-Request-Method`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preflight {
    pub origin: String,
    pub request_method: String,
    /// `Access-Control-Request-Headers`, echoed back when granted.
    pub request_headers: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed: Vec<String>,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect())
    }
}

impl CorsPolicy {
    /// An entry of `*` admits every origin.
    pub fn new(allowed: Vec<String>) -> Self {
        Self { allowed }
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.allowed.iter().any(|o| o == "*" || o == origin)
    }

    /// Reason a preflight is refused, if it is.
    pub fn preflight_failure(&self, preflight: &Preflight) -> Option<&'static str> {
        if !self.allows(&preflight.origin) {
            return Some("Disallowed CORS origin");
        }
        let method = preflight.request_method.trim();
        if !ALLOWED_METHODS.iter().any(|m| m.eq_ignore_ascii_case(method)) {
            return Some("Disallowed CORS method");
        }
        None
    }

    /// Header pairs for a response to a request from `origin`. Nothing is
    /// added for requests without an allowed `Origin`.
    pub fn header_pairs(
        &self,
        origin: Option<&str>,
        preflight: Option<&Preflight>,
    ) -> Vec<(&'static str, String)> {
        let Some(origin) = origin.filter(|o| self.allows(o)) else {
            return Vec::new();
        };

        let mut pairs = vec![
            ("Access-Control-Allow-Origin", origin.to_string()),
            ("Access-Control-Allow-Credentials", "true".to_string()),
            ("Vary", "Origin".to_string()),
        ];
        if let Some(preflight) = preflight {
            pairs.push(("Access-Control-Allow-Methods", ALLOWED_METHODS.join(", ")));
            if let Some(requested) = &preflight.request_headers {
                pairs.push(("Access-Control-Allow-Headers", requested.clone()));
            }
            pairs.push(("Access-Control-Max-Age", PREFLIGHT_MAX_AGE_SECS.to_string()));
        }
        pairs
    }

    pub fn headers(&self, origin: Option<&str>, preflight: Option<&Preflight>) -> Vec<Header> {
        self.header_pairs(origin, preflight)
            .into_iter()
            .filter_map(|(field, value)| {
                Header::from_bytes(field.as_bytes(), value.as_bytes()).ok()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preflight(origin: &str, method: &str, headers: Option<&str>) -> Preflight {
        Preflight {
            origin: origin.to_string(),
            request_method: method.to_string(),
            request_headers: headers.map(str::to_string),
        }
    }

    #[test]
    fn default_policy_admits_known_frontends_only() {
        let cors = CorsPolicy::default();
        assert!(cors.allows("http://localhost:3000"));
        assert!(cors.allows("https://laundryprogress.vercel.app"));
        assert!(!cors.allows("https://evil.example"));

        assert!(cors.header_pairs(Some("https://evil.example"), None).is_empty());
        assert!(cors.header_pairs(None, None).is_empty());
    }

    #[test]
    fn allowed_origin_is_echoed_with_credentials() {
        let cors = CorsPolicy::default();
        let pairs = cors.header_pairs(Some("http://localhost:3000"), None);
        assert!(pairs.contains(&(
            "Access-Control-Allow-Origin",
            "http://localhost:3000".to_string()
        )));
        assert!(pairs.contains(&("Access-Control-Allow-Credentials", "true".to_string())));
        assert!(!pairs.iter().any(|(f, _)| *f == "Access-Control-Allow-Methods"));
    }

    #[test]
    fn credentialed_preflight_lists_methods_and_echoes_headers() {
        let cors = CorsPolicy::default();
        let origin = "https://laundryprogress.vercel.app";
        let request = preflight(origin, "POST", Some("content-type"));
        assert_eq!(cors.preflight_failure(&request), None);

        let pairs = cors.header_pairs(Some(origin), Some(&request));
        let granted = |field: &str| {
            pairs
                .iter()
                .find(|(f, _)| *f == field)
                .map(|(_, value)| value.as_str())
        };
        assert_eq!(granted("Access-Control-Allow-Methods"), Some("GET, POST, OPTIONS"));
        assert_eq!(granted("Access-Control-Allow-Headers"), Some("content-type"));
        assert!(pairs.contains(&("Access-Control-Allow-Credentials", "true".to_string())));
        assert!(!pairs.iter().any(|(_, value)| value == "*"));
        assert_eq!(cors.headers(Some(origin), Some(&request)).len(), 6);
    }

    #[test]
    fn preflight_without_requested_headers_grants_none() {
        let cors = CorsPolicy::default();
        let request = preflight("http://localhost:3000", "GET", None);
        let pairs = cors.header_pairs(Some("http://localhost:3000"), Some(&request));
        assert!(!pairs.iter().any(|(f, _)| *f == "Access-Control-Allow-Headers"));
    }

    #[test]
    fn refuses_unknown_origins_and_methods() {
        let cors = CorsPolicy::default();
        assert_eq!(
            cors.preflight_failure(&preflight("https://evil.example", "POST", None)),
            Some("Disallowed CORS origin")
        );
        assert_eq!(
            cors.preflight_failure(&preflight("http://localhost:3000", "DELETE", None)),
            Some("Disallowed CORS method")
        );
        assert_eq!(
            cors.preflight_failure(&preflight("http://localhost:3000", "post", None)),
            None
        );
    }
}
