//! Frontend redirect URLs. The SPA may use a hash router, so paths are
//! assembled as `{base}/#/path` when enabled.

use url::Url;

use crate::config::FrontendConfig;

pub const DEFAULT_FRONT_PATH: &str = "/?login=success";

#[derive(Debug, Clone)]
pub struct FrontendUrls {
    base: String,
    use_hash_router: bool,
    allowed_origins: Vec<String>,
}

impl FrontendUrls {
    pub fn new(config: &FrontendConfig) -> Self {
        Self {
            base: config.base.trim_end_matches('/').to_string(),
            use_hash_router: config.use_hash_router,
            allowed_origins: config.allowed_origins.clone(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn join(&self, path: &str) -> String {
        let path = if path.is_empty() { "/" } else { path };

        if self.use_hash_router {
            if path.starts_with("/#/") {
                return format!("{}{}", self.base, path);
            }
            let path = if path.starts_with('/') {
                path.to_string()
            } else {
                format!("/{path}")
            };
            return format!("{}/#{}", self.base, path);
        }

        if path.starts_with('/') {
            format!("{}{}", self.base, path)
        } else {
            format!("{}/{}", self.base, path)
        }
    }

    /// Turns a `next` parameter (encoded or not) into a frontend URL.
    pub fn build_front_url(&self, next: Option<&str>) -> String {
        let Some(next) = next.filter(|n| !n.trim().is_empty()) else {
            return self.default_url();
        };

        let decoded = urlencoding::decode(next)
            .map(|d| d.into_owned())
            .unwrap_or_else(|_| next.to_string());

        if decoded.starts_with("http://") || decoded.starts_with("https://") {
            if self.is_allowed_absolute(&decoded) {
                return decoded;
            }
            tracing::warn!(target_url = %decoded, "rejected redirect to foreign origin");
            return self.default_url();
        }
        if decoded.starts_with('/') {
            return self.join(&decoded);
        }
        self.join(&format!("/{decoded}"))
    }

    /// Where the OAuth callback should send the browser for a returned `state`.
    pub fn resolve_return_url(&self, state: Option<&str>) -> String {
        match state.filter(|s| !s.trim().is_empty()) {
            Some(state) if state.starts_with("http://") || state.starts_with("https://") => {
                if self.is_allowed_absolute(state) {
                    state.to_string()
                } else {
                    tracing::warn!(target_url = %state, "rejected callback state for foreign origin");
                    self.default_url()
                }
            }
            Some(state) => self.build_front_url(Some(state)),
            None => self.default_url(),
        }
    }

    pub fn default_url(&self) -> String {
        self.join(DEFAULT_FRONT_PATH)
    }

    fn is_allowed_absolute(&self, url: &str) -> bool {
        let Ok(target) = Url::parse(url) else {
            return false;
        };
        let origin = target.origin();
        if !origin.is_tuple() {
            return false;
        }
        std::iter::once(self.base.as_str())
            .chain(self.allowed_origins.iter().map(String::as_str))
            .filter_map(|allowed| Url::parse(allowed).ok())
            .any(|allowed| allowed.origin() == origin)
    }
}

/// Appends `key=value`, choosing `?` or `&`. Both sides are fully percent-encoded.
pub fn append_query(url: &str, key: &str, value: &str) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!(
        "{url}{sep}{}={}",
        urlencoding::encode(key),
        urlencoding::encode(value)
    )
}

/// Serialized origin (`scheme://host[:port]`, default port omitted), if `url` has one.
pub fn origin_of(url: &str) -> Option<String> {
    let origin = Url::parse(url).ok()?.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}
