// Connection endpoint assembly

use url::Url;

use crate::error::{ChannelError, Result};

pub const DEFAULT_PATH_PREFIX: &str = "/ws/fall_detection";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Ws,
    Wss,
}

impl Scheme {
    /// Secure transport iff the page itself was loaded over https.
    ///
    /// Accepts both `location.protocol` style (`"https:"`) and bare scheme names.
    pub fn for_page_protocol(protocol: &str) -> Self {
        match protocol.trim_end_matches(':').to_ascii_lowercase().as_str() {
            "https" | "wss" => Scheme::Wss,
            _ => Scheme::Ws,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Ws => "ws",
            Scheme::Wss => "wss",
        }
    }
}

/// Where the alert socket lives: scheme, host (with optional port) and path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    scheme: Scheme,
    host: String,
    path_prefix: String,
}

impl Endpoint {
    pub fn new(scheme: Scheme, host: impl Into<String>) -> Self {
        Self {
            scheme,
            host: host.into(),
            path_prefix: DEFAULT_PATH_PREFIX.to_string(),
        }
    }

    /// Build from the page's `location.protocol` and `location.host`.
    pub fn from_page(protocol: &str, host: &str) -> Self {
        Self::new(Scheme::for_page_protocol(protocol), host)
    }

    /// Build from a server base URL such as `http://localhost:5000` or `wss://alerts.example.com`.
    pub fn from_base_url(base: &str) -> Result<Self> {
        let parsed = Url::parse(base).map_err(|e| ChannelError::Endpoint(format!("{}: {}", base, e)))?;

        let scheme = match parsed.scheme() {
            "http" | "ws" => Scheme::Ws,
            "https" | "wss" => Scheme::Wss,
            other => {
                return Err(ChannelError::Endpoint(format!(
                    "unsupported scheme '{}' in {}",
                    other, base
                )))
            }
        };

        let host = parsed
            .host_str()
            .ok_or_else(|| ChannelError::Endpoint(format!("no host in {}", base)))?;
        let host = match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Self::new(scheme, host))
    }

    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = prefix.into();
        self
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Full socket URL for one user, with the user id encoded as a single path segment.
    pub fn url_for(&self, user_id: &str) -> Result<String> {
        if self.host.is_empty() {
            return Err(ChannelError::Endpoint("empty host".to_string()));
        }

        let base = format!("{}://{}", self.scheme.as_str(), self.host);
        let mut url = Url::parse(&base).map_err(|e| ChannelError::Endpoint(format!("{}: {}", base, e)))?;

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ChannelError::Endpoint(format!("{} cannot carry a path", base)))?;
            segments.clear();
            segments.extend(self.path_prefix.split('/').filter(|s| !s.is_empty()));
            segments.push(user_id);
        }

        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_follows_page_protocol() {
        assert_eq!(Scheme::for_page_protocol("https:"), Scheme::Wss);
        assert_eq!(Scheme::for_page_protocol("http:"), Scheme::Ws);
        assert_eq!(Scheme::for_page_protocol("HTTPS"), Scheme::Wss);
        assert_eq!(Scheme::for_page_protocol("file:"), Scheme::Ws);
    }

    #[test]
    fn test_url_for_page() {
        let endpoint = Endpoint::from_page("https:", "care.example.com");
        assert_eq!(
            endpoint.url_for("42").unwrap(),
            "wss://care.example.com/ws/fall_detection/42"
        );

        let endpoint = Endpoint::from_page("http:", "localhost:5000");
        assert_eq!(
            endpoint.url_for("7").unwrap(),
            "ws://localhost:5000/ws/fall_detection/7"
        );
    }

    #[test]
    fn test_user_id_is_one_segment() {
        let endpoint = Endpoint::from_page("http:", "localhost");
        assert_eq!(
            endpoint.url_for("a/b c").unwrap(),
            "ws://localhost/ws/fall_detection/a%2Fb%20c"
        );
    }

    #[test]
    fn test_from_base_url() {
        let endpoint = Endpoint::from_base_url("http://localhost:5000").unwrap();
        assert_eq!(endpoint.scheme(), Scheme::Ws);
        assert_eq!(endpoint.host(), "localhost:5000");

        let endpoint = Endpoint::from_base_url("https://alerts.example.com/ignored/path").unwrap();
        assert_eq!(endpoint.scheme(), Scheme::Wss);
        assert_eq!(endpoint.host(), "alerts.example.com");

        assert!(Endpoint::from_base_url("ftp://example.com").is_err());
        assert!(Endpoint::from_base_url("not a url").is_err());
    }

    #[test]
    fn test_custom_path_prefix() {
        let endpoint = Endpoint::from_page("http:", "localhost").with_path_prefix("/alerts/");
        assert_eq!(endpoint.url_for("9").unwrap(), "ws://localhost/alerts/9");
    }

    #[test]
    fn test_empty_host_rejected() {
        let endpoint = Endpoint::from_page("http:", "");
        assert!(matches!(endpoint.url_for("1"), Err(ChannelError::Endpoint(_))));
    }
}
