use axum::http::{HeaderMap, HeaderName, HeaderValue, header};
use tracing::{debug, warn};
use url::Url;

use crate::config::AppConfig;

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// hyper sets these per connection, copying them from upstream breaks framing
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// hosts that reject requests without a referer/origin they recognize
#[derive(Debug, Clone)]
pub struct BypassPolicy {
    hosts: Vec<String>,
    origin: String,
}

impl BypassPolicy {
    pub fn new(hosts: Vec<String>, origin: String) -> Self {
        let hosts = hosts
            .into_iter()
            .map(|h| h.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();

        Self {
            hosts,
            origin: origin.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.bypass_hosts.clone(), config.bypass_origin.clone())
    }

    /// exact host or any subdomain of it
    pub fn matches(&self, target: &Url) -> bool {
        let Some(host) = target.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();

        self.hosts
            .iter()
            .any(|h| host == *h || host.ends_with(&format!(".{}", h)))
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn referer(&self) -> String {
        format!("{}/", self.origin)
    }
}

/// everything needed to make the one GET we send upstream
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub target: Url,
    pub headers: HeaderMap,
}

impl UpstreamRequest {
    pub fn new(target: Url, bypass: &BypassPolicy, cookie: Option<&str>) -> Self {
        let mut headers = HeaderMap::new();

        if let Some(host) = Self::host_header(&target) {
            headers.insert(header::HOST, host);
        }
        headers.insert(header::USER_AGENT, HeaderValue::from_static(DESKTOP_USER_AGENT));
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

        if bypass.matches(&target) {
            debug!("Applying bypass headers for {}", target);
            Self::insert_str(&mut headers, header::REFERER, &bypass.referer());
            Self::insert_str(&mut headers, header::ORIGIN, bypass.origin());
        }

        if let Some(cookie) = cookie {
            Self::insert_str(&mut headers, header::COOKIE, cookie);
        }

        Self { target, headers }
    }

    pub fn is_bypassed(&self) -> bool {
        self.headers.contains_key(header::ORIGIN)
    }

    fn host_header(target: &Url) -> Option<HeaderValue> {
        let host = target.host_str()?;
        // port() is None for the scheme default so this matches what a browser sends
        let value = match target.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        HeaderValue::from_str(&value).ok()
    }

    fn insert_str(headers: &mut HeaderMap, name: HeaderName, value: &str) {
        match HeaderValue::from_str(value) {
            Ok(v) => {
                headers.insert(name, v);
            }
            Err(e) => warn!("Dropping invalid {} header value: {}", name, e),
        }
    }
}

/// upstream response headers minus the hop-by-hop ones
pub fn forwardable_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());

    for (name, value) in upstream {
        if HOP_BY_HOP.contains(&name.as_str()) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    headers
}
