// /proxy and the catch-all both end up in the relay service, the only difference is where the
// target url comes from
use axum::{
    Extension, Router,
    http::Uri,
    response::Response,
    routing::get,
};
use serde::Deserialize;
use tracing::{debug, error};
use url::Url;
use validator::Validate;

use crate::server::{
    error::{AppResult, Error},
    extractors::{ForwardedCookie, ValidatedQuery},
    services::EdgeServices,
};

#[derive(Deserialize, Validate)]
pub struct ProxyQuery {
    #[validate(length(min = 1, message = "url is required"))]
    pub url: String,
}

pub struct ProxyController;

impl ProxyController {
    pub fn app() -> Router {
        Router::new().route("/proxy", get(Self::proxy_get))
    }

    /// target has to be an absolute http(s) url with a host, checked before anything goes out
    pub fn parse_target(raw: &str) -> AppResult<Url> {
        let target = Url::parse(raw.trim()).map_err(|e| {
            debug!("Rejecting target '{}': {}", raw, e);
            Error::BadRequest("Invalid url".to_string())
        })?;

        if !matches!(target.scheme(), "http" | "https") || target.host_str().is_none() {
            debug!("Rejecting non http target '{}'", raw);
            return Err(Error::BadRequest("Invalid url".to_string()));
        }

        Ok(target)
    }

    async fn proxy_get(
        Extension(services): Extension<EdgeServices>,
        ValidatedQuery(params): ValidatedQuery<ProxyQuery>,
        ForwardedCookie(cookie): ForwardedCookie,
    ) -> AppResult<Response> {
        let target = Self::parse_target(&params.url)?;
        debug!("Proxying: {}", target);

        services.relay.relay(target, cookie).await
    }

    /// anything that isn't a reserved route gets glued onto the fallback upstream
    pub async fn proxy_fallback(
        Extension(services): Extension<EdgeServices>,
        ForwardedCookie(cookie): ForwardedCookie,
        uri: Uri,
    ) -> AppResult<Response> {
        if services.config.disable_fallback {
            return Err(Error::NotFound);
        }

        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        let raw = format!(
            "{}{}",
            services.config.fallback_upstream.trim_end_matches('/'),
            path_and_query
        );

        let target = Self::parse_target(&raw).inspect_err(|_| {
            error!("Fallback produced an unusable target: {}", raw);
        })?;
        debug!("Fallback proxying {} -> {}", uri, target);

        services.relay.relay(target, cookie).await
    }
}
