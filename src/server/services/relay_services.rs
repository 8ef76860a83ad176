use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use tracing::{debug, error, info};
use url::Url;

use crate::server::{
    error::{AppResult, Error},
    utils::{
        encoding_utils::decode_body,
        header_utils::{BypassPolicy, UpstreamRequest, forwardable_response_headers},
        playlist_utils::{HLS_PLAYLIST_CONTENT_TYPE, PlaylistUtil},
        relay_stream::RelayStream,
    },
};

// same cap reqwest's default policy uses
const MAX_REDIRECTS: usize = 10;

pub type DynRelayService = Arc<dyn RelayServiceTrait + Send + Sync>;

#[async_trait]
pub trait RelayServiceTrait {
    /// one GET upstream, answered with the upstream status and headers
    ///
    /// `.m3u8` targets are buffered and rewritten, everything else is streamed through
    async fn relay(&self, target: Url, cookie: Option<String>) -> AppResult<Response>;
}

/// expects a client built with `redirect::Policy::none()`, redirects are followed here
pub struct RelayService {
    http: reqwest::Client,
    bypass: BypassPolicy,
}

impl RelayService {
    pub fn new(http: reqwest::Client, bypass: BypassPolicy) -> Self {
        Self { http, bypass }
    }

    /// sends the GET and follows redirects by hand, rebuilding the headers on every hop so Host
    /// and the bypass headers always belong to the host being asked
    async fn send_following_redirects(
        &self,
        target: Url,
        cookie: Option<&str>,
    ) -> AppResult<reqwest::Response> {
        let requested = target.to_string();
        let requested_host = target.host_str().map(str::to_ascii_lowercase);
        let mut next = target;

        for _ in 0..=MAX_REDIRECTS {
            // the client's cookie only goes to the host it was asked for
            let same_host = next.host_str().map(str::to_ascii_lowercase) == requested_host;
            let UpstreamRequest { target, headers } =
                UpstreamRequest::new(next, &self.bypass, cookie.filter(|_| same_host));

            let upstream = self
                .http
                .get(target.clone())
                .headers(headers)
                .send()
                .await
                .map_err(|e| {
                    error!("Upstream request to {} failed: {}", target, e);
                    Error::UpstreamTransport(format!("{}: {}", target, e))
                })?;

            match Self::redirect_target(&upstream, &target) {
                Some(location) => {
                    debug!("Upstream {} redirected to {}", target, location);
                    next = location;
                }
                None => return Ok(upstream),
            }
        }

        error!(
            "Upstream {} redirected more than {} times",
            requested, MAX_REDIRECTS
        );
        Err(Error::UpstreamTransport(format!(
            "{}: too many redirects",
            requested
        )))
    }

    fn redirect_target(upstream: &reqwest::Response, current: &Url) -> Option<Url> {
        if !matches!(
            upstream.status(),
            StatusCode::MOVED_PERMANENTLY
                | StatusCode::FOUND
                | StatusCode::SEE_OTHER
                | StatusCode::TEMPORARY_REDIRECT
                | StatusCode::PERMANENT_REDIRECT
        ) {
            return None;
        }

        let location = upstream.headers().get(header::LOCATION)?.to_str().ok()?;
        let location = current.join(location).ok()?;
        matches!(location.scheme(), "http" | "https").then_some(location)
    }

    fn build_response(status: StatusCode, headers: HeaderMap, body: Body) -> Response {
        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }

    async fn rewrite_playlist(
        upstream: reqwest::Response,
        status: StatusCode,
        mut headers: HeaderMap,
    ) -> AppResult<Response> {
        // relative entries resolve against where the playlist actually came from
        let playlist_url = upstream.url().clone();

        let content_encoding = headers
            .get(header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = upstream.bytes().await.map_err(|e| {
            error!("Failed to read playlist from {}: {}", playlist_url, e);
            Error::UpstreamTransport(format!("failed to read playlist from {}: {}", playlist_url, e))
        })?;
        debug!("Read {} playlist bytes from {}", bytes.len(), playlist_url);

        let decoded = decode_body(&bytes, content_encoding.as_deref())?;
        let text = String::from_utf8(decoded).map_err(|e| {
            error!("Playlist from {} is not utf-8: {}", playlist_url, e);
            Error::UpstreamFormat(format!("playlist from {} is not utf-8", playlist_url))
        })?;

        let rewritten = PlaylistUtil::rewrite(&text, &playlist_url);

        headers.remove(header::CONTENT_LENGTH);
        headers.remove(header::CONTENT_ENCODING);
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(HLS_PLAYLIST_CONTENT_TYPE),
        );

        Ok(Self::build_response(status, headers, Body::from(rewritten)))
    }
}

#[async_trait]
impl RelayServiceTrait for RelayService {
    async fn relay(&self, target: Url, cookie: Option<String>) -> AppResult<Response> {
        debug!("Relaying {}", target);

        let upstream = self
            .send_following_redirects(target.clone(), cookie.as_deref())
            .await?;

        let status = upstream.status();
        let headers = forwardable_response_headers(upstream.headers());
        debug!("Upstream {} answered {}", upstream.url(), status);

        // error pages keep their body as is, there's nothing to rewrite in them
        if PlaylistUtil::is_playlist_url(&target) && status.is_success() {
            return Self::rewrite_playlist(upstream, status, headers).await;
        }

        if !status.is_success() {
            info!("Upstream {} returned {}, passing it through", target, status);
        }

        let body = Body::from_stream(RelayStream::new(
            upstream.bytes_stream(),
            target.to_string(),
        ));

        Ok(Self::build_response(status, headers, body))
    }
}
