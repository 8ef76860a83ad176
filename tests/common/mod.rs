#![allow(dead_code)]

use std::convert::Infallible;
use std::io::Write;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing,
};
use edge_relay::{AppConfig, RelayApplicationServer, server::services::EdgeServices};
use flate2::{Compression, write::GzEncoder};
use serde_json::json;
use tokio::{
    net::TcpListener,
    sync::{Notify, mpsc},
};
use tower::ServiceExt;

pub const MASTER_PLAYLIST: &str = "#EXTM3U\n#EXT-X-VERSION:3\n#EXTINF:10.0,\nseg1.ts\n#EXTINF:10.0,\n/other/seg2.ts\nhttps://cdn.example.com/abs/seg3.ts\n\n";

pub const SEGMENT_BYTES: &[u8] = b"\x47\x40\x00\x10 not really a transport stream";

pub const SLOW_FIRST_CHUNK: &[u8] = b"\x47first chunk, the rest never comes";

pub const EPG_DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE tv SYSTEM "xmltv.dtd">
<tv generator-info-name="test">
  <channel id="news.us"><display-name>News</display-name></channel>
  <programme start="20260101120000 +0000" stop="20260101130000 +0000" channel="news.us">
    <title lang="en">Midday News</title>
    <sub-title lang="en">Headlines</sub-title>
    <desc lang="en">Top stories &amp; weather</desc>
  </programme>
  <programme start="20260101120000 +0000" stop="20260101140000 +0000" channel="sports.us">
    <title lang="en">Match of the Day</title>
  </programme>
  <programme start="20260101130000 +0000" stop="20260101140000 +0000" channel="news.us">
    <title lang="en">Afternoon Report</title>
  </programme>
</tv>
"#;

#[derive(Clone)]
struct UpstreamState {
    hits: Arc<AtomicUsize>,
    port: u16,
    slow_closed: Arc<Notify>,
}

/// a fake cdn on 127.0.0.1 that counts every request it gets
pub struct TestUpstream {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
    slow_closed: Arc<Notify>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestUpstream {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let state = UpstreamState {
            hits: Arc::new(AtomicUsize::new(0)),
            port: addr.port(),
            slow_closed: Arc::new(Notify::new()),
        };
        let hits = state.hits.clone();
        let slow_closed = state.slow_closed.clone();

        let router = Router::new()
            .route("/live/master.m3u8", routing::get(master_playlist))
            .route("/live/seg1.ts", routing::get(segment))
            .route("/gzip/list.m3u8", routing::get(gzip_playlist))
            .route("/missing.m3u8", routing::get(missing))
            .route("/echo", routing::get(echo))
            .route("/to-localhost", routing::get(redirect_to_localhost))
            .route("/moved/master.m3u8", routing::get(moved_playlist))
            .route("/loop", routing::get(redirect_loop))
            .route("/slow.ts", routing::get(slow_segment))
            .route("/epg.xml", routing::get(epg_document))
            .route("/broken.xml", routing::get(broken_document))
            .with_state(state);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server = axum::serve(listener, router).with_graceful_shutdown(async {
            shutdown_rx.await.ok();
        });

        tokio::spawn(async move {
            server.await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            hits,
            slow_closed,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// resolves once whoever was reading `/slow.ts` has gone away
    pub async fn slow_reader_gone(&self) {
        self.slow_closed.notified().await;
    }
}

impl Drop for TestUpstream {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

async fn master_playlist(State(state): State<UpstreamState>) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (
        [
            (header::CONTENT_TYPE, "application/x-mpegURL"),
            (header::CACHE_CONTROL, "max-age=2"),
        ],
        MASTER_PLAYLIST,
    )
}

async fn segment(State(state): State<UpstreamState>) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (
        [
            (header::CONTENT_TYPE, "video/mp2t"),
            (header::HeaderName::from_static("x-upstream"), "seg"),
        ],
        SEGMENT_BYTES,
    )
}

async fn gzip_playlist(State(state): State<UpstreamState>) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(b"#EXTM3U\nchunk_0.ts\n").unwrap();
    let compressed = encoder.finish().unwrap();

    (
        [
            (header::CONTENT_TYPE, "application/vnd.apple.mpegurl"),
            (header::CONTENT_ENCODING, "gzip"),
        ],
        compressed,
    )
}

async fn missing(State(state): State<UpstreamState>) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::NOT_FOUND, "nope\nseg1.ts")
}

async fn echo(State(state): State<UpstreamState>, headers: HeaderMap) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    };

    Json(json!({
        "host": value(header::HOST),
        "userAgent": value(header::USER_AGENT),
        "accept": value(header::ACCEPT),
        "referer": value(header::REFERER),
        "origin": value(header::ORIGIN),
        "cookie": value(header::COOKIE),
    }))
}

// same server under another host name, so Host and the bypass headers have to change
async fn redirect_to_localhost(State(state): State<UpstreamState>) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::FOUND,
        [(header::LOCATION, format!("http://localhost:{}/echo", state.port))],
    )
}

async fn moved_playlist(State(state): State<UpstreamState>) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, "/live/master.m3u8")])
}

async fn redirect_loop(State(state): State<UpstreamState>) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, "/loop")])
}

/// sends one chunk and then holds the response open until the reader disconnects
async fn slow_segment(State(state): State<UpstreamState>) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let (tx, rx) = mpsc::channel::<Result<Bytes, Infallible>>(1);

    let slow_closed = state.slow_closed.clone();
    tokio::spawn(async move {
        if tx.send(Ok(Bytes::from_static(SLOW_FIRST_CHUNK))).await.is_ok() {
            tx.closed().await;
        }
        slow_closed.notify_one();
    });

    let body = Body::from_stream(futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    }));

    ([(header::CONTENT_TYPE, "video/mp2t")], body)
}

async fn epg_document(State(state): State<UpstreamState>) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    ([(header::CONTENT_TYPE, "application/xml")], EPG_DOCUMENT)
}

async fn broken_document(State(state): State<UpstreamState>) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (
        [(header::CONTENT_TYPE, "application/xml")],
        "<schedule><programme channel=\"x\"/></schedule>",
    )
}

pub fn config_for(upstream: &TestUpstream) -> AppConfig {
    AppConfig {
        fallback_upstream: upstream.base_url.clone(),
        epg_url: upstream.url("/epg.xml"),
        ..AppConfig::default()
    }
}

pub fn app(config: AppConfig) -> Router {
    let services = EdgeServices::new(Arc::new(config)).unwrap();
    RelayApplicationServer::router(services)
}

pub async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub fn proxy_uri(target: &str) -> String {
    format!("/proxy?url={}", urlencoding::encode(target))
}
