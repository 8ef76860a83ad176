use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header;
use mockall::automock;
use tracing::{debug, error};

use crate::server::{
    error::{AppResult, Error},
    models::ProgrammeEntry,
    utils::{encoding_utils::decode_body, header_utils::DESKTOP_USER_AGENT, xmltv_utils::XmltvUtil},
};

pub type DynEpgService = Arc<dyn EpgServiceTrait + Send + Sync>;

#[automock]
#[async_trait]
pub trait EpgServiceTrait {
    /// programmes for one channel, in upstream order
    async fn get_epg(&self, channel: &str) -> AppResult<Vec<ProgrammeEntry>>;
}

/// fetches and parses the whole upstream document on every call, there is no cache on purpose
pub struct EpgService {
    http: reqwest::Client,
    epg_url: String,
}

impl EpgService {
    pub fn new(http: reqwest::Client, epg_url: String) -> Self {
        Self { http, epg_url }
    }

    async fn fetch_document(&self) -> AppResult<String> {
        let response = self
            .http
            .get(&self.epg_url)
            .header(header::USER_AGENT, DESKTOP_USER_AGENT)
            .header(header::ACCEPT, "*/*")
            .send()
            .await
            .map_err(|e| {
                error!("EPG request to {} failed: {}", self.epg_url, e);
                Error::UpstreamTransport(format!("{}: {}", self.epg_url, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("EPG upstream {} returned {}", self.epg_url, status);
            return Err(Error::UpstreamTransport(format!(
                "{} returned {}",
                self.epg_url, status
            )));
        }

        // some mirrors only publish .xml.gz without setting content-encoding
        let content_encoding = response
            .headers()
            .get(header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .or_else(|| self.epg_url.ends_with(".gz").then(|| "gzip".to_string()));

        let bytes = response.bytes().await.map_err(|e| {
            error!("Failed to read EPG body from {}: {}", self.epg_url, e);
            Error::UpstreamTransport(format!("failed to read {}: {}", self.epg_url, e))
        })?;
        debug!("Fetched {} EPG bytes from {}", bytes.len(), self.epg_url);

        let decoded = decode_body(&bytes, content_encoding.as_deref())?;
        String::from_utf8(decoded).map_err(|e| {
            error!("EPG document from {} is not utf-8: {}", self.epg_url, e);
            Error::UpstreamFormat("EPG document is not utf-8".to_string())
        })
    }
}

#[async_trait]
impl EpgServiceTrait for EpgService {
    async fn get_epg(&self, channel: &str) -> AppResult<Vec<ProgrammeEntry>> {
        let document = self.fetch_document().await?;
        let schedule = XmltvUtil::parse(&document)?;
        let total = schedule.programmes.len();

        let programmes = schedule.for_channel(channel);
        debug!(
            "EPG channel {} matched {} of {} programmes",
            channel,
            programmes.len(),
            total
        );

        Ok(programmes)
    }
}
