use axum::{
    Extension, Json, Router,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::{debug, error};
use validator::Validate;

use crate::server::{
    dtos::epg_dto::EpgResponse,
    error::AppResult,
    extractors::ValidatedQuery,
    models::EpgFormat,
    services::EdgeServices,
    utils::xmltv_utils::XmltvUtil,
};

#[derive(Deserialize, Validate)]
pub struct EpgQuery {
    // matched as is, no trimming or case folding
    #[validate(length(min = 1, message = "channel is required"))]
    pub channel: String,
    #[serde(default)]
    pub format: EpgFormat,
}

pub struct EpgController;

impl EpgController {
    pub fn app() -> Router {
        Router::new().route("/epg", get(Self::epg_get))
    }

    async fn epg_get(
        Extension(services): Extension<EdgeServices>,
        ValidatedQuery(params): ValidatedQuery<EpgQuery>,
    ) -> AppResult<Response> {
        let EpgQuery { channel, format } = params;

        let programmes = services.epg.get_epg(&channel).await.inspect_err(|e| {
            error!("EPG lookup for channel {} failed: {}", channel, e);
        })?;
        debug!(
            "EPG channel {} -> {} programmes as {:?}",
            channel,
            programmes.len(),
            format
        );

        match format {
            EpgFormat::Json => Ok(Json(EpgResponse::new(channel, programmes)).into_response()),
            EpgFormat::Xml => {
                let body = XmltvUtil::write(&programmes)?;
                Ok(([(header::CONTENT_TYPE, "application/xml")], body).into_response())
            }
        }
    }
}
