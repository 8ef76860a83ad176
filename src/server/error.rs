use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::debug;

pub type AppResult<T> = Result<T, Error>;

/// every variant ends the request, nothing here is retried
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// missing or malformed input from the client
    #[error("{0}")]
    BadRequest(String),

    /// the upstream could not be reached or dropped the connection
    #[error("upstream request failed: {0}")]
    UpstreamTransport(String),

    /// the upstream answered but not with what we expected
    #[error("upstream returned unusable content: {0}")]
    UpstreamFormat(String),

    #[error("Not Found")]
    NotFound,

    #[error("{0}")]
    InternalServerErrorWithContext(String),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::UpstreamTransport(_)
            | Self::UpstreamFormat(_)
            | Self::InternalServerErrorWithContext(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// the short text the client sees, upstream details stay in the logs
    fn public_message(&self) -> String {
        match self {
            Self::BadRequest(msg) => msg.clone(),
            Self::NotFound => "Not Found".to_string(),
            Self::UpstreamTransport(_) => "Upstream request failed".to_string(),
            Self::UpstreamFormat(_) => "Upstream returned invalid content".to_string(),
            Self::InternalServerErrorWithContext(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        debug!("responding with error: {}", self);
        (self.status_code(), self.public_message()).into_response()
    }
}
