use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;

/// the client's cookie header, passed upstream untouched
pub struct ForwardedCookie(pub Option<String>);

impl<S> FromRequestParts<S> for ForwardedCookie
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // several cookie headers are legal on http/2, upstream gets them joined like http/1 would
        let cookies: Vec<&str> = parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();

        if cookies.is_empty() {
            Ok(Self(None))
        } else {
            Ok(Self(Some(cookies.join("; "))))
        }
    }
}
