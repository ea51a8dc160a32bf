use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::api::handlers::{ApiError, AppState};
use crate::store::SessionHandle;

/// Client session resolved from the session cookie.
///
/// A request without a valid cookie gets a fresh session seeded with the
/// sample data; handlers send the new id back in `Set-Cookie`.
pub struct Session(pub SessionHandle);

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let id = extract_cookie_value(&parts.headers, &state.service.session_cookie)
            .and_then(|value| Uuid::parse_str(&value).ok());
        let handle = state.sessions.open(id).await?;
        Ok(Session(handle))
    }
}

/// Value of the named cookie across all `Cookie` headers
fn extract_cookie_value(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.to_string())
}
