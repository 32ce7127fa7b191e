//! Request parameters from query string, form body, headers and cookies.

use axum::extract::{FromRef, FromRequest, Query, Request};
use axum::http::{header, HeaderMap, Method};
use axum::Form;
use scangate_common::{Language, MessageKey};
use scangate_scan_config::RawParams;

use crate::access::{API_KEY_HEADER, SESSION_COOKIE};
use crate::error::ApiError;

/// All parameters of one request. The first occurrence of a name wins,
/// query string before form body.
#[derive(Debug, Clone, Default)]
pub struct Params {
    pairs: Vec<(String, String)>,
    header_key: Option<String>,
    cookies: Vec<(String, String)>,
}

impl Params {
    pub fn from_parts(
        pairs: Vec<(String, String)>,
        headers: &HeaderMap,
    ) -> Self {
        Self {
            pairs,
            header_key: headers
                .get(API_KEY_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            cookies: parse_cookies(headers),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Header, then `key` parameter, then session cookie.
    pub fn api_key(&self) -> Option<&str> {
        self.header_key
            .as_deref()
            .or_else(|| self.get(SESSION_COOKIE))
            .or_else(|| self.cookie(SESSION_COOKIE))
    }

    pub fn to_raw_params(&self) -> RawParams {
        RawParams::from_pairs(self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

fn parse_cookies(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|line| line.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Rejections are worded in the language carried by the router state.
impl<S> FromRequest<S> for Params
where
    S: Send + Sync,
    Language: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut pairs = Query::<Vec<(String, String)>>::try_from_uri(req.uri())
            .map(|Query(pairs)| pairs)
            .unwrap_or_default();
        let headers = req.headers().clone();
        let language = Language::from_ref(state);

        let has_body = !matches!(*req.method(), Method::GET | Method::HEAD);
        if has_body && is_form(&headers) {
            let Form(form) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|_| ApiError::bad_request(MessageKey::InvalidValue, language))?;
            pairs.extend(form);
        }

        Ok(Self::from_parts(pairs, &headers))
    }
}
