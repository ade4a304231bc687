//! The single browse/download endpoint.
//!
//! `GET /?p=docs&sort=-size` returns a JSON listing. Adding `dl=<name>`
//! streams that file from the listed directory instead.
//!
//! A POST download must carry the session's anti-forgery token, read from
//! the form body field `csrf_token`, else the `X-CSRF-Token` header, else
//! the `csrf_token` query parameter.

use std::collections::HashMap;

use axum::body::Body;
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tokio_util::io::ReaderStream;
use tracing::debug;

use super::error::ApiError;
use super::state::AppState;
use crate::files::mime::OCTET_STREAM;
use crate::files::Download;
use crate::service::{BrowseRequest, DownloadRequest};
use crate::session::{AntiForgeryToken, SessionStore};

/// Cookie carrying the session id.
pub const SESSION_COOKIE: &str = "dirview_session";

/// Header a client may use to send the anti-forgery token.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Form field, and query parameter fallback, for the anti-forgery token.
pub const CSRF_PARAM: &str = "csrf_token";

pub async fn index(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    jar: CookieJar,
    Query(params): Query<HashMap<String, String>>,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Result<(CookieJar, Response), ApiError> {
    let (jar, token) = session_token(jar, &state.sessions);

    let response = match params.get("dl") {
        Some(filename) => {
            let request = DownloadRequest {
                path: params.get("p").cloned(),
                filename: filename.clone(),
                provided_token: provided_token(form.ok(), &headers, &params),
                state_changing: !method.is_safe(),
            };
            let service = state.service.clone();
            let download =
                tokio::task::spawn_blocking(move || service.download(&request, &token)).await??;
            stream_download(download)
        }
        None => {
            let show_hidden = params
                .get(state.service.show_hidden_key())
                .is_some_and(|v| v == "1");
            let request = BrowseRequest {
                path: params.get("p").cloned(),
                sort: params.get("sort").cloned(),
                show_hidden,
                page: params
                    .get("page")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1),
            };
            let service = state.service.clone();
            let listing =
                tokio::task::spawn_blocking(move || service.browse(&request, &token)).await?;
            Json(listing).into_response()
        }
    };

    Ok((jar, response))
}

/// Look up the cookie's session, or start a new one.
///
/// A cookie naming a session this server did not issue, or one that has
/// expired, is replaced.
fn session_token(jar: CookieJar, sessions: &SessionStore) -> (CookieJar, AntiForgeryToken) {
    if let Some(token) = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| sessions.get(cookie.value()))
    {
        return (jar, token);
    }

    let (session_id, token) = sessions.create();
    debug!(session_id = %session_id, "Starting session");
    let cookie = Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build();
    (jar.add(cookie), token)
}

/// Token from the form body, else the header, else the query string.
fn provided_token(
    form: Option<Form<HashMap<String, String>>>,
    headers: &HeaderMap,
    params: &HashMap<String, String>,
) -> Option<String> {
    form.and_then(|Form(mut fields)| fields.remove(CSRF_PARAM))
        .or_else(|| {
            headers
                .get(CSRF_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .or_else(|| params.get(CSRF_PARAM).cloned())
}

fn stream_download(download: Download) -> Response {
    let Download {
        file,
        filename,
        mime,
        size,
        ..
    } = download;

    let content_type = HeaderValue::from_str(&mime)
        .unwrap_or_else(|_| HeaderValue::from_static(OCTET_STREAM));
    let disposition = format!(
        "attachment; filename=\"{}\"",
        urlencoding::encode(&filename)
    );

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, must-revalidate"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );

    let stream = ReaderStream::new(tokio::fs::File::from_std(file));
    (StatusCode::OK, headers, Body::from_stream(stream)).into_response()
}
