use bytes::Bytes;
use http::header::{CONTENT_TYPE, RETRY_AFTER};
use http::{HeaderValue, Response, StatusCode};
use http_body_util::Full;

pub type HttpResponse = Response<Full<Bytes>>;

fn with_content_type(body: impl Into<Bytes>, content_type: &'static str) -> HttpResponse {
    let mut res = Response::new(Full::new(body.into()));
    res.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    res
}

/// Create a text/plain response
pub fn text(body: impl Into<Bytes>) -> HttpResponse {
    with_content_type(body, "text/plain; charset=utf-8")
}

/// Create a text/html response
pub fn html(body: impl Into<Bytes>) -> HttpResponse {
    with_content_type(body, "text/html; charset=utf-8")
}

pub fn with_status(mut res: HttpResponse, status: StatusCode) -> HttpResponse {
    *res.status_mut() = status;
    res
}

/// Create a 404 Not Found response
pub fn not_found() -> HttpResponse {
    with_status(text("Not Found"), StatusCode::NOT_FOUND)
}

pub fn internal_error() -> HttpResponse {
    with_status(text("Internal Server Error"), StatusCode::INTERNAL_SERVER_ERROR)
}

/// The maintenance response: 503 with an HTML body and an optional `Retry-After`.
pub fn service_unavailable(body: impl Into<Bytes>, retry_after_secs: Option<u64>) -> HttpResponse {
    let mut res = with_status(html(body), StatusCode::SERVICE_UNAVAILABLE);
    if let Some(secs) = retry_after_secs {
        res.headers_mut().insert(RETRY_AFTER, HeaderValue::from(secs));
    }
    res
}
