//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: `/images` goes to the upload
//! handler, every other path is served from the upload directory.

use crate::config::AppState;
use crate::handler::{static_files, upload};
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderName, REFERER, USER_AGENT};
use hyper::{Request, Response, Version};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let started = Instant::now();
    let entry = state
        .config
        .logging
        .access_log
        .then(|| access_entry(&req, peer_addr));

    // Exact match only, `/images/` and `/images/x` are static paths
    let response = if req.uri().path() == upload::UPLOAD_PATH {
        upload::handle_upload(req, &state).await
    } else {
        let (parts, _body) = req.into_parts();
        let req = Request::from_parts(parts, ());
        static_files::serve_path(&req, state.uploads.root()).await
    };

    if let Some(mut entry) = entry {
        entry.status = response.status().as_u16();
        entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    response
}

fn access_entry<B>(req: &Request<B>, peer_addr: SocketAddr) -> AccessLogEntry {
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_label(req.version()).to_string();
    entry.referer = header_value(req, &REFERER);
    entry.user_agent = header_value(req, &USER_AGENT);
    entry
}

fn header_value<B>(req: &Request<B>, name: &HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use http_body_util::BodyExt;
    use hyper::{Method, StatusCode};

    fn state_for(dir: &std::path::Path) -> Arc<AppState> {
        let mut config = Config::default();
        config.storage.upload_dir = dir.to_string_lossy().into_owned();
        Arc::new(AppState::new(config))
    }

    fn request(method: Method, uri: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[tokio::test]
    async fn test_images_dispatches_to_upload() {
        let dir = tempfile::tempdir().unwrap();
        let resp = handle_request(request(Method::DELETE, "/images"), state_for(dir.path()), peer()).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()["Allow"], "POST");
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"/images endpoint only supports POST requests\n");
    }

    #[tokio::test]
    async fn test_images_prefix_is_static() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_for(dir.path());

        let resp = handle_request(request(Method::GET, "/images/"), Arc::clone(&state), peer()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = handle_request(request(Method::POST, "/imagesx"), state, peer()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_other_paths_are_static() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"\x89PNG\r\n\x1a\n").unwrap();

        let resp = handle_request(request(Method::GET, "/a.png"), state_for(dir.path()), peer()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["Content-Type"], "image/png");
    }

    #[test]
    fn test_access_entry() {
        let req = Request::builder()
            .method(Method::GET)
            .uri("/a.png?w=1")
            .version(Version::HTTP_10)
            .header(USER_AGENT, "curl/8.5.0")
            .body(())
            .unwrap();
        let entry = access_entry(&req, peer());
        assert_eq!(entry.remote_addr, "127.0.0.1");
        assert_eq!(entry.path, "/a.png");
        assert_eq!(entry.query.as_deref(), Some("w=1"));
        assert_eq!(entry.http_version, "1.0");
        assert_eq!(entry.user_agent.as_deref(), Some("curl/8.5.0"));
        assert_eq!(entry.referer, None);
    }
}
