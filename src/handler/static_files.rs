//! Static file serving module
//!
//! Maps a URL path onto the upload directory and returns the file, an
//! `index.html`, or a generated listing. Paths are cleaned before they touch
//! the filesystem, so `..` can never climb out of the root.

use crate::handler::listing;
use crate::http::{self, mime, path, sniff};
use crate::logger;
use chrono::{DateTime, NaiveDateTime, Utc};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::IF_MODIFIED_SINCE;
use hyper::{Method, Request, Response};
use std::fs::Metadata;
use std::io;
use std::path::Path;
use std::time::SystemTime;
use tokio::fs;

const INDEX_PAGE: &str = "index.html";
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Serve `req`'s path from `root`
pub async fn serve_path<B>(req: &Request<B>, root: &Path) -> Response<Full<Bytes>> {
    let is_head = req.method() == Method::HEAD;
    let query = req.uri().query();

    let Some(url_path) = path::decode_path(req.uri().path()) else {
        return http::build_bad_path_response();
    };

    if url_path.ends_with(&format!("/{INDEX_PAGE}")) {
        return redirect("./", query);
    }

    let name = path::clean_path(&url_path);
    let fs_path = root.join(name.trim_start_matches('/'));

    let meta = match fs::metadata(&fs_path).await {
        Ok(meta) => meta,
        Err(e) => return error_response(&fs_path, &e),
    };

    if meta.is_dir() {
        if !url_path.ends_with('/') {
            let target = format!("{}/", path::encode_segment(path::base_name(&url_path)));
            return redirect(&target, query);
        }

        let index = fs_path.join(INDEX_PAGE);
        if let Ok(index_meta) = fs::metadata(&index).await {
            if index_meta.is_file() {
                return serve_file(&index, &index_meta, req, is_head).await;
            }
        }
        return serve_listing(&fs_path, is_head).await;
    }

    if url_path.ends_with('/') {
        let target = format!("../{}", path::encode_segment(path::base_name(&url_path)));
        return redirect(&target, query);
    }

    serve_file(&fs_path, &meta, req, is_head).await
}

/// Serve a regular file with `Last-Modified` / `If-Modified-Since` handling
async fn serve_file<B>(
    file_path: &Path,
    meta: &Metadata,
    req: &Request<B>,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let modified = meta.modified().ok().map(DateTime::<Utc>::from);
    let last_modified = modified.map(|t| t.format(HTTP_DATE_FORMAT).to_string());

    if let (Some(modified), Some(since)) = (modified, if_modified_since(req)) {
        if !is_modified_since(modified, since) {
            if let Some(value) = last_modified.as_deref() {
                return http::response::build_304_response(value);
            }
        }
    }

    let content = match fs::read(file_path).await {
        Ok(c) => c,
        Err(e) => return error_response(file_path, &e),
    };

    let extension = file_path.extension().and_then(|e| e.to_str());
    let content_type = mime::content_type_for_extension(extension)
        .unwrap_or_else(|| sniff::detect_content_type(&content));

    http::response::build_file_response(
        Bytes::from(content),
        content_type,
        last_modified.as_deref(),
        is_head,
    )
}

async fn serve_listing(dir: &Path, is_head: bool) -> Response<Full<Bytes>> {
    match listing::read_entries(dir).await {
        Ok(entries) => {
            http::response::build_html_response(listing::render_listing(&entries), is_head)
        }
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read directory '{}': {e}",
                dir.display()
            ));
            http::build_500_response()
        }
    }
}

fn redirect(target: &str, query: Option<&str>) -> Response<Full<Bytes>> {
    match query {
        Some(q) if !q.is_empty() => http::build_redirect_response(&format!("{target}?{q}")),
        _ => http::build_redirect_response(target),
    }
}

fn error_response(file_path: &Path, err: &io::Error) -> Response<Full<Bytes>> {
    match err.kind() {
        // File not found is common (404), no need to log
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => http::build_404_response(),
        io::ErrorKind::PermissionDenied => http::build_403_response(),
        _ => {
            logger::log_error(&format!(
                "Failed to read '{}': {err}",
                file_path.display()
            ));
            http::build_500_response()
        }
    }
}

fn if_modified_since<B>(req: &Request<B>) -> Option<DateTime<Utc>> {
    let value = req.headers().get(IF_MODIFIED_SINCE)?.to_str().ok()?;
    NaiveDateTime::parse_from_str(value.trim(), HTTP_DATE_FORMAT)
        .ok()
        .map(|t| t.and_utc())
}

/// HTTP dates have one-second resolution
fn is_modified_since(modified: DateTime<Utc>, since: DateTime<Utc>) -> bool {
    modified <= DateTime::<Utc>::from(SystemTime::UNIX_EPOCH)
        || modified.timestamp() > since.timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use hyper::StatusCode;

    fn get(uri: &str) -> Request<()> {
        Request::builder().uri(uri).body(()).unwrap()
    }

    async fn body_bytes(resp: Response<Full<Bytes>>) -> Vec<u8> {
        resp.into_body().collect().await.unwrap().to_bytes().to_vec()
    }

    #[tokio::test]
    async fn test_serves_file_bytes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"\x89PNG\r\n\x1a\nxx").unwrap();

        let resp = serve_path(&get("/a.png"), dir.path()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["Content-Type"], "image/png");
        assert!(resp.headers().contains_key("Last-Modified"));
        assert_eq!(body_bytes(resp).await, b"\x89PNG\r\n\x1a\nxx");
    }

    #[tokio::test]
    async fn test_unknown_extension_sniffed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blob"), b"GIF89a....").unwrap();

        let resp = serve_path(&get("/blob"), dir.path()).await;
        assert_eq!(resp.headers()["Content-Type"], "image/gif");
    }

    #[tokio::test]
    async fn test_missing_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let resp = serve_path(&get("/nope.png"), dir.path()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_root_listing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"x").unwrap();
        std::fs::write(dir.path().join("b.gif"), b"y").unwrap();

        let resp = serve_path(&get("/"), dir.path()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["Content-Type"], "text/html; charset=utf-8");
        let html = String::from_utf8(body_bytes(resp).await).unwrap();
        assert!(html.contains("href=\"a.png\""));
        assert!(html.contains("href=\"b.gif\""));
    }

    #[tokio::test]
    async fn test_directory_redirects() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("old")).unwrap();
        std::fs::write(dir.path().join("a.png"), b"x").unwrap();

        let resp = serve_path(&get("/old?x=1"), dir.path()).await;
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()["Location"], "old/?x=1");

        let resp = serve_path(&get("/a.png/"), dir.path()).await;
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()["Location"], "../a.png");

        let resp = serve_path(&get("/old/index.html"), dir.path()).await;
        assert_eq!(resp.headers()["Location"], "./");
    }

    #[tokio::test]
    async fn test_index_page_served_for_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("site")).unwrap();
        std::fs::write(dir.path().join("site").join("index.html"), b"<p>hi</p>").unwrap();

        let resp = serve_path(&get("/site/"), dir.path()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_bytes(resp).await, b"<p>hi</p>");
    }

    #[tokio::test]
    async fn test_traversal_stays_in_root() {
        let outer = tempfile::tempdir().unwrap();
        let root = outer.path().join("uploads");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(outer.path().join("secret.txt"), b"secret").unwrap();

        let resp = serve_path(&get("/../secret.txt"), &root).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = serve_path(&get("/%2e%2e/secret.txt"), &root).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_percent_encoded_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("my cat.jpg"), b"\xFF\xD8\xFF").unwrap();

        let resp = serve_path(&get("/my%20cat.jpg"), dir.path()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_head_has_no_body() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"12345").unwrap();
        let req = Request::builder()
            .method(Method::HEAD)
            .uri("/a.png")
            .body(())
            .unwrap();

        let resp = serve_path(&req, dir.path()).await;
        assert_eq!(resp.headers()["Content-Length"], "5");
        assert!(body_bytes(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_if_modified_since() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"x").unwrap();

        let resp = serve_path(&get("/a.png"), dir.path()).await;
        let last_modified = resp.headers()["Last-Modified"].to_str().unwrap().to_string();

        let req = Request::builder()
            .uri("/a.png")
            .header(IF_MODIFIED_SINCE, &last_modified)
            .body(())
            .unwrap();
        let resp = serve_path(&req, dir.path()).await;
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);

        let req = Request::builder()
            .uri("/a.png")
            .header(IF_MODIFIED_SINCE, "Thu, 01 Jan 2009 00:00:00 GMT")
            .body(())
            .unwrap();
        let resp = serve_path(&req, dir.path()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
