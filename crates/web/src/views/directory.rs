use std::fmt;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use mime::Mime;
use nano_http::protocol::{DefaultErrorRenderer, ErrorRenderer, Request, Response};
use tracing::{debug, error};

use crate::router::Route;
use crate::view::{BoxError, View};

/// Serves files below a directory.
///
/// The part of the request path after the route pattern names the file,
/// so `Route::prefix("/static", ..)` maps `/static/css/app.css` to
/// `<root>/css/app.css`.
pub struct DirectoryView {
    root: PathBuf,
    error_renderer: Arc<dyn ErrorRenderer>,
}

impl DirectoryView {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), error_renderer: Arc::new(DefaultErrorRenderer) }
    }

    pub fn error_renderer<E: ErrorRenderer + 'static>(mut self, renderer: E) -> Self {
        self.error_renderer = Arc::new(renderer);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a request path relative to the route onto a file below the root.
    ///
    /// Only plain path segments are accepted.
    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let relative = Path::new(relative.trim_start_matches('/'));
        let plain = relative.components().all(|component| matches!(component, Component::Normal(_)));
        (!relative.as_os_str().is_empty() && plain).then(|| self.root.join(relative))
    }

    fn error(&self, status: StatusCode) -> Response {
        Response::error_with(self.error_renderer.as_ref(), status)
    }
}

impl fmt::Debug for DirectoryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryView").field("root", &self.root).finish_non_exhaustive()
    }
}

#[async_trait]
impl View for DirectoryView {
    async fn response(&self, req: &Request, route: &Route) -> Result<Response, BoxError> {
        let relative = route.pattern().and_then(|pattern| req.path().strip_prefix(pattern)).unwrap_or(req.path());

        let Some(path) = self.resolve(relative) else {
            debug!(path = req.path(), "no file name in request path");
            return Ok(self.error(StatusCode::NOT_FOUND));
        };

        let is_file = tokio::fs::metadata(&path).await.is_ok_and(|metadata| metadata.is_file());
        if !is_file {
            debug!(file = %path.display(), "file not found");
            return Ok(self.error(StatusCode::NOT_FOUND));
        }

        match tokio::fs::read(&path).await {
            Ok(content) => {
                let mut response = Response::with_content_type("", content_type(&path).as_ref());
                response.write(&content);
                Ok(response)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(self.error(StatusCode::NOT_FOUND)),
            Err(e) => {
                error!(cause = %e, file = %path.display(), "failed to read file");
                Ok(self.error(StatusCode::INTERNAL_SERVER_ERROR))
            }
        }
    }
}

/// Content type by file extension.
pub(crate) fn content_type(path: &Path) -> Mime {
    let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("html" | "htm") => mime::TEXT_HTML,
        Some("css") => mime::TEXT_CSS,
        Some("js") => mime::APPLICATION_JAVASCRIPT,
        Some("jpg" | "jpe" | "jpeg") => mime::IMAGE_JPEG,
        Some("png") => mime::IMAGE_PNG,
        Some("gif") => mime::IMAGE_GIF,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::ViewBinding;
    use crate::view::view_fn;
    use bytes::BytesMut;
    use nano_http::codec::RequestDecoder;
    use tokio_util::codec::Decoder;

    async fn fixture(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("nano-web-{name}-{}", std::process::id()));
        tokio::fs::create_dir_all(root.join("css")).await.unwrap();
        tokio::fs::write(root.join("index.html"), "<h1>home</h1>").await.unwrap();
        tokio::fs::write(root.join("css/site.CSS"), "body {}").await.unwrap();
        tokio::fs::write(root.join("blob.bin"), [0u8, 159, 146, 150]).await.unwrap();
        root
    }

    fn request(path: &str) -> Request {
        let raw = format!("GET {path} HTTP/1.1\r\n\r\n");
        RequestDecoder::new().decode(&mut BytesMut::from(raw.as_str())).unwrap().unwrap()
    }

    fn route(prefix: &str) -> Route {
        Route::prefix(prefix, ViewBinding::shared(view_fn(|_: &Request| Response::new())))
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type(Path::new("a.htm")), mime::TEXT_HTML);
        assert_eq!(content_type(Path::new("a.JPE")), mime::IMAGE_JPEG);
        assert_eq!(content_type(Path::new("app.js")), mime::APPLICATION_JAVASCRIPT);
        assert_eq!(content_type(Path::new("logo.gif")), mime::IMAGE_GIF);
        assert_eq!(content_type(Path::new("README")), mime::APPLICATION_OCTET_STREAM);
        assert_eq!(content_type(Path::new("data.json")), mime::APPLICATION_OCTET_STREAM);
    }

    #[test]
    fn resolve_rejects_non_plain_paths() {
        let view = DirectoryView::new("/srv/www");
        assert_eq!(view.resolve("/css/site.css"), Some(PathBuf::from("/srv/www/css/site.css")));
        assert_eq!(view.resolve(""), None);
        assert_eq!(view.resolve("/"), None);
        assert_eq!(view.resolve("a/../../etc/passwd"), None);
        assert_eq!(view.resolve("./index.html"), None);
    }

    #[tokio::test]
    async fn serves_files_below_prefix() {
        let root = fixture("serve").await;
        let view = DirectoryView::new(&root);
        let route = route("/static");

        let response = view.response(&request("/static/index.html"), &route).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.header("Content-Type"), Some("text/html"));
        assert_eq!(response.body(), b"<h1>home</h1>");

        let response = view.response(&request("/static/css/site.CSS"), &route).await.unwrap();
        assert_eq!(response.header("Content-Type"), Some("text/css"));

        let response = view.response(&request("/static/blob.bin"), &route).await.unwrap();
        assert_eq!(response.header("Content-Type"), Some("application/octet-stream"));
        assert_eq!(response.body(), &[0u8, 159, 146, 150]);

        tokio::fs::remove_dir_all(root).await.unwrap();
    }

    #[tokio::test]
    async fn missing_file_and_directory_are_404() {
        let root = fixture("missing").await;
        let view = DirectoryView::new(&root).error_renderer(|page: &nano_http::protocol::ErrorPage| page.status_message().to_string());
        let route = route("/");

        let response = view.response(&request("/nope.html"), &route).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body(), b"Not Found");

        let response = view.response(&request("/css"), &route).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = view.response(&request("/"), &route).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        tokio::fs::remove_dir_all(root).await.unwrap();
    }
}
