//! Live-reloading preview server.
//!
//! A deliberately small HTTP/1.1 server: one request per connection,
//! `GET`/`HEAD` only, static files from the output directory. HTML pages get
//! a client script injected that listens on a server-sent-events stream and
//! swaps stylesheets or reloads the page when the build publishes a change.

use crate::reload::ReloadEvent;
use std::io;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::{self, error::RecvError};

/// URL of the injected live-reload client.
pub const CLIENT_SCRIPT_PATH: &str = "/__siteforge/client.js";

/// URL of the server-sent events stream.
pub const EVENTS_PATH: &str = "/__siteforge/events";

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

const CLIENT_SCRIPT: &str = r#"(function () {
  var source = new EventSource("/__siteforge/events");
  source.addEventListener("css", function (e) {
    var changed = JSON.parse(e.data).url;
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    for (var i = 0; i < links.length; i++) {
      var url = new URL(links[i].href, location.href);
      if (url.origin !== location.origin) continue;
      if (url.pathname !== changed && links.length > 1) continue;
      url.searchParams.set("_reload", Date.now());
      links[i].href = url.toString();
    }
  });
  source.addEventListener("reload", function () {
    location.reload();
  });
})();
"#;

/// Error starting the preview server.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// Could not listen on the configured address
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    /// Could not start the async runtime
    #[error("Failed to start server runtime: {0}")]
    Runtime(#[source] io::Error),
}

/// Request method accepted by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
}

/// Outcome of mapping a URL path onto the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Existing file to serve
    File(PathBuf),
    /// Path tries to leave the root
    Forbidden,
    /// Nothing at that path
    NotFound,
    /// Escapes decode to invalid UTF-8
    BadRequest,
}

/// Parse `GET /path HTTP/1.1` into method and raw target.
///
/// Returns `None` for malformed lines. Unsupported methods are reported as
/// `Some(Err(method))` so the caller can answer 405.
pub fn parse_request_line(line: &str) -> Option<Result<(Method, String), String>> {
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    let version = parts.next()?;
    if !version.starts_with("HTTP/") || parts.next().is_some() {
        return None;
    }

    let method = match method {
        "GET" => Method::Get,
        "HEAD" => Method::Head,
        other => return Some(Err(other.to_string())),
    };
    Some(Ok((method, target.to_string())))
}

/// Map a request target onto a file under `root`.
///
/// Query strings and fragments are ignored. Directories resolve to their
/// `index` document. Any `..` segment is forbidden, and escapes that do not
/// decode to UTF-8 are a bad request.
pub fn resolve_request_path(root: &Path, index: &str, target: &str) -> Resolved {
    let path = target.split(['?', '#']).next().unwrap_or_default();
    let Ok(decoded) = urlencoding::decode(path) else {
        return Resolved::BadRequest;
    };

    let mut resolved = root.to_path_buf();
    for segment in decoded.split('/').filter(|s| !s.is_empty() && *s != ".") {
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => resolved.push(name),
            _ => return Resolved::Forbidden,
        }
    }

    if resolved.is_dir() {
        resolved.push(index);
    }

    if resolved.is_file() {
        Resolved::File(resolved)
    } else {
        Resolved::NotFound
    }
}

/// MIME type for a file, by extension.
pub fn content_type(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "txt" => "text/plain; charset=utf-8",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

/// Insert the live-reload client before the last `</body>`, or append it.
pub fn inject_client(html: &str) -> String {
    let tag = format!("<script src=\"{}\"></script>", CLIENT_SCRIPT_PATH);
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(pos) => format!("{}{}{}", &html[..pos], tag, &html[pos..]),
        None => format!("{}{}", html, tag),
    }
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    status: &str,
    content_type: &str,
    body: &[u8],
    head_only: bool,
) -> io::Result<()> {
    let header = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nCache-Control: no-cache\r\nConnection: close\r\n\r\n",
        status,
        content_type,
        body.len()
    );
    writer.write_all(header.as_bytes()).await?;
    if !head_only {
        writer.write_all(body).await?;
    }
    writer.flush().await
}

/// Static preview server over an output directory.
#[derive(Debug, Clone)]
pub struct PreviewServer {
    root: PathBuf,
    index: String,
    events: broadcast::Sender<ReloadEvent>,
}

impl PreviewServer {
    /// Create a server for `root`, publishing `events` to connected pages.
    pub fn new(root: PathBuf, index: impl Into<String>, events: broadcast::Sender<ReloadEvent>) -> Self {
        Self { root, index: index.into(), events }
    }

    /// Bind a listener on `host:port`. Port 0 picks a free port.
    pub async fn bind(host: &str, port: u16) -> Result<TcpListener, ServeError> {
        let addr = format!("{}:{}", host, port);
        TcpListener::bind(addr.as_str())
            .await
            .map_err(|source| ServeError::Bind { addr: addr.clone(), source })
    }

    /// Accept connections forever.
    pub async fn run(self, listener: TcpListener) {
        let server = Arc::new(self);

        loop {
            let (stream, client_addr) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!("accept failed: {}", e);
                    continue;
                }
            };

            let server = Arc::clone(&server);
            tokio::spawn(async move {
                if let Err(e) = server.handle_connection(stream, client_addr).await {
                    tracing::debug!(client = %client_addr, "connection closed: {}", e);
                }
            });
        }
    }

    async fn handle_connection(&self, stream: TcpStream, client_addr: SocketAddr) -> io::Result<()> {
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let mut request_line = String::new();
        if reader.read_line(&mut request_line).await? == 0 {
            return Ok(());
        }
        loop {
            let mut header = String::new();
            let n = reader.read_line(&mut header).await?;
            if n == 0 || header.trim().is_empty() {
                break;
            }
        }

        let (method, target) = match parse_request_line(&request_line) {
            Some(Ok(request)) => request,
            Some(Err(method)) => {
                tracing::debug!(client = %client_addr, %method, "method not allowed");
                return write_response(
                    &mut writer,
                    "405 Method Not Allowed",
                    "text/plain",
                    b"method not allowed",
                    false,
                )
                .await;
            }
            None => {
                return write_response(&mut writer, "400 Bad Request", "text/plain", b"bad request", false)
                    .await;
            }
        };
        let head_only = method == Method::Head;
        tracing::debug!(client = %client_addr, ?method, %target, "request");

        let path = target.split(['?', '#']).next().unwrap_or_default();
        if path == EVENTS_PATH {
            return self.stream_events(&mut writer).await;
        }
        if path == CLIENT_SCRIPT_PATH {
            return write_response(
                &mut writer,
                "200 OK",
                content_type(Path::new("client.js")),
                CLIENT_SCRIPT.as_bytes(),
                head_only,
            )
            .await;
        }

        match resolve_request_path(&self.root, &self.index, &target) {
            Resolved::File(file) => {
                let mut body = tokio::fs::read(&file).await?;
                let mime = content_type(&file);
                if mime.starts_with("text/html") {
                    body = inject_client(&String::from_utf8_lossy(&body)).into_bytes();
                }
                write_response(&mut writer, "200 OK", mime, &body, head_only).await
            }
            Resolved::Forbidden => {
                write_response(&mut writer, "403 Forbidden", "text/plain", b"forbidden", head_only).await
            }
            Resolved::NotFound => {
                write_response(&mut writer, "404 Not Found", "text/plain", b"not found", head_only).await
            }
            Resolved::BadRequest => {
                write_response(&mut writer, "400 Bad Request", "text/plain", b"bad request", head_only).await
            }
        }
    }

    async fn stream_events<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> io::Result<()> {
        let mut events = self.events.subscribe();

        writer
            .write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\nConnection: keep-alive\r\n\r\n: connected\n\n",
            )
            .await?;
        writer.flush().await?;

        let mut keep_alive = tokio::time::interval(KEEP_ALIVE_INTERVAL);
        keep_alive.tick().await;

        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => writer.write_all(event.to_sse().as_bytes()).await?,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "live-reload client lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = keep_alive.tick() => writer.write_all(b": ping\n\n").await?,
            }
            writer.flush().await?;
        }

        Ok(())
    }
}
