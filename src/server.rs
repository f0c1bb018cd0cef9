use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use percent_encoding::percent_decode_str;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

use crate::error::Result;

/// Page served for `/` and `/speedometer`.
pub const VIEWER_ASSET: &str = "speedometer.html";

const MAX_HEADER_BYTES: usize = 16 * 1024;

/// What a request target maps to.
#[derive(Debug, PartialEq)]
pub enum Route {
    File {
        path: PathBuf,
        content_type: &'static str,
    },
    Forbidden,
    /// Target could not be parsed or decoded.
    Invalid,
}

/// Map a request target to a file under `root`. Pure; touches no files.
pub fn resolve(root: &Path, target: &str) -> Route {
    let Ok(url) = Url::parse("http://localhost/").and_then(|base| base.join(target)) else {
        return Route::Invalid;
    };
    let Ok(decoded) = percent_decode_str(url.path()).decode_utf8() else {
        return Route::Invalid;
    };

    let pathname = match &*decoded {
        "/" | "/speedometer" => VIEWER_ASSET,
        other => other,
    };
    let relative = pathname.strip_prefix('/').unwrap_or(pathname);

    let mut path = root.to_path_buf();
    let mut depth = 0usize;
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => {
                path.push(part);
                depth += 1;
            }
            Component::ParentDir if depth > 0 => {
                path.pop();
                depth -= 1;
            }
            Component::ParentDir | Component::Prefix(_) => return Route::Forbidden,
            Component::CurDir | Component::RootDir => {}
        }
    }

    Route::File {
        content_type: content_type(&path),
        path,
    }
}

pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("csv") => "text/csv; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Read-only HTTP file server over the project root.
pub struct StaticServer {
    listener: TcpListener,
    root: Arc<PathBuf>,
}

impl StaticServer {
    pub async fn bind(root: PathBuf, addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            root: Arc::new(root),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever, one task per connection.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let (stream, _) = match self.listener.accept().await {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::debug!(error = %e, "Accept failed");
                        continue;
                    }
                };

                let root = self.root.clone();
                tokio::spawn(async move {
                    handle_connection(stream, &root).await;
                });
            }
        })
    }
}

/// Handle a single TCP connection with minimal HTTP parsing.
async fn handle_connection(mut stream: TcpStream, root: &Path) {
    let Some(head) = read_head(&mut stream).await else {
        return;
    };

    let mut parts = head.lines().next().unwrap_or("").split_whitespace();
    let (method, target) = match (parts.next(), parts.next()) {
        (Some(method), Some(target)) => (method, target),
        _ => {
            respond(&mut stream, "400 Bad Request", "text/plain", b"Bad request", true).await;
            return;
        }
    };

    let with_body = match method {
        "GET" => true,
        "HEAD" => false,
        _ => {
            respond(&mut stream, "405 Method Not Allowed", "text/plain", b"Method not allowed", true)
                .await;
            return;
        }
    };

    let status = match resolve(root, target) {
        Route::File { path, content_type } => match tokio::fs::read(&path).await {
            Ok(data) => {
                respond(&mut stream, "200 OK", content_type, &data, with_body).await;
                "200"
            }
            Err(_) => {
                respond(&mut stream, "404 Not Found", "text/plain", b"Not found", with_body).await;
                "404"
            }
        },
        Route::Forbidden => {
            respond(&mut stream, "403 Forbidden", "text/plain", b"Forbidden", with_body).await;
            "403"
        }
        Route::Invalid => {
            respond(
                &mut stream,
                "500 Internal Server Error",
                "text/plain",
                b"Internal server error",
                with_body,
            )
            .await;
            "500"
        }
    };
    tracing::debug!(method, target, status, "Served request");
}

/// Read up to the end of the request headers. The body, if any, is ignored.
async fn read_head(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") || buf.len() >= MAX_HEADER_BYTES {
            break;
        }
    }
    if buf.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(&buf).into_owned())
}

async fn respond(
    stream: &mut TcpStream,
    status: &str,
    content_type: &str,
    body: &[u8],
    with_body: bool,
) {
    let head = format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    if stream.write_all(head.as_bytes()).await.is_err() {
        return;
    }
    if with_body {
        let _ = stream.write_all(body).await;
    }
    let _ = stream.shutdown().await;
}
