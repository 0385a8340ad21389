//! Local HTTP/1.1 server answering with canned responses.
//!
//! Each connection serves one request, then closes. The handler sees the
//! request path (with query) and picks the response. Hits and paths are
//! recorded for assertions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// One canned response.
pub struct Canned {
    pub status: u16,
    pub body: String,
    /// Declare more bytes than are sent, so reading the body fails.
    pub truncated: bool,
}

impl Canned {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            truncated: false,
        }
    }

    pub fn truncated(mut self) -> Self {
        self.truncated = true;
        self
    }
}

pub struct StubServer {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
    paths: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&str) -> Canned + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let paths = Arc::new(Mutex::new(Vec::new()));
        let handler = Arc::new(handler);

        {
            let hits = Arc::clone(&hits);
            let paths = Arc::clone(&paths);
            tokio::spawn(async move {
                while let Ok((socket, _)) = listener.accept().await {
                    let hits = Arc::clone(&hits);
                    let paths = Arc::clone(&paths);
                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move {
                        serve(socket, hits, paths, handler.as_ref()).await;
                    });
                }
            });
        }

        Self {
            base_url: format!("http://{addr}"),
            hits,
            paths,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

async fn serve<F>(
    mut socket: TcpStream,
    hits: Arc<AtomicUsize>,
    paths: Arc<Mutex<Vec<String>>>,
    handler: &F,
) where
    F: Fn(&str) -> Canned,
{
    let Some(path) = read_request_path(&mut socket).await else {
        return;
    };
    hits.fetch_add(1, Ordering::SeqCst);
    paths.lock().unwrap().push(path.clone());

    let canned = handler(&path);
    let declared = if canned.truncated {
        canned.body.len() + 4096
    } else {
        canned.body.len()
    };
    let head = format!(
        "HTTP/1.1 {} Canned\r\nContent-Type: text/html\r\nContent-Length: {declared}\r\nConnection: close\r\n\r\n",
        canned.status
    );

    let _ = socket.write_all(head.as_bytes()).await;
    let _ = socket.write_all(canned.body.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn read_request_path(socket: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let head = String::from_utf8_lossy(&buf);
    head.lines()
        .next()?
        .split_whitespace()
        .nth(1)
        .map(str::to_string)
}
