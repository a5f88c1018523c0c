//! Loopback HTTP server for client tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A request as seen by the mock server.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: String,
    pub path: String,
    pub head: String,
    pub body: Vec<u8>,
}

impl Captured {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<String> {
        let wanted = name.to_ascii_lowercase();
        self.head.lines().skip(1).find_map(|line| {
            let (k, v) = line.split_once(':')?;
            (k.trim().to_ascii_lowercase() == wanted).then(|| v.trim().to_string())
        })
    }
}

pub struct MockServer {
    pub url: String,
    pub requests: Arc<Mutex<Vec<Captured>>>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockServer {
    pub fn requests(&self) -> Vec<Captured> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Slows request-body reads down to `bytes` per `pause`.
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    pub bytes: usize,
    pub pause: Duration,
}

/// Serves the given `(status, body)` pairs, one per connection, in order.
pub async fn serve(responses: Vec<(u16, &str)>) -> MockServer {
    serve_throttled(responses, None).await
}

/// Like [`serve`], but reads request bodies slowly.
pub async fn serve_throttled(responses: Vec<(u16, &str)>, throttle: Option<Throttle>) -> MockServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let url = format!("http://127.0.0.1:{port}");
    let requests = Arc::new(Mutex::new(Vec::new()));
    let responses: Vec<(u16, String)> = responses
        .into_iter()
        .map(|(s, b)| (s, b.to_string()))
        .collect();

    let captured = requests.clone();
    let handle = tokio::spawn(async move {
        for (status, body) in responses {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            if let Some(req) = read_request(&mut stream, throttle).await {
                captured.lock().unwrap().push(req);
            }
            let resp = format!(
                "HTTP/1.1 {status} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(resp.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    MockServer {
        url,
        requests,
        handle,
    }
}

/// Accepts connections and reads requests but never answers.
pub async fn serve_stalled() -> MockServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let captured = requests.clone();
    let handle = tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((mut stream, _)) = listener.accept().await {
            if let Some(req) = read_request(&mut stream, None).await {
                captured.lock().unwrap().push(req);
            }
            open.push(stream);
        }
    });

    MockServer {
        url: format!("http://127.0.0.1:{port}"),
        requests,
        handle,
    }
}

async fn read_request(stream: &mut TcpStream, throttle: Option<Throttle>) -> Option<Captured> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut req = Captured {
        method: String::new(),
        path: String::new(),
        head,
        body: Vec::new(),
    };
    let mut first = req.head.lines().next().unwrap_or_default().split_whitespace();
    req.method = first.next().unwrap_or_default().to_string();
    req.path = first.next().unwrap_or_default().to_string();

    let chunked = req
        .header("transfer-encoding")
        .is_some_and(|v| v.contains("chunked"));
    let length: usize = req
        .header("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let mut body = buf[header_end..].to_vec();
    let mut since_pause = 0;
    loop {
        let done = if chunked {
            body.ends_with(b"0\r\n\r\n")
        } else {
            body.len() >= length
        };
        if done {
            break;
        }
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
        if let Some(throttle) = throttle {
            since_pause += n;
            if since_pause >= throttle.bytes {
                since_pause = 0;
                tokio::time::sleep(throttle.pause).await;
            }
        }
    }
    req.body = body;
    Some(req)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
