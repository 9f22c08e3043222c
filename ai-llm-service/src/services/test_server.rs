//! Minimal HTTP/1.1 server on `127.0.0.1:0` for exercising provider clients.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

/// One request as seen by the server.
#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    /// Lowercased request line and headers.
    pub head: String,
    pub body: String,
}

impl Recorded {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

pub(crate) struct TestServer {
    pub url: String,
    pub hits: Arc<AtomicUsize>,
    pub requests: Arc<Mutex<Vec<Recorded>>>,
}

impl TestServer {
    /// Answers every request with `status` and a JSON `body`.
    pub async fn replying(status: u16, body: &'static str) -> Self {
        Self::start(Some((status, body))).await
    }

    /// Accepts connections and never answers.
    pub async fn silent() -> Self {
        Self::start(None).await
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last(&self) -> Recorded {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }

    async fn start(reply: Option<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let (h, r) = (Arc::clone(&hits), Arc::clone(&requests));
        tokio::spawn(async move {
            // Held so silent connections stay open until the test ends.
            let mut parked = Vec::new();
            while let Ok((mut sock, _)) = listener.accept().await {
                h.fetch_add(1, Ordering::SeqCst);
                match reply {
                    Some((status, body)) => {
                        let r = Arc::clone(&r);
                        tokio::spawn(async move {
                            if let Some(req) = read_request(&mut sock).await {
                                r.lock().unwrap().push(req);
                            }
                            let resp = format!(
                                "HTTP/1.1 {status} STATUS\r\ncontent-type: application/json\r\n\
                                 content-length: {}\r\nconnection: close\r\n\r\n{body}",
                                body.len()
                            );
                            let _ = sock.write_all(resp.as_bytes()).await;
                            let _ = sock.shutdown().await;
                        });
                    }
                    None => parked.push(sock),
                }
            }
        });

        Self {
            url,
            hits,
            requests,
        }
    }
}

async fn read_request(sock: &mut TcpStream) -> Option<Recorded> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let n = sock.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
    let len = head
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = head_end + 4;
    while buf.len() < body_start + len {
        let n = sock.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Some(Recorded {
        head,
        body: String::from_utf8_lossy(&buf[body_start..]).into_owned(),
    })
}
