//! Minimal HTTP stub standing in for remote QR services.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use qrcard::request::encode_png;
use qrcard::{GenerationRequest, QrEncoder, RemoteFlavor, RemoteService};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

#[derive(Clone)]
pub enum Reply {
    Png(Vec<u8>),
    Status(u16),
    Garbage,
    Hang,
    Delayed(Duration, Vec<u8>),
}

pub struct StubServer {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl StubServer {
    pub async fn spawn(reply: Reply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
        let addr = listener.local_addr().expect("stub addr");
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    continue;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let reply = reply.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, reply).await;
                });
            }
        });

        Self { addr, hits }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn endpoint(&self) -> Url {
        Url::parse(&format!("http://{}/qr", self.addr)).expect("stub url")
    }

    pub fn service(&self, flavor: RemoteFlavor, verify: bool) -> RemoteService {
        RemoteService::new(flavor, self.endpoint(), reqwest::Client::new()).with_verification(verify)
    }
}

async fn serve(mut stream: TcpStream, reply: Reply) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let (status, body) = match reply {
        Reply::Png(body) => (200, body),
        Reply::Status(code) => (code, b"service unavailable".to_vec()),
        Reply::Garbage => (200, b"definitely not an image".to_vec()),
        Reply::Hang => {
            tokio::time::sleep(Duration::from_secs(60)).await;
            return Ok(());
        }
        Reply::Delayed(delay, body) => {
            tokio::time::sleep(delay).await;
            (200, body)
        }
    };

    let head = format!(
        "HTTP/1.1 {status} Stub\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(&body).await?;
    stream.shutdown().await
}

pub fn request(payload: &str) -> GenerationRequest {
    GenerationRequest::builder(payload)
        .size(330)
        .margin(4)
        .build()
        .expect("valid request")
}

/// PNG of a real QR code for `request`, as a service would return it.
pub fn qr_png(request: &GenerationRequest) -> Vec<u8> {
    let image = QrEncoder::new().render(request).expect("encode");
    encode_png(&image).expect("png")
}
