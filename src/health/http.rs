// ABOUTME: Minimal HTTP/1 GET client used by health probes.
// ABOUTME: Built on hyper's connection-level client over a tokio TCP stream.

use std::time::Duration;

use async_trait::async_trait;
use http_body_util::{BodyExt, Empty};
use hyper::Uri;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;

/// Errors that prevent a probe request from producing a reply.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("invalid health URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to connect to {0}: {1}")]
    Connect(String, String),

    #[error("request to {0} timed out")]
    Timeout(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues health GET requests.
#[async_trait]
pub trait HttpProbe: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpReply, ProbeError>;
}

/// `HttpProbe` over plain HTTP using hyper.
#[derive(Debug, Clone, Copy, Default)]
pub struct HyperProbe;

impl HyperProbe {
    async fn request(url: &str, uri: &Uri) -> Result<HttpReply, ProbeError> {
        let host = uri.host().ok_or_else(|| ProbeError::InvalidUrl {
            url: url.to_string(),
            reason: "missing host".to_string(),
        })?;
        let port = uri.port_u16().unwrap_or(80);
        let authority = format!("{}:{}", host, port);

        let stream = TcpStream::connect(&authority)
            .await
            .map_err(|e| ProbeError::Connect(authority.clone(), e.to_string()))?;
        let io = TokioIo::new(stream);

        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| ProbeError::Http(format!("handshake failed: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!("health probe connection error: {}", e);
            }
        });

        let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
        let req = hyper::Request::builder()
            .method("GET")
            .uri(path)
            .header("Host", host)
            .header("User-Agent", concat!("bgctl/", env!("CARGO_PKG_VERSION")))
            .body(Empty::<bytes::Bytes>::new())
            .map_err(|e| ProbeError::Http(format!("failed to build request: {}", e)))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| ProbeError::Http(format!("request failed: {}", e)))?;

        let status = resp.status().as_u16();
        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| ProbeError::Http(format!("failed to read response: {}", e)))?
            .to_bytes();

        Ok(HttpReply {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

#[async_trait]
impl HttpProbe for HyperProbe {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpReply, ProbeError> {
        let uri: Uri = url.parse().map_err(|e: hyper::http::uri::InvalidUri| {
            ProbeError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;
        if uri.scheme_str().is_some_and(|s| s != "http") {
            return Err(ProbeError::InvalidUrl {
                url: url.to_string(),
                reason: "only plain http is supported".to_string(),
            });
        }

        tokio::time::timeout(timeout, Self::request(url, &uri))
            .await
            .map_err(|_| ProbeError::Timeout(url.to_string()))?
    }
}
