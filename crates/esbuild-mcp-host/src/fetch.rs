//! Remote engine module download.

use std::time::Duration;

use esbuild_mcp_common::LoadError;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

/// Largest module accepted from a remote URL.
pub const MAX_MODULE_BYTES: usize = 64 * 1024 * 1024;

/// Downloads engine modules over HTTP.
#[derive(Debug, Clone)]
pub struct ModuleFetcher {
    client: Client,
}

impl ModuleFetcher {
    /// Create a fetcher with default timeouts.
    pub fn new() -> Result<Self, LoadError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("esbuild-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LoadError::initialization(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Download the module at `url`.
    ///
    /// Non-success statuses and bodies over [`MAX_MODULE_BYTES`] are
    /// [`LoadError::Fetch`] failures.
    pub async fn fetch(&self, url: &Url) -> Result<Vec<u8>, LoadError> {
        let fetch_error = |message: String| LoadError::Fetch {
            url: url.to_string(),
            message,
        };

        debug!(%url, "Fetching engine module");

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                fetch_error("request timed out".into())
            } else if e.is_connect() {
                fetch_error(format!("connection failed: {e}"))
            } else {
                fetch_error(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {status}")));
        }

        if response
            .content_length()
            .is_some_and(|len| len > MAX_MODULE_BYTES as u64)
        {
            return Err(fetch_error(format!(
                "module larger than {MAX_MODULE_BYTES} bytes"
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| fetch_error(format!("failed to read body: {e}")))?;
        if body.len() > MAX_MODULE_BYTES {
            return Err(fetch_error(format!(
                "module larger than {MAX_MODULE_BYTES} bytes"
            )));
        }

        info!(%url, size = body.len(), "Engine module downloaded");
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Serve one canned HTTP response on a local port.
    async fn serve_once(response: &'static [u8]) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0_u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        Url::parse(&format!("http://{addr}/esbuild.wasm")).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let url = serve_once(b"HTTP/1.1 200 OK\r\ncontent-length: 8\r\n\r\n\0asm\x01\0\0\0").await;

        let bytes = ModuleFetcher::new().unwrap().fetch(&url).await.unwrap();
        assert_eq!(bytes, b"\0asm\x01\0\0\0");
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let url = serve_once(b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\n\r\n").await;

        let err = ModuleFetcher::new().unwrap().fetch(&url).await.unwrap_err();
        assert!(matches!(err, LoadError::Fetch { .. }));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        // Bind then drop to get a port nothing listens on
        let addr = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();
        let url = Url::parse(&format!("http://{addr}/esbuild.wasm")).unwrap();

        let err = ModuleFetcher::new().unwrap().fetch(&url).await.unwrap_err();
        assert!(matches!(err, LoadError::Fetch { .. }));
    }
}
