//! HTTP retrieval of listing pages and package files.
//!
//! Connecting and every read are bounded by the configured timeout; a page
//! must also arrive in full within it. Package downloads have no overall
//! limit, only a stalled body fails them. A timed-out attempt is retried a
//! bounded number of times before surfacing as [`FetchError::Timeout`];
//! every other failure surfaces immediately.

use std::error::Error as _;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum FetchError {
    /// Every attempt ran out of time.
    #[error("Timed out fetching {url}")]
    Timeout { url: String },

    /// The server answered with a non-success status.
    #[error("Fetching {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Connection or protocol failure other than a timeout.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Writing the downloaded file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Retrieval capability consumed by the update pipeline.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return the body as text.
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError>;

    /// Stream `url` into `dest`, returning the number of bytes written.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError>;
}

/// [`PageFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
    retries: u32,
}

impl HttpFetcher {
    /// Build a fetcher that gives up on a connection, a stalled read or a
    /// whole page after `timeout`, and retries timed-out attempts up to
    /// `retries` extra times.
    pub fn new(timeout: Duration, retries: u32) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(crate::USER_AGENT)
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            timeout,
            retries,
        })
    }

    async fn with_retries<T, F, Fut>(&self, url: &str, mut attempt: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut retried = 0;
        loop {
            match attempt().await {
                Err(FetchError::Timeout { .. }) if retried < self.retries => {
                    retried += 1;
                    warn!(url, attempt = retried, "request timed out, retrying");
                }
                result => return result,
            }
        }
    }

    async fn send(url: &str, request: RequestBuilder) -> Result<Response, FetchError> {
        let response = request.send().await.map_err(|e| classify(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn fetch_page_once(&self, url: &str) -> Result<String, FetchError> {
        let response = Self::send(url, self.client.get(url).timeout(self.timeout)).await?;
        response.text().await.map_err(|e| classify(url, e))
    }

    async fn download_once(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let response = Self::send(url, self.client.get(url)).await?;

        // Truncates whatever an earlier attempt left behind
        let mut file = File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| classify(url, e))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        Ok(written)
    }
}

fn is_timeout(err: &reqwest::Error) -> bool {
    if err.is_timeout() {
        return true;
    }
    let mut source = err.source();
    while let Some(e) = source {
        if e
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::TimedOut)
        {
            return true;
        }
        source = e.source();
    }
    false
}

fn classify(url: &str, err: reqwest::Error) -> FetchError {
    if is_timeout(&err) {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Http(err)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        debug!(url, "fetching page");
        self.with_retries(url, || self.fetch_page_once(url)).await
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        debug!(url, dest = %dest.display(), "downloading");
        self.with_retries(url, || self.download_once(url, dest)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use mockito::Server;
    use tokio::io::AsyncReadExt;
    use tokio::net::{TcpListener, TcpStream};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5), 0).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_page() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/mainline/")
            .match_header("user-agent", crate::USER_AGENT)
            .with_status(200)
            .with_body("<a href=\"v6.9/\">v6.9/</a>")
            .create_async()
            .await;

        let body = fetcher()
            .fetch_page(&format!("{}/mainline/", server.url()))
            .await
            .unwrap();
        assert!(body.contains("v6.9/"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/mainline/v9.9/")
            .with_status(404)
            .create_async()
            .await;

        let err = fetcher()
            .fetch_page(&format!("{}/mainline/v9.9/", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let mut server = Server::new_async().await;
        let body = vec![7u8; 4096];
        let _m = server
            .mock("GET", "/amd64/linux-image.deb")
            .with_status(200)
            .with_body(&body)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("linux-image.deb");
        let written = fetcher()
            .download(&format!("{}/amd64/linux-image.deb", server.url()), &dest)
            .await
            .unwrap();

        assert_eq!(written, 4096);
        assert_eq!(std::fs::read(&dest).unwrap(), body);
    }

    /// Serve raw HTTP on a local port, handing each connection and its
    /// zero-based index to `handler`. Returns the base URL and the
    /// connection counter.
    async fn serve<F, Fut>(handler: F) -> (String, Arc<AtomicUsize>)
    where
        F: Fn(usize, TcpStream) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let count = Arc::new(AtomicUsize::new(0));
        let accepted = Arc::clone(&count);
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let n = accepted.fetch_add(1, Ordering::SeqCst);
                let mut request = [0u8; 2048];
                let _ = stream.read(&mut request).await;
                tokio::spawn(handler(n, stream));
            }
        });
        (url, count)
    }

    fn headers(len: usize) -> String {
        format!("HTTP/1.1 200 OK\r\nContent-Length: {len}\r\nConnection: close\r\n\r\n")
    }

    #[tokio::test]
    async fn test_stalled_download_times_out_after_retries() {
        let (url, count) = serve(|_, mut stream| async move {
            stream.write_all(headers(40).as_bytes()).await.unwrap();
            stream.write_all(b"partial").await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        })
        .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = HttpFetcher::new(Duration::from_millis(300), 2).unwrap();
        let err = fetcher
            .download(&format!("{url}/big.deb"), &dir.path().join("big.deb"))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout { .. }), "got {err:?}");
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stalled_page_times_out_after_retries() {
        let (url, count) = serve(|_, stream| async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(stream);
        })
        .await;

        let fetcher = HttpFetcher::new(Duration::from_millis(300), 1).unwrap();
        let err = fetcher.fetch_page(&format!("{url}/mainline/")).await.unwrap_err();

        assert!(matches!(err, FetchError::Timeout { .. }), "got {err:?}");
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_slow_download_outlasting_timeout_succeeds() {
        let (url, count) = serve(|_, mut stream| async move {
            stream.write_all(headers(20).as_bytes()).await.unwrap();
            for _ in 0..20 {
                tokio::time::sleep(Duration::from_millis(50)).await;
                stream.write_all(b"x").await.unwrap();
            }
        })
        .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("modules.deb");
        let fetcher = HttpFetcher::new(Duration::from_millis(300), 0).unwrap();
        let written = fetcher
            .download(&format!("{url}/modules.deb"), &dest)
            .await
            .unwrap();

        assert_eq!(written, 20);
        assert_eq!(std::fs::read(&dest).unwrap(), vec![b'x'; 20]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retried_download_replaces_partial_file() {
        let (url, count) = serve(|n, mut stream| async move {
            stream.write_all(headers(8).as_bytes()).await.unwrap();
            if n == 0 {
                stream.write_all(b"junk").await.unwrap();
                tokio::time::sleep(Duration::from_secs(30)).await;
            } else {
                stream.write_all(b"complete").await.unwrap();
            }
        })
        .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("image.deb");
        let fetcher = HttpFetcher::new(Duration::from_millis(300), 1).unwrap();
        let written = fetcher
            .download(&format!("{url}/image.deb"), &dest)
            .await
            .unwrap();

        assert_eq!(written, 8);
        assert_eq!(std::fs::read(&dest).unwrap(), b"complete");
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
