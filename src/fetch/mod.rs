// src/fetch/mod.rs

use anyhow::{Context, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, REFERER},
    redirect::Policy,
    Client, StatusCode,
};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub mod report;
pub mod retry;

pub use report::{fetch_report, FetchOutcome};
pub use retry::{get_bytes_with_retry, RetryPolicy};

pub const DEFAULT_REPORT_URL: &str = "https://www.cmegroup.com/delivery_reports/Gold_Stocks.xls";
pub const DEFAULT_REFERER: &str = "https://www.cmegroup.com/";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36";

const MAX_REDIRECTS: usize = 10;

/// Everything the Fetcher needs to know about the remote report.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub url: Url,
    pub user_agent: String,
    pub referer: String,
    pub retry: RetryPolicy,
    pub connect_timeout: Duration,
    /// Whole-request timeout; the file can be large so this is much longer
    /// than the connect timeout.
    pub timeout: Duration,
    /// How many bytes of an error body to keep for diagnostics.
    pub preview_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            url: Url::parse(DEFAULT_REPORT_URL).expect("default report URL is valid"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            retry: RetryPolicy::default(),
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(60),
            preview_bytes: 500,
        }
    }
}

/// Terminal fetch failures. Transient problems are retried before one of
/// these is produced.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GET {url} returned {status} after {attempts} attempt(s)")]
    Status {
        url: Url,
        status: StatusCode,
        attempts: u32,
        preview: String,
    },

    #[error("GET {url} failed after {attempts} attempt(s): {source}")]
    Transport {
        url: Url,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub fn attempts(&self) -> u32 {
        match self {
            FetchError::Status { attempts, .. } | FetchError::Transport { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Build a client that looks like a desktop browser coming from the exchange's
/// own site, with bounded timeouts and redirects.
pub fn build_client(cfg: &FetchConfig) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        REFERER,
        HeaderValue::from_str(&cfg.referer)
            .with_context(|| format!("invalid referer header {:?}", cfg.referer))?,
    );

    Client::builder()
        .user_agent(cfg.user_agent.clone())
        .default_headers(headers)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .connect_timeout(cfg.connect_timeout)
        .timeout(cfg.timeout)
        .build()
        .context("building HTTP client")
}

/// Lossy UTF-8 view of at most `max` leading bytes of a response body.
pub(crate) fn body_preview(body: &[u8], max: usize) -> String {
    String::from_utf8_lossy(&body[..body.len().min(max)]).into_owned()
}

#[cfg(test)]
pub(crate) mod test_server {
    //! Minimal scripted HTTP/1.1 responder for exercising the client.

    use std::{
        net::SocketAddr,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    pub struct Scripted {
        pub addr: SocketAddr,
        hits: Arc<AtomicUsize>,
        requests: Arc<std::sync::Mutex<Vec<String>>>,
    }

    impl Scripted {
        pub fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        pub fn url(&self, path: &str) -> url::Url {
            url::Url::parse(&format!("http://{}{}", self.addr, path)).unwrap()
        }
    }

    /// Close the connection after reading the request, without any reply.
    pub const DROP: u16 = 0;

    /// Serve each `(status, body)` once, in order, one connection per response.
    pub async fn serve(responses: Vec<(u16, Vec<u8>)>) -> Scripted {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(std::sync::Mutex::new(Vec::new()));

        let (h, r) = (hits.clone(), requests.clone());
        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut sock, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };

                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match sock.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                r.lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&buf).into_owned());
                h.fetch_add(1, Ordering::SeqCst);

                if status == DROP {
                    drop(sock);
                    continue;
                }
                let head = format!(
                    "HTTP/1.1 {} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    body.len()
                );
                let _ = sock.write_all(head.as_bytes()).await;
                let _ = sock.write_all(&body).await;
                let _ = sock.shutdown().await;
            }
        });

        Scripted {
            addr,
            hits,
            requests,
        }
    }
}
