//! HTTP transport seam
//!
//! The chain engine only decides when to call and what to do with the result;
//! TLS, pooling, and retry live behind the [`Transport`] trait. The
//! production implementation drives async reqwest through a shared tokio
//! runtime and presents a sync interface.

use std::sync::LazyLock;
use std::time::Duration;

use crate::error::ExtractError;

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Request timeout for a single attempt
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const DEFAULT_MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(2);

/// Opaque basic-auth credential, passed through unmodified.
#[derive(Debug, Clone)]
pub struct BasicCredential {
    pub user: String,
    pub secret: String,
}

/// Raw response handed back to the engine.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// `GET(url, params, credential) -> (status, body)`.
///
/// `Sync` so independent parent records can be fetched from a worker pool.
pub trait Transport: Sync {
    fn get(
        &self,
        url: &str,
        params: &[(String, String)],
        credential: Option<&BasicCredential>,
    ) -> Result<HttpResponse, ExtractError>;
}

/// Shared async HTTP client with connection pooling.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .pool_max_idle_per_host(8)
        .build()
        .expect("failed to build HTTP client")
});

/// Shared tokio runtime for HTTP operations.
static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Reqwest-backed transport with bounded exponential-backoff retry on
/// rate limits (429) and server errors (5xx).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    max_retries: u32,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl HttpTransport {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    fn get_once(
        &self,
        url: &str,
        params: &[(String, String)],
        credential: Option<&BasicCredential>,
    ) -> Result<HttpResponse, reqwest::Error> {
        SHARED_RUNTIME.handle().block_on(async {
            let mut request = SHARED_CLIENT.get(url);
            if !params.is_empty() {
                request = request.query(params);
            }
            if let Some(cred) = credential {
                request = request.basic_auth(&cred.user, Some(&cred.secret));
            }
            let response = request.send().await?.error_for_status()?;
            let status = response.status().as_u16();
            let body = response.bytes().await?.to_vec();
            Ok(HttpResponse { status, body })
        })
    }
}

impl Transport for HttpTransport {
    fn get(
        &self,
        url: &str,
        params: &[(String, String)],
        credential: Option<&BasicCredential>,
    ) -> Result<HttpResponse, ExtractError> {
        for attempt in 0..=self.max_retries {
            match self.get_once(url, params, credential) {
                Ok(response) => return Ok(response),
                Err(e) => {
                    let status = e.status().map(|s| s.as_u16());
                    let retryable = matches!(status, Some(429) | Some(500..=599));
                    if retryable && attempt < self.max_retries {
                        let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                        log::warn!(
                            "request failed (status {}), retry {}/{} in {:?}",
                            status.map_or("?".to_string(), |s| s.to_string()),
                            attempt + 1,
                            self.max_retries,
                            delay
                        );
                        std::thread::sleep(delay);
                    } else {
                        return Err(ExtractError::from_reqwest(&e));
                    }
                }
            }
        }
        unreachable!("retry loop returns on final attempt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_transport_retry_budget() {
        assert_eq!(HttpTransport::default().max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn credential_is_cloneable_and_opaque() {
        let cred = BasicCredential {
            user: "token".to_string(),
            secret: "pass".to_string(),
        };
        let copy = cred.clone();
        assert_eq!(copy.user, "token");
        assert_eq!(copy.secret, "pass");
    }
}
