//! Execute request specs with a bounded retry on timeout.
//!
//! Only timeouts are retried, immediately and with an identical request,
//! until `retries_on_timeout + 1` attempts have been made. Every other
//! failure ends the fetch on first occurrence. Non-2xx statuses are
//! ordinary responses.

pub mod response;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

pub use response::{OutboundRequest, RawResponse};
pub use transport::{Attempt, HttpTransport, Transport};

use crate::config::Config;
use crate::error::{PacoResult, TransportError};
use crate::spec::RequestSpec;
use crate::url_builder;

/// Result of the retry loop for one request spec.
#[derive(Debug)]
pub enum FetchOutcome {
    Success { response: RawResponse, attempts: u32 },
    TimeoutExhausted { attempts: u32 },
    Fatal { error: TransportError, attempts: u32 },
}

/// A completed fetch: what was sent, what came back.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub request: OutboundRequest,
    pub response: RawResponse,
    pub attempts: u32,
}

/// Runs request specs through a [`Transport`].
#[derive(Clone)]
pub struct Fetcher {
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
}

impl Fetcher {
    /// Fetcher over the default reqwest transport.
    pub fn new(config: Arc<Config>) -> Self {
        Self::with_transport(config, Arc::new(HttpTransport::new()))
    }

    pub fn with_transport(config: Arc<Config>, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Assemble the outbound request for `spec`.
    ///
    /// Header order: User-Agent, Referer, Cookie, then explicit headers,
    /// which replace any earlier header of the same name.
    pub fn assemble(&self, spec: &RequestSpec) -> PacoResult<OutboundRequest> {
        let url = url_builder::build(spec)?;

        let mut request = OutboundRequest {
            method: spec.method(),
            url,
            headers: Vec::new(),
            body: spec.request_body().to_string(),
            timeout: Duration::from_millis(spec.timeout_ms()),
            follow_redirects: spec.follow_redirects(),
            proxy: spec.proxy().cloned(),
        };

        request.set_header("User-Agent", spec.effective_user_agent());
        if !spec.referrer().is_empty() {
            request.set_header("Referer", spec.referrer());
        }
        if !spec.cookies().is_empty() {
            let cookie = spec
                .cookies()
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; ");
            request.set_header("Cookie", &cookie);
        }
        for header in spec.headers() {
            request.set_header(&header.name, &header.value);
        }

        Ok(request)
    }

    /// Run the bounded attempt loop for an assembled request.
    pub async fn run_attempts(&self, request: &OutboundRequest, retries_on_timeout: u32) -> FetchOutcome {
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            info!(
                url = %request.url,
                user_agent = request.user_agent().unwrap_or(""),
                attempt = attempts,
                "fetching page"
            );

            match self.transport.send(request).await {
                Attempt::Success(response) => {
                    return FetchOutcome::Success { response, attempts };
                }
                Attempt::TimedOut if attempts <= retries_on_timeout => {
                    warn!(
                        url = %request.url,
                        attempt = attempts,
                        timeout_ms = request.timeout.as_millis() as u64,
                        "fetch timed out, retrying"
                    );
                }
                Attempt::TimedOut => {
                    warn!(url = %request.url, attempts, "fetch timed out, retry budget exhausted");
                    return FetchOutcome::TimeoutExhausted { attempts };
                }
                Attempt::Fatal(error) => {
                    return FetchOutcome::Fatal { error, attempts };
                }
            }
        }
    }

    /// Fetch `spec`, returning the request sent and the response received.
    pub async fn execute(&self, spec: &RequestSpec) -> PacoResult<Exchange> {
        let request = self.assemble(spec)?;

        match self.run_attempts(&request, spec.retries_on_timeout()).await {
            FetchOutcome::Success { response, attempts } => {
                self.check_content_type(&request, &response)?;
                Ok(Exchange {
                    request,
                    response,
                    attempts,
                })
            }
            FetchOutcome::TimeoutExhausted { attempts } => Err(TransportError::TimeoutExhausted {
                url: request.url,
                attempts,
            }
            .into()),
            FetchOutcome::Fatal { error, .. } => Err(error.into()),
        }
    }

    fn check_content_type(
        &self,
        request: &OutboundRequest,
        response: &RawResponse,
    ) -> Result<(), TransportError> {
        if self.config.ignore_content_type {
            return Ok(());
        }
        match response.content_type.as_deref() {
            Some(ct) if !is_textual(ct) => Err(TransportError::UnsupportedContentType {
                url: request.url.clone(),
                content_type: ct.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher").field("config", &self.config).finish()
    }
}

fn is_textual(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime.is_empty()
        || mime.starts_with("text/")
        || mime == "application/json"
        || mime.ends_with("+json")
        || mime == "application/xml"
        || mime.ends_with("+xml")
}
