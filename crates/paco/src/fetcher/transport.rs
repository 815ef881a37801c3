//! The network seam behind the fetcher.
//!
//! Not a browser, just HTTP: one request per attempt, no cookie jar, no
//! JavaScript. Each attempt reports a tagged [`Attempt`] so the retry
//! policy never has to inspect error strings.

use async_trait::async_trait;

use super::response::{OutboundRequest, RawResponse};
use crate::error::TransportError;
use crate::spec::Method;

/// Upper bound on followed redirects when redirects are enabled.
const MAX_REDIRECTS: usize = 10;

/// Outcome of a single network attempt.
#[derive(Debug)]
pub enum Attempt {
    Success(RawResponse),
    /// Connect or read timeout; the only retryable outcome.
    TimedOut,
    Fatal(TransportError),
}

/// Executes one attempt of an outbound request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Attempt;
}

/// reqwest-backed transport.
///
/// A client is built per request because proxy, redirect policy and timeout
/// all vary per fetch. Certificate validation is disabled and the body size
/// is unrestricted.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport;

impl HttpTransport {
    pub fn new() -> Self {
        Self
    }

    fn client_for(request: &OutboundRequest) -> Result<reqwest::Client, TransportError> {
        let redirect = if request.follow_redirects {
            reqwest::redirect::Policy::limited(MAX_REDIRECTS)
        } else {
            reqwest::redirect::Policy::none()
        };

        let mut builder = reqwest::Client::builder()
            .redirect(redirect)
            .danger_accept_invalid_certs(true);
        // Zero means no timeout.
        if !request.timeout.is_zero() {
            builder = builder
                .timeout(request.timeout)
                .connect_timeout(request.timeout);
        }

        builder = match &request.proxy {
            Some(proxy) => {
                let proxy = reqwest::Proxy::all(proxy.url()).map_err(|e| {
                    TransportError::InvalidUrl {
                        url: proxy.url(),
                        reason: e.to_string(),
                    }
                })?;
                builder.proxy(proxy)
            }
            None => builder.no_proxy(),
        };

        builder.build().map_err(|e| TransportError::Request {
            url: request.url.clone(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &OutboundRequest) -> Attempt {
        let url = match url::Url::parse(&request.url) {
            Ok(url) => url,
            Err(e) => {
                return Attempt::Fatal(TransportError::InvalidUrl {
                    url: request.url.clone(),
                    reason: e.to_string(),
                })
            }
        };

        let client = match Self::client_for(request) {
            Ok(client) => client,
            Err(e) => return Attempt::Fatal(e),
        };

        let mut builder = client.request(reqwest_method(request.method), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let resp = match builder.send().await {
            Ok(resp) => resp,
            Err(e) => return classify(&request.url, e),
        };

        let status = resp.status();
        let status_message = reason_phrase(&resp);
        let final_url = resp.url().to_string();
        let headers: Vec<(String, String)> = resp
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();

        let body = match resp.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => return classify(&request.url, e),
        };

        Attempt::Success(RawResponse::from_parts(
            status.as_u16(),
            status_message,
            headers,
            body,
            final_url,
        ))
    }
}

/// Reason phrase as sent by the server, else the canonical one.
fn reason_phrase(resp: &reqwest::Response) -> String {
    match resp.extensions().get::<hyper::ext::ReasonPhrase>() {
        Some(reason) => String::from_utf8_lossy(reason.as_bytes()).into_owned(),
        None => resp.status().canonical_reason().unwrap_or("").to_string(),
    }
}

fn classify(url: &str, e: reqwest::Error) -> Attempt {
    if e.is_timeout() {
        return Attempt::TimedOut;
    }
    let reason = e.to_string();
    let url = url.to_string();
    if e.is_connect() {
        Attempt::Fatal(TransportError::Connect { url, reason })
    } else {
        Attempt::Fatal(TransportError::Request { url, reason })
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
        Method::Patch => reqwest::Method::PATCH,
        Method::Head => reqwest::Method::HEAD,
        Method::Options => reqwest::Method::OPTIONS,
        Method::Trace => reqwest::Method::TRACE,
    }
}
