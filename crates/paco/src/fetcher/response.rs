//! Wire-level request and response values exchanged with a transport.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::spec::{Method, ProxySpec};

/// Fully assembled request, ready to hand to a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL as built from the request spec.
    pub url: String,
    /// Ordered headers; names are unique case-insensitively.
    pub headers: Vec<(String, String)>,
    /// Request body; empty sends none.
    pub body: String,
    /// Per-attempt timeout; zero disables it.
    pub timeout: Duration,
    /// Follow 3xx responses, up to ten hops.
    pub follow_redirects: bool,
    /// Proxy all traffic through this endpoint.
    pub proxy: Option<ProxySpec>,
}

impl OutboundRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.header("User-Agent")
    }

    pub fn referrer(&self) -> Option<&str> {
        self.header("Referer")
    }

    /// Set a header, replacing any earlier header of the same name.
    pub(crate) fn set_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some(slot) => *slot = (name.to_string(), value.to_string()),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }
}

/// Unprocessed result of one fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Reason phrase as sent by the server.
    pub status_message: String,
    /// Lowercased header name to its first value.
    pub headers: BTreeMap<String, String>,
    /// Cookie name to value; path, domain and expiry are dropped.
    pub cookies: BTreeMap<String, String>,
    /// Body bytes as received, undecoded.
    pub body: Vec<u8>,
    /// URL of the last request, after redirects.
    pub final_url: String,
    /// `Content-Type` header value, if any.
    pub content_type: Option<String>,
}

impl RawResponse {
    /// Normalize raw header pairs into the single-value model.
    ///
    /// Every `Set-Cookie` value contributes its leading `name=value` pair to
    /// the cookie map; a later cookie of the same name replaces an earlier one.
    pub fn from_parts<I, K, V>(
        status: u16,
        status_message: impl Into<String>,
        headers: I,
        body: Vec<u8>,
        final_url: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut header_map = BTreeMap::new();
        let mut cookies = BTreeMap::new();

        for (name, value) in headers {
            let name = name.as_ref().to_ascii_lowercase();
            let value = value.into();
            if name == "set-cookie" {
                if let Some((cookie, cookie_value)) = parse_set_cookie(&value) {
                    cookies.insert(cookie, cookie_value);
                }
            }
            header_map.entry(name).or_insert(value);
        }

        let content_type = header_map.get("content-type").cloned();

        Self {
            status,
            status_message: status_message.into(),
            headers: header_map,
            cookies,
            body,
            final_url: final_url.into(),
            content_type,
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

fn parse_set_cookie(value: &str) -> Option<(String, String)> {
    let pair = value.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().trim_matches('"').to_string()))
}
