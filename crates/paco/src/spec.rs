//! Fetch declarations and the immutable request specs resolved from them.
//!
//! A [`FetchDeclaration`] is what a test declares: only `url` is required and
//! every other field falls back to the process [`Config`]. Resolving it yields
//! a [`RequestSpec`], which never changes afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// HTTP method of a fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Trace,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            "TRACE" => Ok(Method::Trace),
            other => Err(format!("unknown method: {other}")),
        }
    }
}

/// URL scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    /// Lowercase scheme name, as used in URLs.
    pub fn scheme(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

impl std::str::FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            other => Err(format!("unknown protocol: {other}")),
        }
    }
}

const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                                  AppleWebKit/537.36 (KHTML, like Gecko) \
                                  Chrome/131.0.0.0 Safari/537.36";

const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X) \
                                 AppleWebKit/605.1.15 (KHTML, like Gecko) \
                                 Version/17.5 Mobile/15E148 Safari/604.1";

/// Simulated client class. Each profile maps to one canonical user agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Device {
    #[default]
    Desktop,
    Mobile,
}

impl Device {
    /// Canonical user-agent string for this profile.
    pub fn user_agent(self) -> &'static str {
        match self {
            Device::Desktop => DESKTOP_USER_AGENT,
            Device::Mobile => MOBILE_USER_AGENT,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Desktop => f.write_str("DESKTOP"),
            Device::Mobile => f.write_str("MOBILE"),
        }
    }
}

impl std::str::FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DESKTOP" => Ok(Device::Desktop),
            "MOBILE" => Ok(Device::Mobile),
            other => Err(format!("unknown device: {other}")),
        }
    }
}

/// A cookie or header given as a name/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameValue {
    /// Cookie or header name.
    pub name: String,
    /// Value sent as is.
    pub value: String,
}

impl NameValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Proxy endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySpec {
    /// Host name or address, optionally with a scheme.
    pub host: String,
    /// Proxy port.
    pub port: u16,
}

impl ProxySpec {
    /// Proxy URL in the form reqwest expects. A host that already carries a
    /// scheme is used as is.
    pub fn url(&self) -> String {
        if self.host.contains("://") {
            format!("{}:{}", self.host.trim_end_matches('/'), self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }
}

/// Declarative description of one fetch, as written by a test.
///
/// Unset fields take their value from [`Config`] on [`resolve`](Self::resolve).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchDeclaration {
    pub url: String,
    pub method: Option<Method>,
    pub device: Option<Device>,
    pub protocol: Option<Protocol>,
    pub url_prefix: Option<String>,
    pub url_prefix_separator: Option<String>,
    pub port: Option<String>,
    pub referrer: Option<String>,
    pub timeout: Option<u64>,
    pub retries_on_timeout: Option<u32>,
    pub follow_redirects: Option<bool>,
    pub user_agent: Option<String>,
    pub request_body: Option<String>,
    pub cookies: Vec<NameValue>,
    pub headers: Vec<NameValue>,
    pub proxy: Option<ProxySpec>,
}

impl FetchDeclaration {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }

    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    pub fn url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = Some(prefix.into());
        self
    }

    pub fn url_prefix_separator(mut self, separator: impl Into<String>) -> Self {
        self.url_prefix_separator = Some(separator.into());
        self
    }

    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    pub fn referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    pub fn timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(timeout_ms);
        self
    }

    pub fn retries_on_timeout(mut self, retries: u32) -> Self {
        self.retries_on_timeout = Some(retries);
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = Some(follow);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn request_body(mut self, body: impl Into<String>) -> Self {
        self.request_body = Some(body.into());
        self
    }

    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push(NameValue::new(name, value));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(NameValue::new(name, value));
        self
    }

    pub fn proxy(mut self, host: impl Into<String>, port: u16) -> Self {
        self.proxy = Some(ProxySpec {
            host: host.into(),
            port,
        });
        self
    }

    /// Fill every unset field from `config` and freeze the result.
    ///
    /// A timeout of 0 counts as unset.
    ///
    /// The configured user agent only replaces the device mapping when the
    /// declaration names neither a user agent nor a device.
    pub fn resolve(&self, config: &Config) -> RequestSpec {
        let user_agent = match (&self.user_agent, self.device) {
            (Some(ua), _) => Some(ua.clone()),
            (None, None) => config.user_agent.clone(),
            (None, Some(_)) => None,
        };

        RequestSpec {
            url: self.url.clone(),
            method: self.method.unwrap_or_default(),
            device: self.device.unwrap_or_default(),
            protocol: self.protocol.unwrap_or(config.protocol),
            url_prefix: self
                .url_prefix
                .clone()
                .unwrap_or_else(|| config.url_prefix.clone()),
            url_prefix_separator: self
                .url_prefix_separator
                .clone()
                .unwrap_or_else(|| DEFAULT_PREFIX_SEPARATOR.to_string()),
            port: self.port.clone().unwrap_or_else(|| config.port.clone()),
            referrer: self
                .referrer
                .clone()
                .unwrap_or_else(|| config.referrer.clone()),
            timeout_ms: self.timeout.filter(|t| *t > 0).unwrap_or(config.timeout_ms),
            retries_on_timeout: self.retries_on_timeout.unwrap_or(config.retries_on_timeout),
            follow_redirects: self.follow_redirects.unwrap_or(true),
            user_agent,
            request_body: self.request_body.clone().unwrap_or_default(),
            cookies: self.cookies.clone(),
            headers: self.headers.clone(),
            proxy: self.proxy.clone().or_else(|| config.proxy.clone()),
        }
    }
}

/// Separator placed between a non-empty URL prefix and the URL.
pub const DEFAULT_PREFIX_SEPARATOR: &str = ".";

/// Immutable description of one HTTP fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSpec {
    url: String,
    method: Method,
    device: Device,
    protocol: Protocol,
    url_prefix: String,
    url_prefix_separator: String,
    port: String,
    referrer: String,
    timeout_ms: u64,
    retries_on_timeout: u32,
    follow_redirects: bool,
    user_agent: Option<String>,
    request_body: String,
    cookies: Vec<NameValue>,
    headers: Vec<NameValue>,
    proxy: Option<ProxySpec>,
}

impl RequestSpec {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    pub fn url_prefix_separator(&self) -> &str {
        &self.url_prefix_separator
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn referrer(&self) -> &str {
        &self.referrer
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn retries_on_timeout(&self) -> u32 {
        self.retries_on_timeout
    }

    pub fn follow_redirects(&self) -> bool {
        self.follow_redirects
    }

    /// Explicit user agent, if one was declared or configured.
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// User agent sent with the request: the explicit one, else the
    /// device's canonical string.
    pub fn effective_user_agent(&self) -> &str {
        self.user_agent
            .as_deref()
            .unwrap_or_else(|| self.device.user_agent())
    }

    pub fn request_body(&self) -> &str {
        &self.request_body
    }

    pub fn cookies(&self) -> &[NameValue] {
        &self.cookies
    }

    pub fn headers(&self) -> &[NameValue] {
        &self.headers
    }

    pub fn proxy(&self) -> Option<&ProxySpec> {
        self.proxy.as_ref()
    }
}
