//! Argument helpers shared by the subcommands.

use paco::{Device, FetchDeclaration, Method, Protocol};

/// Parse a `NAME=VALUE` pair. The value may itself contain `=`.
pub fn parse_pair(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {raw:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty name in {raw:?}"));
    }
    Ok((name.to_string(), value.to_string()))
}

/// Request options of `paco fetch`, before they become a declaration.
#[derive(Debug, Default, Clone)]
pub struct FetchOptions {
    pub url: String,
    pub device: Option<Device>,
    pub protocol: Option<Protocol>,
    pub prefix: Option<String>,
    pub separator: Option<String>,
    pub port: Option<String>,
    pub method: Option<Method>,
    pub body: Option<String>,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub no_redirects: bool,
    pub timeout_ms: Option<u64>,
    pub retries: Option<u32>,
    pub user_agent: Option<String>,
}

impl FetchOptions {
    /// Only options given on the command line are set; the rest fall back
    /// to the loaded configuration when the declaration is resolved.
    pub fn into_declaration(self) -> FetchDeclaration {
        let mut decl = FetchDeclaration::new(self.url);
        decl.method = self.method;
        decl.device = self.device;
        decl.protocol = self.protocol;
        decl.url_prefix = self.prefix;
        decl.url_prefix_separator = self.separator;
        decl.port = self.port;
        decl.timeout = self.timeout_ms;
        decl.retries_on_timeout = self.retries;
        decl.user_agent = self.user_agent;
        decl.request_body = self.body;
        if self.no_redirects {
            decl.follow_redirects = Some(false);
        }
        for (name, value) in self.headers {
            decl = decl.header(name, value);
        }
        for (name, value) in self.cookies {
            decl = decl.cookie(name, value);
        }
        decl
    }
}
