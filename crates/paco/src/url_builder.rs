//! Compose absolute request URLs from declarative parts.

use crate::error::ConfigError;
use crate::spec::RequestSpec;

/// Build the absolute URL for `spec`.
///
/// `scheme://[prefix<sep>]url` with `:port` inserted after the host. The
/// separator is skipped when the prefix is empty or already ends with it.
/// A URL that carries its own scheme or port keeps them.
pub fn build(spec: &RequestSpec) -> Result<String, ConfigError> {
    compose(
        spec.protocol().scheme(),
        spec.url_prefix(),
        spec.url_prefix_separator(),
        spec.url(),
        spec.port(),
    )
}

/// Extends the plain `prefix + separator + url` rule: a prefix already
/// ending in the separator gets no second one, and an authority that
/// already names a port gets no `:port` appended.
fn compose(
    scheme: &str,
    prefix: &str,
    separator: &str,
    url: &str,
    port: &str,
) -> Result<String, ConfigError> {
    let (scheme, url) = match url.split_once("://") {
        Some((explicit, rest)) if !explicit.is_empty() => (explicit, rest),
        _ => (scheme, url),
    };

    let host = if prefix.is_empty() {
        url.to_string()
    } else if prefix.ends_with(separator) {
        format!("{prefix}{url}")
    } else {
        format!("{prefix}{separator}{url}")
    };

    let split = host.find(['/', '?', '#']).unwrap_or(host.len());
    let (authority, rest) = host.split_at(split);

    if authority.is_empty() {
        return Err(ConfigError::EmptyHost {
            prefix: prefix.to_string(),
            url: url.to_string(),
        });
    }

    let port = port.trim();
    if port.is_empty() || has_port(authority) {
        Ok(format!("{scheme}://{authority}{rest}"))
    } else {
        Ok(format!("{scheme}://{authority}:{port}{rest}"))
    }
}

fn has_port(authority: &str) -> bool {
    match authority.rsplit_once(':') {
        Some((host, port)) => {
            !host.is_empty() && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::spec::{FetchDeclaration, Protocol};

    fn built(decl: FetchDeclaration) -> Result<String, ConfigError> {
        build(&decl.resolve(&Config::default()))
    }

    #[test]
    fn test_prefix_with_separator_and_port() {
        let url = built(
            FetchDeclaration::new("wikipedia.org")
                .url_prefix("en")
                .url_prefix_separator(".")
                .port("80"),
        )
        .unwrap();
        assert_eq!(url, "http://en.wikipedia.org:80");
    }

    #[test]
    fn test_empty_prefix_adds_no_separator() {
        let url = built(
            FetchDeclaration::new("wikipedia.org")
                .url_prefix("")
                .url_prefix_separator("-")
                .port("80"),
        )
        .unwrap();
        assert_eq!(url, "http://wikipedia.org:80");
    }

    #[test]
    fn test_prefix_already_ending_in_separator() {
        let url = built(FetchDeclaration::new("wikipedia.org").url_prefix("en.").port("80")).unwrap();
        assert_eq!(url, "http://en.wikipedia.org:80");
    }

    #[test]
    fn test_port_goes_before_path() {
        let url = built(
            FetchDeclaration::new("localhost/example2")
                .protocol(Protocol::Https)
                .port("8090"),
        )
        .unwrap();
        assert_eq!(url, "https://localhost:8090/example2");
    }

    #[test]
    fn test_custom_separator() {
        let url = built(
            FetchDeclaration::new("example.org/a")
                .url_prefix("shop")
                .url_prefix_separator("-"),
        )
        .unwrap();
        assert_eq!(url, "http://shop-example.org/a");
    }

    #[test]
    fn test_existing_port_is_kept() {
        let url = built(FetchDeclaration::new("localhost:8089/referrer").port("80")).unwrap();
        assert_eq!(url, "http://localhost:8089/referrer");
    }

    #[test]
    fn test_explicit_scheme_is_kept() {
        let url = built(FetchDeclaration::new("https://example.org/x")).unwrap();
        assert_eq!(url, "https://example.org/x");
    }

    #[test]
    fn test_empty_host_fails() {
        assert!(matches!(
            built(FetchDeclaration::new("")),
            Err(ConfigError::EmptyHost { .. })
        ));
        assert!(matches!(
            built(FetchDeclaration::new("/only/a/path")),
            Err(ConfigError::EmptyHost { .. })
        ));
    }
}
