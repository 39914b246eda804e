//! URL construction for proxy targets
//!
//! Targets are always `scheme://host:port/path?size=N`; the proxy URI is
//! always plain `http://host:port` because the client-to-proxy link is never
//! encrypted, even when the destination is.

use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum UrlError {
    #[error("Invalid URL format: {0}")]
    ParseError(#[from] url::ParseError),
    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),
}

/// Format `host:port`, bracketing bare IPv6 literals
///
/// # Examples
/// - `("localhost", 8000)` → `localhost:8000`
/// - `("::1", 8080)` → `[::1]:8080`
pub fn format_authority(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Build a target URL: `scheme://host:port/path?size=N`
///
/// # Examples
/// - `("http", "localhost", 8000, "/file/big", 1024)` → `http://localhost:8000/file/big?size=1024`
/// - `("https", "localhost", 8443, "/file/big", 1024)` → `https://localhost:8443/file/big?size=1024`
pub fn build_target_url(
    scheme: &str,
    host: &str,
    port: u16,
    path: &str,
    size: usize,
) -> Result<String, UrlError> {
    if scheme != "http" && scheme != "https" {
        return Err(UrlError::UnsupportedScheme(scheme.to_string()));
    }

    let mut url = Url::parse(&format!("{}://{}", scheme, format_authority(host, port)))?;

    url.set_path(path);
    url.query_pairs_mut()
        .append_pair("size", &size.to_string());

    Ok(url.to_string())
}

/// Whether the URL will be carried through a CONNECT tunnel by an HTTP proxy
pub fn requires_tunnel(url_str: &str) -> bool {
    Url::parse(url_str)
        .map(|url| url.scheme() == "https")
        .unwrap_or(false)
}
