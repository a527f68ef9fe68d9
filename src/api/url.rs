use anyhow::{anyhow, Result};
use url::Url;

/// Normalized server location for the platform API
#[derive(Debug, Clone, PartialEq)]
pub struct ServerUrl {
    /// API root, always ending with `/`
    pub api: Url,
}

impl ServerUrl {
    /// Parse a server URL as entered by the user
    ///
    /// Supports formats:
    /// - `https://myserver.example.com`
    /// - `https://myserver.example.com/`
    /// - `myserver.example.com` (https is assumed)
    /// - `http://localhost:8080` (plain http kept as given)
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim().trim_end_matches('/');
        if input.is_empty() {
            return Err(anyhow!("Server URL is empty"));
        }

        let with_scheme = if input.starts_with("http://") || input.starts_with("https://") {
            input.to_string()
        } else {
            format!("https://{}", input)
        };

        let mut api = Url::parse(&with_scheme)?;
        if api.host_str().is_none() {
            return Err(anyhow!("Invalid server URL: no host"));
        }
        api.set_query(None);
        api.set_fragment(None);
        if !api.path().ends_with('/') {
            let path = format!("{}/", api.path());
            api.set_path(&path);
        }

        Ok(Self { api })
    }

    /// Join an endpoint path (e.g. `niuser/v1/workspaces`) onto the API root
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.api.join(path.trim_start_matches('/'))?)
    }

    /// Best guess at the web UI location for this API server
    ///
    /// Hosted tenants serve the API from `<name>-api.<domain>` and the web UI
    /// from `<name>.<domain>`; on-prem servers use one host for both.
    pub fn web_url(&self) -> String {
        let mut web = self.api.clone();
        if let Some(host) = self.api.host_str() {
            if let Some((first, rest)) = host.split_once('.') {
                if let Some(stripped) = first.strip_suffix("-api") {
                    let _ = web.set_host(Some(&format!("{}.{}", stripped, rest)));
                }
            }
        }
        web.as_str().trim_end_matches('/').to_string()
    }
}

/// Percent-encode a value for use as a single path segment
pub fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_adds_scheme_and_slash() {
        let url = ServerUrl::parse("demo-api.lifecyclesolutions.ni.com").unwrap();
        assert_eq!(url.api.as_str(), "https://demo-api.lifecyclesolutions.ni.com/");
    }

    #[test]
    fn test_parse_keeps_http_and_port() {
        let url = ServerUrl::parse("http://localhost:8080/").unwrap();
        assert_eq!(url.api.as_str(), "http://localhost:8080/");
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(ServerUrl::parse("   ").is_err());
    }

    #[test]
    fn test_endpoint_join() {
        let url = ServerUrl::parse("https://example.com/base").unwrap();
        let endpoint = url.endpoint("/niuser/v1/workspaces").unwrap();
        assert_eq!(endpoint.as_str(), "https://example.com/base/niuser/v1/workspaces");
    }

    #[test]
    fn test_web_url_strips_api_suffix() {
        let url = ServerUrl::parse("https://acme-api.lifecyclesolutions.ni.com").unwrap();
        assert_eq!(url.web_url(), "https://acme.lifecyclesolutions.ni.com");

        let onprem = ServerUrl::parse("https://systemlink.corp.local").unwrap();
        assert_eq!(onprem.web_url(), "https://systemlink.corp.local");
    }

    #[test]
    fn test_segment_encoding() {
        assert_eq!(segment("Line 1/Temp"), "Line%201%2FTemp");
        assert_eq!(segment("abc-123"), "abc-123");
    }
}
