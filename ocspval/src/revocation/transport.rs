//! Transport used to deliver OCSP requests and to retrieve CA Issuers artifacts

use crate::util::error::TransportError;

#[cfg(feature = "remote")]
use core::time::Duration;

#[cfg(feature = "remote")]
use log::{debug, error};

#[cfg(feature = "remote")]
use reqwest::header::CONTENT_TYPE;

#[cfg(feature = "remote")]
use crate::util::error::{Error, Result};

/// Default number of seconds [`HttpTransport`] waits for a server before giving up
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// `OcspTransport` moves bytes between the client and OCSP responders or CA Issuers repositories.
///
/// Implementations must not retry and must surface failures as [`TransportError`] values, which
/// the client returns to the caller unchanged.
#[allow(async_fn_in_trait)]
pub trait OcspTransport {
    /// POSTs a DER encoded OCSPRequest to `uri` and returns the response body.
    async fn post_request(
        &self,
        uri: &str,
        body: &[u8],
    ) -> core::result::Result<Vec<u8>, TransportError>;

    /// GETs the resource at `uri` and returns the response body.
    async fn fetch(&self, uri: &str) -> core::result::Result<Vec<u8>, TransportError>;
}

impl<T: OcspTransport> OcspTransport for &T {
    async fn post_request(
        &self,
        uri: &str,
        body: &[u8],
    ) -> core::result::Result<Vec<u8>, TransportError> {
        (**self).post_request(uri, body).await
    }

    async fn fetch(&self, uri: &str) -> core::result::Result<Vec<u8>, TransportError> {
        (**self).fetch(uri).await
    }
}

/// `is_http_uri` returns true if `uri` uses the http or https scheme.
pub fn is_http_uri(uri: &str) -> bool {
    let lower = uri.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// `HttpTransport` is an [`OcspTransport`] backed by a [`reqwest::Client`].
#[cfg(feature = "remote")]
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

#[cfg(feature = "remote")]
impl HttpTransport {
    /// Creates a transport that uses a timeout of [`DEFAULT_TIMEOUT_SECS`] seconds.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a transport that uses the given timeout for each exchange.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        match reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .timeout(timeout)
            .build()
        {
            Ok(client) => Ok(HttpTransport { client }),
            Err(e) => {
                error!("Failed to prepare HTTP client: {}", e);
                Err(Error::Transport(TransportError::Network(e.to_string())))
            }
        }
    }

    async fn read_body(
        response: reqwest::Response,
        uri: &str,
    ) -> core::result::Result<Vec<u8>, TransportError> {
        let status = response.status();
        if !status.is_success() {
            debug!("Received HTTP status {} from {}", status.as_u16(), uri);
            return Err(TransportError::HttpStatus(status.as_u16()));
        }
        match response.bytes().await {
            Ok(bb) => Ok(bb.to_vec()),
            Err(e) => {
                error!("Failed to read response from {} with {}", uri, e);
                Err(TransportError::Network(e.to_string()))
            }
        }
    }
}

#[cfg(feature = "remote")]
impl OcspTransport for HttpTransport {
    async fn post_request(
        &self,
        uri: &str,
        body: &[u8],
    ) -> core::result::Result<Vec<u8>, TransportError> {
        if !is_http_uri(uri) {
            debug!("Ignored non-HTTP URI presented to OCSP client: {}", uri);
            return Err(TransportError::InvalidUriScheme(uri.to_string()));
        }

        let response = match self
            .client
            .post(uri)
            .body(body.to_vec())
            .header(CONTENT_TYPE, "application/ocsp-request")
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                debug!("OCSP request send failed with {}: {}", e, uri);
                return Err(TransportError::Network(e.to_string()));
            }
        };
        Self::read_body(response, uri).await
    }

    async fn fetch(&self, uri: &str) -> core::result::Result<Vec<u8>, TransportError> {
        if !is_http_uri(uri) {
            debug!("Ignored non-HTTP URI: {}", uri);
            return Err(TransportError::InvalidUriScheme(uri.to_string()));
        }

        let response = match self.client.get(uri).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!("Failed to retrieve {} with {}", uri, e);
                return Err(TransportError::Network(e.to_string()));
            }
        };
        Self::read_body(response, uri).await
    }
}

#[test]
fn is_http_uri_test() {
    assert!(is_http_uri("http://ocsp.example.com"));
    assert!(is_http_uri("HTTPS://ocsp.example.com/path"));
    assert!(!is_http_uri("ldap://ldap.example.com/cn=CA"));
    assert!(!is_http_uri("httpx"));
    assert!(!is_http_uri(""));
}

#[cfg(all(test, feature = "remote"))]
#[tokio::test]
async fn bad_uri_scheme() {
    let transport = HttpTransport::new().unwrap();
    let r = transport
        .post_request("ldap://ssp-ocsp.example.com", &[0x30, 0x00])
        .await;
    assert_eq!(
        Err(TransportError::InvalidUriScheme(
            "ldap://ssp-ocsp.example.com".to_string()
        )),
        r
    );

    let r = transport.fetch("ftp://ca.example.com/ca.p7c").await;
    assert_eq!(
        Err(TransportError::InvalidUriScheme(
            "ftp://ca.example.com/ca.p7c".to_string()
        )),
        r
    );
}
