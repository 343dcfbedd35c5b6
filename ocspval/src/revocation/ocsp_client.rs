//! Structures and functions to perform OCSP client functionality

use log::{debug, info};
use x509_cert::Certificate;

use crate::revocation::locator::{detect_responder_uri, find_intermediate};
use crate::revocation::request::OcspQuery;
use crate::revocation::response::{verify_response, VerifiedResponse};
use crate::revocation::status::{resolve, CertificateResult};
use crate::revocation::transport::OcspTransport;
use crate::settings::OcspSettings;
use crate::util::cert_utils::name_to_string;
use crate::util::error::{Error, Result};

#[cfg(feature = "remote")]
use crate::revocation::transport::HttpTransport;

/// `OcspClient` determines the revocation status of certificates by consulting OCSP responders.
///
/// A client holds immutable [`OcspSettings`], an optional list of intermediate CA certificates used
/// to find issuers and the [`OcspTransport`] used to reach responders. Each verification builds its
/// own request (with a fresh nonce, if enabled) and performs at most one OCSP round trip. Nothing is
/// cached between calls.
#[derive(Clone, Debug)]
pub struct OcspClient<T: OcspTransport> {
    settings: OcspSettings,
    intermediates: Vec<Certificate>,
    transport: T,
}

#[cfg(feature = "remote")]
impl OcspClient<HttpTransport> {
    /// Creates a client that uses an [`HttpTransport`] with default timeout.
    pub fn new(settings: OcspSettings) -> Result<Self> {
        Ok(Self::with_transport(settings, HttpTransport::new()?))
    }
}

impl<T: OcspTransport> OcspClient<T> {
    /// Creates a client that uses the given transport.
    pub fn with_transport(settings: OcspSettings, transport: T) -> Self {
        OcspClient {
            settings,
            intermediates: vec![],
            transport,
        }
    }

    /// Registers intermediate CA certificates that are consulted before CA Issuers locations when
    /// the issuer of a certificate is not provided.
    pub fn with_intermediates(mut self, intermediates: Vec<Certificate>) -> Self {
        self.intermediates = intermediates;
        self
    }

    /// Settings used by the client
    pub fn settings(&self) -> &OcspSettings {
        &self.settings
    }

    /// Transport used by the client
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn responder_uri(&self, cert: &Certificate) -> Option<String> {
        match &self.settings.override_responder_uri {
            Some(uri) => Some(uri.clone()),
            None => detect_responder_uri(cert),
        }
    }

    async fn issuer_for(
        &self,
        cert: &Certificate,
        issuer: Option<&Certificate>,
    ) -> Option<Certificate> {
        match issuer {
            Some(issuer) => Some(issuer.clone()),
            None => find_intermediate(cert, &self.intermediates, &self.transport).await,
        }
    }

    async fn exchange(&self, uri: &str, query: &OcspQuery) -> Result<VerifiedResponse> {
        info!("Sending OCSP request to {}", uri);
        let enc_ocsp_resp = self
            .transport
            .post_request(uri, query.to_der())
            .await
            .map_err(|e| {
                info!("Failed sending OCSP request to {} with {}", uri, e);
                Error::Transport(e)
            })?;
        verify_response(&enc_ocsp_resp, query)
    }

    /// Determines the status of `cert`, discovering its issuer as necessary. See
    /// [`OcspClient::verify_with_issuer`].
    pub async fn verify(&self, cert: &Certificate) -> Result<CertificateResult> {
        self.verify_with_issuer(cert, None).await
    }

    /// Determines the status of `cert` relative to `issuer`.
    ///
    /// If no responder URI is configured and none is found in the AIA extension of `cert`, an
    /// unknown result is returned without sending a request. The unknown result is returned even
    /// when `raise_on_unknown` is set. When `issuer` is `None`, registered intermediates and CA
    /// Issuers locations are searched and [`Error::IssuerUnavailable`] is returned if no issuer is
    /// found.
    ///
    /// Transport failures are returned as [`Error::Transport`], response verification failures as
    /// [`Error::Protocol`] and revoked or unknown statuses that policy requires to be raised as
    /// [`Error::Policy`].
    pub async fn verify_with_issuer(
        &self,
        cert: &Certificate,
        issuer: Option<&Certificate>,
    ) -> Result<CertificateResult> {
        let uri = match self.responder_uri(cert) {
            Some(uri) => uri,
            None => {
                info!(
                    "No OCSP responder found for {}",
                    name_to_string(&cert.tbs_certificate.subject)
                );
                return Ok(CertificateResult::unknown());
            }
        };

        let issuer = self.issuer_for(cert, issuer).await;
        let query = OcspQuery::build_with(
            core::slice::from_ref(cert),
            issuer.as_ref(),
            self.settings.nonce_enabled,
            self.settings.hash_algorithm,
        )?;

        let response = self.exchange(&uri, &query).await?;
        let cert_id = &query.cert_ids()[0];
        let result = resolve(&response, cert_id, &self.settings);
        debug!(
            "Determined status {:?} for certificate issued to {} via {}",
            result,
            name_to_string(&cert.tbs_certificate.subject),
            uri
        );
        result
    }

    /// Determines the status of several certificates issued by the same CA using a single request.
    ///
    /// The responder URI is the configured override or the one found in the first certificate. The
    /// verified response is returned without applying policy. [`Error::NotFound`] is returned if
    /// `certs` is empty or no responder URI is available.
    pub async fn verify_all(
        &self,
        certs: &[Certificate],
        issuer: Option<&Certificate>,
    ) -> Result<VerifiedResponse> {
        let first = match certs.first() {
            Some(first) => first,
            None => return Err(Error::NotFound),
        };
        let uri = match self.responder_uri(first) {
            Some(uri) => uri,
            None => {
                info!(
                    "No OCSP responder found for {}",
                    name_to_string(&first.tbs_certificate.subject)
                );
                return Err(Error::NotFound);
            }
        };

        let issuer = self.issuer_for(first, issuer).await;
        let query = OcspQuery::build_with(
            certs,
            issuer.as_ref(),
            self.settings.nonce_enabled,
            self.settings.hash_algorithm,
        )?;
        self.exchange(&uri, &query).await
    }
}
