//! Preparation of DER encoded OCSPRequest messages

use const_oid::db::rfc6960::ID_PKIX_OCSP_NONCE;
use der::{asn1::OctetString, Encode};
use log::debug;
use rand::{rngs::OsRng, RngCore};
use x509_cert::{
    ext::{Extension, Extensions},
    Certificate,
};
use x509_ocsp::{OcspRequest, Request, TbsRequest, Version::V1};

use crate::revocation::cert_id::{CertificateId, CertificateIssuer, HashAlgorithm};
use crate::util::error::{Error, Result};
use crate::util::name_to_string;

/// Length in bytes of the nonces generated for requests
pub const NONCE_LENGTH: usize = 32;

/// `OcspQuery` is an OCSPRequest prepared for one or more certificates issued by the same CA.
///
/// The query retains the [`CertificateId`] values it asks about, the nonce it carries (if any) and
/// the issuer certificate it was prepared against so that a response can be verified relative to
/// it. A query is immutable once built.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OcspQuery {
    cert_ids: Vec<CertificateId>,
    nonce: Option<Vec<u8>>,
    issuer: Certificate,
    encoded: Vec<u8>,
}

impl OcspQuery {
    /// Prepares a request for `targets` using SHA-1 CertIDs. See [`OcspQuery::build_with`].
    pub fn build(
        targets: &[Certificate],
        issuer: Option<&Certificate>,
        nonce_enabled: bool,
    ) -> Result<Self> {
        Self::build_with(targets, issuer, nonce_enabled, HashAlgorithm::Sha1)
    }

    /// Prepares a request containing one CertID per certificate in `targets`, each relative to
    /// `issuer`. When `nonce_enabled` is true, a fresh random nonce is included as a non-critical
    /// request extension.
    ///
    /// [`Error::NotFound`] is returned when `targets` is empty and [`Error::IssuerUnavailable`] is
    /// returned when no issuer is provided.
    pub fn build_with(
        targets: &[Certificate],
        issuer: Option<&Certificate>,
        nonce_enabled: bool,
        hash_algorithm: HashAlgorithm,
    ) -> Result<Self> {
        if targets.is_empty() {
            return Err(Error::NotFound);
        }
        let issuer = match issuer {
            Some(issuer) => issuer,
            None => {
                debug!(
                    "No issuer available for certificate issued by {}",
                    name_to_string(&targets[0].tbs_certificate.issuer)
                );
                return Err(Error::IssuerUnavailable);
            }
        };

        let fingerprint = CertificateIssuer::generate_with(issuer, hash_algorithm)?;
        let cert_ids: Vec<CertificateId> = targets
            .iter()
            .map(|target| CertificateId::new(&fingerprint, target))
            .collect();

        let mut request_list = vec![];
        for cert_id in &cert_ids {
            request_list.push(Request {
                req_cert: cert_id.to_cert_id()?,
                single_request_extensions: None,
            });
        }

        let (nonce, request_extensions) = if nonce_enabled {
            let nonce = generate_nonce();
            let ext = nonce_extension(&nonce)?;
            (Some(nonce), Some(vec![ext]))
        } else {
            (None, None)
        };

        let tbs_request = TbsRequest {
            version: V1,
            requestor_name: None,
            request_list,
            request_extensions,
        };
        let ocsp_req = OcspRequest {
            tbs_request,
            optional_signature: None,
        };
        let encoded = ocsp_req.to_der()?;

        Ok(OcspQuery {
            cert_ids,
            nonce,
            issuer: issuer.clone(),
            encoded,
        })
    }

    /// Identifiers of the certificates the query asks about, in request order
    pub fn cert_ids(&self) -> &[CertificateId] {
        &self.cert_ids
    }

    /// Nonce included in the request, if any
    pub fn nonce(&self) -> Option<&[u8]> {
        self.nonce.as_deref()
    }

    /// Issuer certificate the query was prepared against
    pub fn issuer(&self) -> &Certificate {
        &self.issuer
    }

    /// DER encoded OCSPRequest
    pub fn to_der(&self) -> &[u8] {
        &self.encoded
    }
}

/// `generate_nonce` returns [`NONCE_LENGTH`] bytes read from the operating system's random number
/// generator.
pub fn generate_nonce() -> Vec<u8> {
    let mut nonce = vec![0u8; NONCE_LENGTH];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// `nonce_extension` prepares a non-critical id-pkix-ocsp-nonce extension. The extnValue contains
/// the DER encoding of an OCTET STRING containing the nonce.
pub fn nonce_extension(nonce: &[u8]) -> Result<Extension> {
    let inner = OctetString::new(nonce)?.to_der()?;
    Ok(Extension {
        extn_id: ID_PKIX_OCSP_NONCE,
        critical: false,
        extn_value: OctetString::new(inner)?,
    })
}

/// `get_nonce` returns the extnValue of the first id-pkix-ocsp-nonce extension in `exts`, if any.
pub(crate) fn get_nonce(exts: &Option<Extensions>) -> Option<&[u8]> {
    if let Some(exts) = exts {
        for ext in exts {
            if ext.extn_id == ID_PKIX_OCSP_NONCE {
                return Some(ext.extn_value.as_bytes());
            }
        }
    }
    None
}

#[test]
fn empty_targets() {
    assert_eq!(Err(Error::NotFound), OcspQuery::build(&[], None, true));
}

#[test]
fn nonce_extension_test() {
    use der::Decode;

    let nonce = generate_nonce();
    assert_eq!(NONCE_LENGTH, nonce.len());
    // 2^-256 chance of a spurious failure
    assert_ne!(nonce, generate_nonce());

    let ext = nonce_extension(&nonce).unwrap();
    assert!(!ext.critical);
    let inner = OctetString::from_der(ext.extn_value.as_bytes()).unwrap();
    assert_eq!(nonce.as_slice(), inner.as_bytes());

    let exts = Some(vec![ext]);
    assert_eq!(
        Some(exts.as_ref().unwrap()[0].extn_value.as_bytes()),
        get_nonce(&exts)
    );
    assert_eq!(None, get_nonce(&None));
}
