//! Authentication and parsing of OCSP responses
//!
//! [`verify_response`] accepts a DER encoded OCSPResponse along with the [`OcspQuery`] that
//! solicited it and returns a [`VerifiedResponse`] only if the response is well formed, successful,
//! signed by an authorized responder, echoes the query's nonce and covers at least one certificate
//! that was asked about.
//!
//! The only extension type listed in section 4 of RFC 6960 that is supported is nonce. Non-critical
//! extensions may be present in a response without error. Presence of any critical extension other
//! than nonce results in failure.
//!
//! Responses may be signed by the CA that issued the certificates in the query or by a delegated
//! responder whose certificate is included in the response, is issued by that same CA and asserts
//! id-kp-OCSPSigning in an extended key usage extension. Locally trusted responders are not
//! supported.

use const_oid::db::{
    rfc5912::{ID_CE_EXT_KEY_USAGE, ID_KP_OCSP_SIGNING},
    rfc6960::{ID_PKIX_OCSP_BASIC, ID_PKIX_OCSP_NONCE},
};
use der::{asn1::OctetString, Any, Decode, Encode};
use log::{debug, error};
use x509_cert::{
    ext::{pkix::ExtendedKeyUsage, Extensions},
    Certificate,
};
use x509_ocsp::{
    BasicOcspResponse, CertStatus, OcspResponse, OcspResponseStatus, ResponderId, SingleResponse,
};

use crate::revocation::cert_id::CertificateId;
use crate::revocation::request::{get_nonce, OcspQuery};
use crate::revocation::status::{CertificateResult, CertificateStatus, RevocationInfo};
use crate::util::cert_utils::{get_key_hash, is_issued_by, name_to_string, to_unix_secs};
use crate::util::crypto::verify_signature_message;
use crate::util::error::{Error, OcspProtocolError, Result};

#[derive(Clone, Debug, Eq, PartialEq)]
struct DeferDecodeBasicOcspResponse {
    ///   tbsResponseData          ResponseData,
    pub tbs_response_data: Vec<u8>,

    ///   signatureAlgorithm       AlgorithmIdentifier,
    pub signature_algorithm: Vec<u8>,

    ///   signature                BIT STRING,
    pub signature: Vec<u8>,

    ///    certs               \[0\] EXPLICIT SEQUENCE OF Certificate OPTIONAL }
    pub certs: Option<Vec<Any>>,
}

impl ::der::FixedTag for DeferDecodeBasicOcspResponse {
    const TAG: ::der::Tag = ::der::Tag::Sequence;
}

impl<'a> ::der::DecodeValue<'a> for DeferDecodeBasicOcspResponse {
    fn decode_value<R: ::der::Reader<'a>>(
        reader: &mut R,
        header: ::der::Header,
    ) -> ::der::Result<Self> {
        use ::der::Reader as _;
        reader.read_nested(header.length, |reader| {
            let tbs_response_data = reader.tlv_bytes()?;
            let signature_algorithm = reader.tlv_bytes()?;
            let signature = reader.tlv_bytes()?;
            let certs =
                ::der::asn1::ContextSpecific::decode_explicit(reader, ::der::TagNumber::N0)?
                    .map(|cs| cs.value);
            Ok(Self {
                tbs_response_data: tbs_response_data.to_vec(),
                signature_algorithm: signature_algorithm.to_vec(),
                signature: signature.to_vec(),
                certs,
            })
        })
    }
}

/// `VerifiedResponse` holds the results from an authenticated OCSP response for the certificates
/// that were asked about.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VerifiedResponse {
    produced_at: u64,
    signer: Certificate,
    results: Vec<(CertificateId, CertificateResult)>,
}

impl VerifiedResponse {
    /// producedAt expressed as seconds since Unix epoch
    pub fn produced_at(&self) -> u64 {
        self.produced_at
    }

    /// Certificate whose key verified the response signature, i.e., the issuing CA or a delegated
    /// responder
    pub fn signer(&self) -> &Certificate {
        &self.signer
    }

    /// Results for each queried certificate that the response covered, in response order
    pub fn results(&self) -> &[(CertificateId, CertificateResult)] {
        &self.results
    }

    /// Returns the result for the given certificate, if the response covered it
    pub fn get(&self, cert_id: &CertificateId) -> Option<&CertificateResult> {
        self.results
            .iter()
            .find(|(id, _)| id == cert_id)
            .map(|(_, result)| result)
    }
}

/// unsupported_critical_extensions_present_single_response returns true if any critical extension
/// is present with a SingleResponse
fn unsupported_critical_extensions_present_single_response(sr: &SingleResponse) -> bool {
    match &sr.single_extensions {
        Some(exts) => exts.iter().any(|e| e.critical),
        None => false,
    }
}

/// unsupported_critical_extensions_present_response returns true if any critical extension other
/// than nonce is present in ResponseData
fn unsupported_critical_extensions_present_response(exts: &Option<Extensions>) -> bool {
    match exts {
        Some(exts) => exts
            .iter()
            .any(|e| e.critical && e.extn_id != ID_PKIX_OCSP_NONCE),
        None => false,
    }
}

/// `ocsp_signing_eku_present` returns true if `cert` contains an extended key usage extension that
/// includes id-kp-OCSPSigning.
pub fn ocsp_signing_eku_present(cert: &Certificate) -> bool {
    if let Some(exts) = &cert.tbs_certificate.extensions {
        for ext in exts {
            if ext.extn_id == ID_CE_EXT_KEY_USAGE {
                return match ExtendedKeyUsage::from_der(ext.extn_value.as_bytes()) {
                    Ok(eku) => eku.0.contains(&ID_KP_OCSP_SIGNING),
                    Err(e) => {
                        error!(
                            "Failed to parse EKU extension in certificate issued to {} with: {}",
                            name_to_string(&cert.tbs_certificate.subject),
                            e
                        );
                        false
                    }
                };
            }
        }
    }
    false
}

fn responder_id_match(responder_id: &ResponderId, cert: &Certificate) -> bool {
    match responder_id {
        ResponderId::ByName(name) => *name == cert.tbs_certificate.subject,
        ResponderId::ByKey(key_hash) => key_hash.as_bytes() == get_key_hash(cert).as_slice(),
    }
}

/// `find_signer` returns the certificate identified by `responder_id` from among the issuer and any
/// delegated responder certificates in `certs` that were issued by the issuer.
fn find_signer(
    responder_id: &ResponderId,
    certs: &Option<Vec<Any>>,
    issuer: &Certificate,
) -> Result<Certificate> {
    if responder_id_match(responder_id, issuer) {
        debug!(
            "OCSP response signed by issuing CA {}",
            name_to_string(&issuer.tbs_certificate.subject)
        );
        return Ok(issuer.clone());
    }

    // TODO support responder certs signed by key rollover certs
    if let Some(certs) = certs {
        for a in certs {
            let certbuf = match a.to_der() {
                Ok(certbuf) => certbuf,
                Err(_e) => continue,
            };
            let cert = match Certificate::from_der(certbuf.as_slice()) {
                Ok(cert) => cert,
                Err(e) => {
                    debug!("Ignored unparseable certificate in OCSP response: {}", e);
                    continue;
                }
            };
            if !responder_id_match(responder_id, &cert) {
                continue;
            }
            if !is_issued_by(&cert, certbuf.as_slice(), issuer) {
                error!(
                    "Candidate responder certificate issued to {} was not issued by {}",
                    name_to_string(&cert.tbs_certificate.subject),
                    name_to_string(&issuer.tbs_certificate.subject)
                );
                continue;
            }
            if !ocsp_signing_eku_present(&cert) {
                error!(
                    "Candidate responder certificate issued to {} does not assert id-kp-OCSPSigning",
                    name_to_string(&cert.tbs_certificate.subject)
                );
                continue;
            }
            debug!(
                "OCSP response signed by delegated responder {}",
                name_to_string(&cert.tbs_certificate.subject)
            );
            return Ok(cert);
        }
    }

    error!(
        "Failed to find authorized OCSP responder for CA {}",
        name_to_string(&issuer.tbs_certificate.subject)
    );
    Err(Error::Protocol(OcspProtocolError::UnauthorizedResponder))
}

fn nonce_match(expected: &[u8], extn_value: &[u8]) -> bool {
    if let Ok(os) = OctetString::from_der(extn_value) {
        if os.as_bytes() == expected {
            return true;
        }
    }
    extn_value == expected
}

fn to_certificate_result(sr: &SingleResponse) -> CertificateResult {
    let status = match &sr.cert_status {
        CertStatus::Good(_null) => CertificateStatus::Good,
        CertStatus::Revoked(revinfo) => CertificateStatus::Revoked(RevocationInfo {
            revoked_at: to_unix_secs(&revinfo.revocation_time.0),
            reason: revinfo.revocation_reason,
        }),
        CertStatus::Unknown(_null) => CertificateStatus::Unknown,
    };
    CertificateResult {
        status,
        this_update: Some(to_unix_secs(&sr.this_update.0)),
        next_update: sr.next_update.as_ref().map(|nu| to_unix_secs(&nu.0)),
    }
}

fn protocol_error(err: OcspProtocolError) -> Error {
    Error::Protocol(err)
}

/// `verify_response` decodes and authenticates the DER encoded OCSPResponse in `enc_ocsp_resp`
/// relative to the `query` that solicited it.
///
/// Checks are performed in the following order, with the first failure returned as
/// [`Error::Protocol`]:
/// - the response parses ([`OcspProtocolError::Malformed`])
/// - the response status is successful ([`OcspProtocolError::Unsuccessful`])
/// - responseBytes are present and are of the basic type ([`OcspProtocolError::MissingResponseBytes`],
///   [`OcspProtocolError::UnsupportedResponseType`])
/// - no critical response extension other than nonce is present
///   ([`OcspProtocolError::UnsupportedCriticalExtension`])
/// - the responder is the issuer or a delegated responder ([`OcspProtocolError::UnauthorizedResponder`])
/// - the signature verifies ([`OcspProtocolError::SignatureInvalid`],
///   [`OcspProtocolError::UnsupportedSignatureAlgorithm`])
/// - the nonce from the query is echoed ([`OcspProtocolError::NonceMismatch`])
/// - at least one SingleResponse matches a queried certificate, no matching SingleResponse
///   features a critical extension and entries repeated for a certificate agree on its status
///   ([`OcspProtocolError::NoMatchingResponse`],
///   [`OcspProtocolError::UnsupportedCriticalExtension`], [`OcspProtocolError::Malformed`])
///
/// The validity window of the SingleResponse entries is not evaluated. See [`check_response_time`].
pub fn verify_response(enc_ocsp_resp: &[u8], query: &OcspQuery) -> Result<VerifiedResponse> {
    let or = match OcspResponse::from_der(enc_ocsp_resp) {
        Ok(or) => or,
        Err(e) => {
            error!("Failed to parse OcspResponse with: {}", e);
            return Err(protocol_error(OcspProtocolError::Malformed));
        }
    };

    if or.response_status != OcspResponseStatus::Successful {
        error!(
            "OcspResponse indicates failure ({:?})",
            or.response_status
        );
        return Err(protocol_error(OcspProtocolError::Unsuccessful(
            or.response_status.into(),
        )));
    }

    let rb = match &or.response_bytes {
        Some(rb) => rb,
        None => {
            error!("OcspResponse contained no response bytes");
            return Err(protocol_error(OcspProtocolError::MissingResponseBytes));
        }
    };

    if rb.response_type != ID_PKIX_OCSP_BASIC {
        error!(
            "OcspResponse contained response bytes other than basic type ({})",
            rb.response_type
        );
        return Err(protocol_error(OcspProtocolError::UnsupportedResponseType));
    }

    let (bor, ddbor) = match (
        BasicOcspResponse::from_der(rb.response.as_bytes()),
        DeferDecodeBasicOcspResponse::from_der(rb.response.as_bytes()),
    ) {
        (Ok(bor), Ok(ddbor)) => (bor, ddbor),
        (Err(e), _) | (_, Err(e)) => {
            error!(
                "OcspResponse contained BasicOcspResponse that could not be parsed with: {}",
                e
            );
            return Err(protocol_error(OcspProtocolError::Malformed));
        }
    };
    let rd = &bor.tbs_response_data;

    if unsupported_critical_extensions_present_response(&rd.response_extensions) {
        error!("OcspResponse contained at least one unsupported critical extension");
        return Err(protocol_error(
            OcspProtocolError::UnsupportedCriticalExtension,
        ));
    }

    let signer = find_signer(&rd.responder_id, &ddbor.certs, query.issuer())?;

    let signature = match bor.signature.as_bytes() {
        Some(s) => s,
        None => {
            error!("OcspResponse signature contains unused bits");
            return Err(protocol_error(OcspProtocolError::SignatureInvalid));
        }
    };
    if let Err(e) = verify_signature_message(
        &ddbor.tbs_response_data,
        signature,
        &bor.signature_algorithm,
        &signer.tbs_certificate.subject_public_key_info,
    ) {
        error!(
            "Signature on OcspResponse was not verified using key from {}: {}",
            name_to_string(&signer.tbs_certificate.subject),
            e
        );
        return Err(e);
    }

    if let Some(expected) = query.nonce() {
        match get_nonce(&rd.response_extensions) {
            Some(extn_value) if nonce_match(expected, extn_value) => {}
            Some(_) => {
                error!("OcspResponse featured a nonce that does not match the request");
                return Err(protocol_error(OcspProtocolError::NonceMismatch));
            }
            None => {
                error!("OcspResponse did not echo the nonce from the request");
                return Err(protocol_error(OcspProtocolError::NonceMismatch));
            }
        }
    }

    let mut results: Vec<(CertificateId, CertificateResult)> = vec![];
    for sr in &rd.responses {
        let cert_id = match query.cert_ids().iter().find(|id| id.matches(&sr.cert_id)) {
            Some(cert_id) => cert_id,
            None => continue,
        };
        if unsupported_critical_extensions_present_single_response(sr) {
            error!("OcspResponse featured unrecognized critical extensions in single response");
            return Err(protocol_error(
                OcspProtocolError::UnsupportedCriticalExtension,
            ));
        }
        let result = to_certificate_result(sr);
        if let Some((_, prior)) = results.iter().find(|(id, _)| id == cert_id) {
            if prior.status != result.status {
                error!("OcspResponse featured conflicting SingleResponses for the same certificate");
                return Err(protocol_error(OcspProtocolError::Malformed));
            }
            debug!("Ignored duplicate SingleResponse in OcspResponse");
            continue;
        }
        results.push((cert_id.clone(), result));
    }

    if results.is_empty() {
        error!("OcspResponse did not contain a SingleResponse for any certificate in the request");
        return Err(protocol_error(OcspProtocolError::NoMatchingResponse));
    }

    Ok(VerifiedResponse {
        produced_at: to_unix_secs(&rd.produced_at.0),
        signer,
        results,
    })
}

/// `check_response_time` returns false if thisUpdate is after `time_of_interest` or nextUpdate is
/// before `time_of_interest`, and true otherwise. A `time_of_interest` of zero disables the check.
/// Results without a thisUpdate value, i.e., those not obtained from a response, fail the check
/// unless it is disabled.
pub fn check_response_time(result: &CertificateResult, time_of_interest: u64) -> bool {
    if 0 == time_of_interest {
        return true;
    }

    let tu = match result.this_update {
        Some(tu) => tu,
        None => return false,
    };
    if tu > time_of_interest {
        //future response
        return false;
    }

    if let Some(nu) = result.next_update {
        if nu < time_of_interest {
            //stale
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(this_update: Option<u64>, next_update: Option<u64>) -> CertificateResult {
        CertificateResult {
            status: CertificateStatus::Good,
            this_update,
            next_update,
        }
    }

    #[test]
    fn response_time() {
        let r = result(Some(1000), Some(2000));
        assert!(check_response_time(&r, 0));
        assert!(check_response_time(&r, 1000));
        assert!(check_response_time(&r, 1500));
        assert!(check_response_time(&r, 2000));
        assert!(!check_response_time(&r, 999));
        assert!(!check_response_time(&r, 2001));

        let r = result(Some(1000), None);
        assert!(check_response_time(&r, u64::MAX));

        assert!(!check_response_time(&CertificateResult::unknown(), 1000));
        assert!(check_response_time(&CertificateResult::unknown(), 0));
    }

    #[test]
    fn nonce_forms() {
        let nonce = [1u8, 2, 3, 4];
        let wrapped = OctetString::new(&nonce[..]).unwrap().to_der().unwrap();
        assert!(nonce_match(&nonce, &wrapped));
        assert!(nonce_match(&nonce, &nonce));
        assert!(!nonce_match(&nonce, &[1u8, 2, 3]));
        assert!(!nonce_match(&nonce, &[0x04, 0x02, 0x01, 0x02]));
    }

    #[test]
    fn critical_extensions() {
        use const_oid::db::rfc6960::ID_PKIX_OCSP_NOCHECK;
        use x509_cert::ext::Extension;

        let nonce = Extension {
            extn_id: ID_PKIX_OCSP_NONCE,
            critical: true,
            extn_value: OctetString::new(vec![0x04, 0x00]).unwrap(),
        };
        let other = Extension {
            extn_id: ID_PKIX_OCSP_NOCHECK,
            critical: true,
            extn_value: OctetString::new(vec![0x05, 0x00]).unwrap(),
        };
        assert!(!unsupported_critical_extensions_present_response(&None));
        assert!(!unsupported_critical_extensions_present_response(&Some(
            vec![nonce.clone()]
        )));
        assert!(unsupported_critical_extensions_present_response(&Some(
            vec![nonce, other]
        )));
    }
}
