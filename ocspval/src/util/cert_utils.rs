//! Utility functions for working with certificates presented to or returned by an OCSP responder

use der::{
    asn1::{BitString, GeneralizedTime},
    Decode, DecodePem,
};
use log::debug;
use sha1::{Digest, Sha1};
use spki::AlgorithmIdentifierOwned;
use x509_cert::{name::Name, Certificate};

use crate::util::crypto::verify_signature_message;
use crate::util::error::Result;

/// [`DeferDecodeSigned`] is used to parse only the top-level structure of a signed object, like a
/// Certificate, without parsing the details of the to-be-signed field. This retains the exact
/// encoding that was signed for use in signature verification.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeferDecodeSigned {
    /// tbsCertificate       TBSCertificate,
    pub tbs_field: Vec<u8>,
    /// signatureAlgorithm   AlgorithmIdentifier,
    pub signature_algorithm: AlgorithmIdentifierOwned,
    /// signature            BIT STRING
    pub signature: BitString,
}

impl ::der::FixedTag for DeferDecodeSigned {
    const TAG: ::der::Tag = ::der::Tag::Sequence;
}

impl<'a> ::der::DecodeValue<'a> for DeferDecodeSigned {
    fn decode_value<R: ::der::Reader<'a>>(
        reader: &mut R,
        header: ::der::Header,
    ) -> ::der::Result<Self> {
        use ::der::Reader as _;
        reader.read_nested(header.length, |reader| {
            let tbs_field = reader.tlv_bytes()?;
            let signature_algorithm = reader.decode()?;
            let signature = reader.decode()?;
            Ok(Self {
                tbs_field: tbs_field.to_vec(),
                signature_algorithm,
                signature,
            })
        })
    }
}

/// `name_to_string` returns a string representation of given Name value.
pub fn name_to_string(name: &Name) -> String {
    name.to_string()
}

/// `get_key_hash` returns the SHA-1 hash of the subject public key BIT STRING contents (excluding
/// tag, length and number of unused bits). This is the value used by the byKey form of ResponderID.
pub fn get_key_hash(cert: &Certificate) -> Vec<u8> {
    Sha1::digest(
        cert.tbs_certificate
            .subject_public_key_info
            .subject_public_key
            .raw_bytes(),
    )
    .to_vec()
}

/// `is_issued_by` returns true if the subject of `issuer` matches the issuer field of `cert` and the
/// public key of `issuer` verifies the signature on `enc_cert`, which must be the encoding of `cert`.
pub fn is_issued_by(cert: &Certificate, enc_cert: &[u8], issuer: &Certificate) -> bool {
    if cert.tbs_certificate.issuer != issuer.tbs_certificate.subject {
        return false;
    }

    let defer_cert = match DeferDecodeSigned::from_der(enc_cert) {
        Ok(defer_cert) => defer_cert,
        Err(e) => {
            debug!("Failed to defer decode certificate in is_issued_by with: {}", e);
            return false;
        }
    };

    let signature = match defer_cert.signature.as_bytes() {
        Some(s) => s,
        None => return false,
    };

    verify_signature_message(
        &defer_cert.tbs_field,
        signature,
        &defer_cert.signature_algorithm,
        &issuer.tbs_certificate.subject_public_key_info,
    )
    .is_ok()
}

/// `parse_cert_buffer` parses a buffer containing either a binary DER encoded certificate or a PEM
/// encoded certificate.
pub fn parse_cert_buffer(buffer: &[u8]) -> Result<Certificate> {
    match Certificate::from_der(buffer) {
        Ok(cert) => Ok(cert),
        Err(e) => {
            if buffer.starts_with(b"-----BEGIN") {
                Ok(Certificate::from_pem(buffer)?)
            } else {
                Err(e.into())
            }
        }
    }
}

/// `to_unix_secs` converts a GeneralizedTime value to seconds since Unix epoch (i.e., 1970-01-01T00:00:00Z).
pub fn to_unix_secs(t: &GeneralizedTime) -> u64 {
    t.to_unix_duration().as_secs()
}

#[test]
fn parse_cert_buffer_rejects_garbage() {
    use crate::Error;
    assert!(matches!(
        parse_cert_buffer(b"not a certificate"),
        Err(Error::Encoding(_))
    ));
    assert!(matches!(
        parse_cert_buffer(b"-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n"),
        Err(Error::Encoding(_))
    ));
}

#[test]
fn to_unix_secs_test() {
    use core::time::Duration;
    let gt = GeneralizedTime::from_unix_duration(Duration::from_secs(1_700_000_000)).unwrap();
    assert_eq!(1_700_000_000, to_unix_secs(&gt));
}
