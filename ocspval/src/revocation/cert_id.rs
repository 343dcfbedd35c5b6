//! Issuer fingerprints and CertID preparation
//!
//! A CertID identifies a certificate to an OCSP responder by a hash of the issuer's name, a hash of
//! the issuer's public key and the certificate's serial number ([RFC 6960 Section 4.1.1]).
//!
//! [RFC 6960 Section 4.1.1]: https://datatracker.ietf.org/doc/html/rfc6960#section-4.1.1

use der::{asn1::ObjectIdentifier, asn1::OctetString, Encode};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use spki::AlgorithmIdentifierOwned;
use x509_cert::{serial_number::SerialNumber, Certificate};
use x509_ocsp::CertId;

use crate::util::alg_oids::{PKIXALG_SHA1, PKIXALG_SHA256};
use crate::util::error::Result;

/// Hash algorithms that may be used to prepare a CertID
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-1, required by the lightweight OCSP profile and understood by all responders
    #[default]
    Sha1,
    /// SHA-256
    Sha256,
}

impl HashAlgorithm {
    /// Returns the object identifier for the hash algorithm
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            HashAlgorithm::Sha1 => PKIXALG_SHA1,
            HashAlgorithm::Sha256 => PKIXALG_SHA256,
        }
    }

    /// Returns the hash algorithm corresponding to the given object identifier, if supported
    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        match *oid {
            PKIXALG_SHA1 => Some(HashAlgorithm::Sha1),
            PKIXALG_SHA256 => Some(HashAlgorithm::Sha256),
            _ => None,
        }
    }

    /// Returns an AlgorithmIdentifier for the hash algorithm with absent parameters
    pub fn algorithm_identifier(&self) -> AlgorithmIdentifierOwned {
        // let hash_algorithm = AlgorithmIdentifier {
        //     oid: PKIXALG_SHA1,
        //     parameters: Some(der::asn1::Null.into()),
        // };
        AlgorithmIdentifierOwned {
            oid: self.oid(),
            parameters: None,
        }
    }

    /// Hashes the presented buffer
    pub fn digest(&self, buffer_to_hash: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha1 => Sha1::digest(buffer_to_hash).to_vec(),
            HashAlgorithm::Sha256 => Sha256::digest(buffer_to_hash).to_vec(),
        }
    }
}

/// `CertificateIssuer` is the fingerprint of a CA: the hash of its DER encoded subject name and the
/// hash of its subject public key, both prepared using the same hash algorithm.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertificateIssuer {
    hash_algorithm: HashAlgorithm,
    name_hash: Vec<u8>,
    key_hash: Vec<u8>,
}

impl CertificateIssuer {
    /// Generates a fingerprint for the presented issuer certificate using SHA-1.
    pub fn generate(issuer: &Certificate) -> Result<Self> {
        Self::generate_with(issuer, HashAlgorithm::Sha1)
    }

    /// Generates a fingerprint for the presented issuer certificate using the given hash algorithm.
    ///
    /// The key hash covers the subject public key BIT STRING contents (excluding tag, length and
    /// number of unused bits). [`Error::Encoding`](crate::Error::Encoding) is returned if the subject
    /// name cannot be encoded.
    pub fn generate_with(issuer: &Certificate, hash_algorithm: HashAlgorithm) -> Result<Self> {
        let enc_subject = issuer.tbs_certificate.subject.to_der()?;
        let name_hash = hash_algorithm.digest(enc_subject.as_slice());
        let key_hash = hash_algorithm.digest(
            issuer
                .tbs_certificate
                .subject_public_key_info
                .subject_public_key
                .raw_bytes(),
        );
        Ok(CertificateIssuer {
            hash_algorithm,
            name_hash,
            key_hash,
        })
    }

    /// Hash algorithm used to generate the fingerprint
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    /// Hash of the issuer's DER encoded subject name
    pub fn name_hash(&self) -> &[u8] {
        &self.name_hash
    }

    /// Hash of the issuer's subject public key
    pub fn key_hash(&self) -> &[u8] {
        &self.key_hash
    }
}

/// `CertificateId` pairs an issuer fingerprint with the serial number of one certificate issued by
/// that issuer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertificateId {
    issuer: CertificateIssuer,
    serial_number: SerialNumber,
}

impl CertificateId {
    /// Creates a `CertificateId` for `target` relative to the given issuer fingerprint.
    pub fn new(issuer: &CertificateIssuer, target: &Certificate) -> Self {
        CertificateId {
            issuer: issuer.clone(),
            serial_number: target.tbs_certificate.serial_number.clone(),
        }
    }

    /// Issuer fingerprint
    pub fn issuer(&self) -> &CertificateIssuer {
        &self.issuer
    }

    /// Serial number of the certificate
    pub fn serial_number(&self) -> &SerialNumber {
        &self.serial_number
    }

    /// Prepares the CertID structure included in a request.
    pub fn to_cert_id(&self) -> Result<CertId> {
        Ok(CertId {
            hash_algorithm: self.issuer.hash_algorithm.algorithm_identifier(),
            issuer_name_hash: OctetString::new(self.issuer.name_hash.as_slice())?,
            issuer_key_hash: OctetString::new(self.issuer.key_hash.as_slice())?,
            serial_number: self.serial_number.clone(),
        })
    }

    /// `matches` returns true if the serial number, issuer name hash, issuer key hash and hash
    /// algorithm in the `cert_id` object match this `CertificateId`. Else it returns false.
    pub fn matches(&self, cert_id: &CertId) -> bool {
        if cert_id.serial_number.as_bytes() != self.serial_number.as_bytes() {
            return false;
        }
        if HashAlgorithm::from_oid(&cert_id.hash_algorithm.oid) != Some(self.issuer.hash_algorithm)
        {
            return false;
        }
        if cert_id.issuer_name_hash.as_bytes() != self.issuer.name_hash.as_slice() {
            return false;
        }
        if cert_id.issuer_key_hash.as_bytes() != self.issuer.key_hash.as_slice() {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_digest() {
        assert_eq!(
            HashAlgorithm::Sha1.digest(b"abc"),
            hex!("A9993E364706816ABA3E25717850C26C9CD0D89D")
        );
        assert_eq!(
            HashAlgorithm::Sha256.digest(b"abc"),
            hex!("BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD")
        );
    }

    #[test]
    fn test_oids() {
        assert_eq!(
            Some(HashAlgorithm::Sha1),
            HashAlgorithm::from_oid(&HashAlgorithm::Sha1.oid())
        );
        assert_eq!(
            Some(HashAlgorithm::Sha256),
            HashAlgorithm::from_oid(&HashAlgorithm::Sha256.oid())
        );
        assert_eq!(
            None,
            HashAlgorithm::from_oid(&crate::PKIXALG_ECDSA_WITH_SHA256)
        );
        assert_eq!(None, HashAlgorithm::Sha1.algorithm_identifier().parameters);
        assert_eq!(HashAlgorithm::Sha1, HashAlgorithm::default());
    }
}
