//! Signature verification for OCSP responses and responder certificates using libraries from the
//! [Rust Crypto](https://github.com/RustCrypto) project.

use const_oid::AssociatedOid;
use der::{asn1::ObjectIdentifier, Encode};
use log::error;
use p256::ecdsa::signature::Verifier;
use rsa::{pkcs8::DecodePublicKey, Pkcs1v15Sign, RsaPublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::util::alg_oids::*;
use crate::util::error::{Error, OcspProtocolError, Result};

/// is_rsa returns true is the presented OID is one of [`PKIXALG_SHA1_WITH_RSA_ENCRYPTION`],
/// [`PKIXALG_SHA224_WITH_RSA_ENCRYPTION`], [`PKIXALG_SHA256_WITH_RSA_ENCRYPTION`],
/// [`PKIXALG_SHA384_WITH_RSA_ENCRYPTION`] or [`PKIXALG_SHA512_WITH_RSA_ENCRYPTION`] and false otherwise.
pub(crate) fn is_rsa(oid: &ObjectIdentifier) -> bool {
    *oid == PKIXALG_SHA256_WITH_RSA_ENCRYPTION
        || *oid == PKIXALG_SHA384_WITH_RSA_ENCRYPTION
        || *oid == PKIXALG_SHA224_WITH_RSA_ENCRYPTION
        || *oid == PKIXALG_SHA512_WITH_RSA_ENCRYPTION
        || *oid == PKIXALG_SHA1_WITH_RSA_ENCRYPTION
}

/// is_ecdsa returns true is the presented OID is one of [`PKIXALG_ECDSA_WITH_SHA256`] or
/// [`PKIXALG_ECDSA_WITH_SHA384`] and false otherwise.
pub(crate) fn is_ecdsa(oid: &ObjectIdentifier) -> bool {
    *oid == PKIXALG_ECDSA_WITH_SHA256 || *oid == PKIXALG_ECDSA_WITH_SHA384
}

fn unsupported() -> Error {
    Error::Protocol(OcspProtocolError::UnsupportedSignatureAlgorithm)
}

fn invalid() -> Error {
    Error::Protocol(OcspProtocolError::SignatureInvalid)
}

fn verify_rsa_pkcs1v15<D: Digest + AssociatedOid>(
    rsa: &RsaPublicKey,
    message_to_verify: &[u8],
    signature: &[u8],
) -> Result<()> {
    let hash_to_verify = D::digest(message_to_verify);
    rsa.verify(
        Pkcs1v15Sign::new::<D>(),
        hash_to_verify.as_slice(),
        signature,
    )
    .map_err(|_err| invalid())
}

fn get_named_curve_parameter(alg_id: &AlgorithmIdentifierOwned) -> Result<ObjectIdentifier> {
    if let Some(params) = &alg_id.parameters {
        if let Ok(oid) = params.decode_as::<ObjectIdentifier>() {
            return Ok(oid);
        }
    }
    Err(unsupported())
}

/// `verify_signature_message` verifies `signature` over `message_to_verify` using the public key in
/// `spki` and the algorithm indicated by `signature_alg`.
///
/// RSA PKCS #1 v1.5 signatures using SHA-1 or SHA-2, ECDSA P-256 with SHA-256 and ECDSA P-384
/// with SHA-384 are supported. A signature that does not verify yields
/// [`OcspProtocolError::SignatureInvalid`]. An algorithm or key that is not supported yields
/// [`OcspProtocolError::UnsupportedSignatureAlgorithm`].
pub fn verify_signature_message(
    message_to_verify: &[u8],
    signature: &[u8],
    signature_alg: &AlgorithmIdentifierOwned,
    spki: &SubjectPublicKeyInfoOwned,
) -> Result<()> {
    if is_rsa(&signature_alg.oid) {
        if spki.algorithm.oid != PKIXALG_RSA_ENCRYPTION {
            error!(
                "RSA signature algorithm presented with non-RSA key: {}",
                spki.algorithm.oid
            );
            return Err(unsupported());
        }
        let enc_spki = spki.to_der()?;
        let rsa = match RsaPublicKey::from_public_key_der(&enc_spki) {
            Ok(rsa) => rsa,
            Err(e) => {
                error!("Failed to parse RSA public key: {:?}", e);
                return Err(unsupported());
            }
        };
        return match signature_alg.oid {
            PKIXALG_SHA256_WITH_RSA_ENCRYPTION => {
                verify_rsa_pkcs1v15::<Sha256>(&rsa, message_to_verify, signature)
            }
            PKIXALG_SHA384_WITH_RSA_ENCRYPTION => {
                verify_rsa_pkcs1v15::<Sha384>(&rsa, message_to_verify, signature)
            }
            PKIXALG_SHA512_WITH_RSA_ENCRYPTION => {
                verify_rsa_pkcs1v15::<Sha512>(&rsa, message_to_verify, signature)
            }
            PKIXALG_SHA224_WITH_RSA_ENCRYPTION => {
                verify_rsa_pkcs1v15::<Sha224>(&rsa, message_to_verify, signature)
            }
            _ => verify_rsa_pkcs1v15::<Sha1>(&rsa, message_to_verify, signature),
        };
    } else if is_ecdsa(&signature_alg.oid) {
        if spki.algorithm.oid != PKIXALG_EC_PUBLIC_KEY {
            error!(
                "ECDSA signature algorithm presented with non-EC key: {}",
                spki.algorithm.oid
            );
            return Err(unsupported());
        }
        let named_curve = get_named_curve_parameter(&spki.algorithm)?;
        let public_key = spki.subject_public_key.raw_bytes();

        return match (named_curve, signature_alg.oid) {
            (PKIXALG_SECP256R1, PKIXALG_ECDSA_WITH_SHA256) => {
                let ecdsa =
                    p256::ecdsa::VerifyingKey::from_sec1_bytes(public_key).map_err(|e| {
                        error!("Failed to parse P-256 public key: {:?}", e);
                        unsupported()
                    })?;
                let s = p256::ecdsa::Signature::from_der(signature).map_err(|_e| invalid())?;
                ecdsa.verify(message_to_verify, &s).map_err(|_e| invalid())
            }
            (PKIXALG_SECP384R1, PKIXALG_ECDSA_WITH_SHA384) => {
                let ecdsa =
                    p384::ecdsa::VerifyingKey::from_sec1_bytes(public_key).map_err(|e| {
                        error!("Failed to parse P-384 public key: {:?}", e);
                        unsupported()
                    })?;
                let s = p384::ecdsa::Signature::from_der(signature).map_err(|_e| invalid())?;
                ecdsa.verify(message_to_verify, &s).map_err(|_e| invalid())
            }
            _ => {
                error!(
                    "Unrecognized or unsupported named curve and algorithm combination: {} with {}",
                    named_curve, signature_alg.oid
                );
                Err(unsupported())
            }
        };
    }
    error!("Unrecognized signature algorithm: {}", signature_alg.oid);
    Err(unsupported())
}
