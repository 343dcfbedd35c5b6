//! Test PKI, OCSP responder and transport used by the integration tests
#![allow(dead_code)]

use core::time::Duration;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use cms::{
    cert::CertificateChoices,
    content_info::{CmsVersion, ContentInfo},
    signed_data::{CertificateSet, EncapsulatedContentInfo, SignedData, SignerInfos},
};
use const_oid::db::{
    rfc5911::{ID_DATA, ID_SIGNED_DATA},
    rfc5912::{
        ID_AD_CA_ISSUERS, ID_AD_OCSP, ID_CE_EXT_KEY_USAGE, ID_KP_OCSP_SIGNING,
        ID_KP_SERVER_AUTH, ID_PE_AUTHORITY_INFO_ACCESS,
    },
    rfc6960::{ID_PKIX_OCSP_BASIC, ID_PKIX_OCSP_NONCE},
};
use der::{
    asn1::{
        BitString, GeneralizedTime, Ia5String, Null, ObjectIdentifier, OctetString, SetOfVec,
        UtcTime,
    },
    Any, Decode, Encode,
};
use p256::ecdsa::{signature::Signer, Signature, SigningKey};
use p256::pkcs8::EncodePublicKey;
use rand::rngs::OsRng;
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::{
    certificate::{TbsCertificate, Version},
    ext::{
        pkix::{name::GeneralName, AccessDescription, AuthorityInfoAccessSyntax, ExtendedKeyUsage},
        Extension,
    },
    name::Name,
    serial_number::SerialNumber,
    time::{Time, Validity},
    Certificate,
};
use x509_ocsp::{
    BasicOcspResponse, CertStatus, OcspGeneralizedTime, OcspRequest, OcspResponse,
    OcspResponseStatus, ResponderId, ResponseBytes, ResponseData, RevokedInfo, SingleResponse,
};

use ocspval::{
    get_key_hash, nonce_extension, OcspTransport, TransportError, PKIXALG_ECDSA_WITH_SHA256,
};

pub const OCSP_URI: &str = "http://ocsp.example.com";
pub const CA_ISSUERS_URI: &str = "http://ca.example.com/ca.p7c";
pub const NOW: u64 = 1_700_000_000;
pub const REVOKED_AT: u64 = 1_690_000_000;

pub fn ecdsa_with_sha256() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: PKIXALG_ECDSA_WITH_SHA256,
        parameters: None,
    }
}

pub fn spki_for(key: &SigningKey) -> SubjectPublicKeyInfoOwned {
    let doc = key.verifying_key().to_public_key_der().unwrap();
    SubjectPublicKeyInfoOwned::from_der(doc.as_bytes()).unwrap()
}

pub fn gt(secs: u64) -> OcspGeneralizedTime {
    OcspGeneralizedTime(GeneralizedTime::from_unix_duration(Duration::from_secs(secs)).unwrap())
}

fn utc(secs: u64) -> Time {
    Time::UtcTime(UtcTime::from_unix_duration(Duration::from_secs(secs)).unwrap())
}

fn sign(key: &SigningKey, message: &[u8]) -> BitString {
    let sig: Signature = key.sign(message);
    BitString::from_bytes(sig.to_der().as_bytes()).unwrap()
}

pub fn aia_extension(ocsp: Option<&str>, ca_issuers: Option<&str>) -> Extension {
    let mut ads = vec![];
    if let Some(uri) = ocsp {
        ads.push(AccessDescription {
            access_method: ID_AD_OCSP,
            access_location: GeneralName::UniformResourceIdentifier(Ia5String::new(uri).unwrap()),
        });
    }
    if let Some(uri) = ca_issuers {
        ads.push(AccessDescription {
            access_method: ID_AD_CA_ISSUERS,
            access_location: GeneralName::UniformResourceIdentifier(Ia5String::new(uri).unwrap()),
        });
    }
    Extension {
        extn_id: ID_PE_AUTHORITY_INFO_ACCESS,
        critical: false,
        extn_value: OctetString::new(AuthorityInfoAccessSyntax(ads).to_der().unwrap()).unwrap(),
    }
}

pub fn eku_extension(oids: Vec<ObjectIdentifier>) -> Extension {
    Extension {
        extn_id: ID_CE_EXT_KEY_USAGE,
        critical: false,
        extn_value: OctetString::new(ExtendedKeyUsage(oids).to_der().unwrap()).unwrap(),
    }
}

/// Issues a certificate to `subject` signed by `issuer_key`. Serial numbers must be below 0x80.
pub fn issue_cert(
    subject: &str,
    serial: u8,
    subject_key: &SigningKey,
    issuer_name: &Name,
    issuer_key: &SigningKey,
    extensions: Vec<Extension>,
) -> Certificate {
    let tbs_certificate = TbsCertificate {
        version: Version::V3,
        serial_number: SerialNumber::new(&[serial]).unwrap(),
        signature: ecdsa_with_sha256(),
        issuer: issuer_name.clone(),
        validity: Validity {
            not_before: utc(NOW - 86_400),
            not_after: utc(NOW + 3_650 * 86_400),
        },
        subject: Name::from_str(subject).unwrap(),
        subject_public_key_info: spki_for(subject_key),
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: if extensions.is_empty() {
            None
        } else {
            Some(extensions)
        },
    };
    let signature = sign(issuer_key, &tbs_certificate.to_der().unwrap());
    Certificate {
        tbs_certificate,
        signature_algorithm: ecdsa_with_sha256(),
        signature,
    }
}

/// A CA, end entity certificates issued by it and two candidate responders
pub struct TestPki {
    pub ca_key: SigningKey,
    pub ca: Certificate,
    /// AIA with OCSP and CA Issuers locations
    pub ee: Certificate,
    /// Another certificate with the same AIA as `ee`
    pub ee2: Certificate,
    /// No extensions
    pub ee_no_aia: Certificate,
    /// Delegated responder asserting id-kp-OCSPSigning
    pub responder_key: SigningKey,
    pub responder: Certificate,
    /// Issued by the CA but only asserting id-kp-serverAuth
    pub rogue_key: SigningKey,
    pub rogue: Certificate,
}

impl TestPki {
    pub fn new() -> Self {
        let ca_key = SigningKey::random(&mut OsRng);
        let ca_name = Name::from_str("CN=Test CA,O=Example").unwrap();
        let ca = issue_cert(
            "CN=Test CA,O=Example",
            0x01,
            &ca_key,
            &ca_name,
            &ca_key,
            vec![],
        );

        let ee_key = SigningKey::random(&mut OsRng);
        let aia = aia_extension(Some(OCSP_URI), Some(CA_ISSUERS_URI));
        let ee = issue_cert(
            "CN=Alice,O=Example",
            0x10,
            &ee_key,
            &ca_name,
            &ca_key,
            vec![aia.clone()],
        );
        let ee2 = issue_cert(
            "CN=Bob,O=Example",
            0x12,
            &ee_key,
            &ca_name,
            &ca_key,
            vec![aia],
        );
        let ee_no_aia = issue_cert(
            "CN=Carol,O=Example",
            0x11,
            &ee_key,
            &ca_name,
            &ca_key,
            vec![],
        );

        let responder_key = SigningKey::random(&mut OsRng);
        let responder = issue_cert(
            "CN=Test OCSP Responder,O=Example",
            0x20,
            &responder_key,
            &ca_name,
            &ca_key,
            vec![eku_extension(vec![ID_KP_OCSP_SIGNING])],
        );

        let rogue_key = SigningKey::random(&mut OsRng);
        let rogue = issue_cert(
            "CN=Rogue Responder,O=Example",
            0x21,
            &rogue_key,
            &ca_name,
            &ca_key,
            vec![eku_extension(vec![ID_KP_SERVER_AUTH])],
        );

        TestPki {
            ca_key,
            ca,
            ee,
            ee2,
            ee_no_aia,
            responder_key,
            responder,
            rogue_key,
            rogue,
        }
    }
}

pub fn good() -> CertStatus {
    CertStatus::Good(Null)
}

pub fn revoked() -> CertStatus {
    CertStatus::Revoked(RevokedInfo {
        revocation_time: gt(REVOKED_AT),
        revocation_reason: None,
    })
}

pub fn unknown() -> CertStatus {
    CertStatus::Unknown(Null)
}

/// Answers OCSP requests. Each request entry is answered with `status` unless altered by the other
/// fields.
#[derive(Clone)]
pub struct Responder {
    pub key: SigningKey,
    pub cert: Certificate,
    pub include_cert: bool,
    pub by_key: bool,
    pub status: CertStatus,
    pub echo_nonce: bool,
    pub nonce: Option<Vec<u8>>,
    pub serial: Option<SerialNumber>,
    pub response_status: OcspResponseStatus,
    pub critical_single_extension: bool,
    /// When set, each entry is answered a second time with this status
    pub duplicate_status: Option<CertStatus>,
}

impl Responder {
    /// Responses signed by the CA, identified by name
    pub fn ca(pki: &TestPki, status: CertStatus) -> Self {
        Responder {
            key: pki.ca_key.clone(),
            cert: pki.ca.clone(),
            include_cert: false,
            by_key: false,
            status,
            echo_nonce: true,
            nonce: None,
            serial: None,
            response_status: OcspResponseStatus::Successful,
            critical_single_extension: false,
            duplicate_status: None,
        }
    }

    /// Responses signed by the delegated responder, which is included in the response
    pub fn delegated(pki: &TestPki, status: CertStatus) -> Self {
        Responder {
            key: pki.responder_key.clone(),
            cert: pki.responder.clone(),
            include_cert: true,
            ..Self::ca(pki, status)
        }
    }

    pub fn respond(&self, enc_req: &[u8]) -> Vec<u8> {
        let req = OcspRequest::from_der(enc_req).unwrap();
        if self.response_status != OcspResponseStatus::Successful {
            return OcspResponse {
                response_status: self.response_status,
                response_bytes: None,
            }
            .to_der()
            .unwrap();
        }

        let nonce_ext = match (&self.nonce, self.echo_nonce) {
            (Some(nonce), _) => Some(nonce_extension(nonce).unwrap()),
            (None, true) => req
                .tbs_request
                .request_extensions
                .iter()
                .flatten()
                .find(|e| e.extn_id == ID_PKIX_OCSP_NONCE)
                .cloned(),
            (None, false) => None,
        };

        let responses = req
            .tbs_request
            .request_list
            .iter()
            .flat_map(|r| {
                let mut cert_id = r.req_cert.clone();
                if let Some(serial) = &self.serial {
                    cert_id.serial_number = serial.clone();
                }
                let single_extensions = if self.critical_single_extension {
                    Some(vec![Extension {
                        extn_id: ID_PKIX_OCSP_BASIC,
                        critical: true,
                        extn_value: OctetString::new(vec![0x05, 0x00]).unwrap(),
                    }])
                } else {
                    None
                };
                let mut statuses = vec![self.status.clone()];
                if let Some(status) = &self.duplicate_status {
                    statuses.push(status.clone());
                }
                statuses
                    .into_iter()
                    .map(|cert_status| SingleResponse {
                        cert_id: cert_id.clone(),
                        cert_status,
                        this_update: gt(NOW - 3_600),
                        next_update: Some(gt(NOW + 3_600)),
                        single_extensions: single_extensions.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        let responder_id = if self.by_key {
            ResponderId::ByKey(OctetString::new(get_key_hash(&self.cert)).unwrap())
        } else {
            ResponderId::ByName(self.cert.tbs_certificate.subject.clone())
        };

        let tbs_response_data = ResponseData {
            version: x509_ocsp::Version::V1,
            responder_id,
            produced_at: gt(NOW),
            responses,
            response_extensions: nonce_ext.map(|e| vec![e]),
        };
        let signature = sign(&self.key, &tbs_response_data.to_der().unwrap());
        let bor = BasicOcspResponse {
            tbs_response_data,
            signature_algorithm: ecdsa_with_sha256(),
            signature,
            certs: if self.include_cert {
                Some(vec![self.cert.clone()])
            } else {
                None
            },
        };

        OcspResponse {
            response_status: OcspResponseStatus::Successful,
            response_bytes: Some(ResponseBytes {
                response_type: ID_PKIX_OCSP_BASIC,
                response: OctetString::new(bor.to_der().unwrap()).unwrap(),
            }),
        }
        .to_der()
        .unwrap()
    }
}

/// Wraps certificates in a degenerate certs-only SignedData message
pub fn certs_only_p7(certs: Vec<Certificate>) -> Vec<u8> {
    let choices: Vec<CertificateChoices> = certs
        .into_iter()
        .map(CertificateChoices::Certificate)
        .collect();
    let sd = SignedData {
        version: CmsVersion::V1,
        digest_algorithms: SetOfVec::new(),
        encap_content_info: EncapsulatedContentInfo {
            econtent_type: ID_DATA,
            econtent: None,
        },
        certificates: Some(CertificateSet(SetOfVec::try_from(choices).unwrap())),
        crls: None,
        signer_infos: SignerInfos(SetOfVec::new()),
    };
    ContentInfo {
        content_type: ID_SIGNED_DATA,
        content: Any::encode_from(&sd).unwrap(),
    }
    .to_der()
    .unwrap()
}

/// Transport that records each exchange and answers using a [`Responder`]
#[derive(Default)]
pub struct MockTransport {
    pub responder: Option<Responder>,
    pub post_error: Option<TransportError>,
    pub fetch_body: Option<Vec<u8>>,
    pub posts: AtomicUsize,
    pub fetches: AtomicUsize,
    pub last_uri: Mutex<Option<String>>,
}

impl MockTransport {
    pub fn new(responder: Responder) -> Self {
        MockTransport {
            responder: Some(responder),
            ..Default::default()
        }
    }

    pub fn posts(&self) -> usize {
        self.posts.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn last_uri(&self) -> Option<String> {
        self.last_uri.lock().unwrap().clone()
    }
}

impl OcspTransport for MockTransport {
    async fn post_request(&self, uri: &str, body: &[u8]) -> Result<Vec<u8>, TransportError> {
        self.posts.fetch_add(1, Ordering::SeqCst);
        *self.last_uri.lock().unwrap() = Some(uri.to_string());
        if let Some(e) = &self.post_error {
            return Err(e.clone());
        }
        match &self.responder {
            Some(responder) => Ok(responder.respond(body)),
            None => Err(TransportError::HttpStatus(404)),
        }
    }

    async fn fetch(&self, _uri: &str) -> Result<Vec<u8>, TransportError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match &self.fetch_body {
            Some(body) => Ok(body.clone()),
            None => Err(TransportError::HttpStatus(404)),
        }
    }
}
