//! Discovery of OCSP responder locations and issuer certificates from the authority information
//! access (AIA) extension

use cms::{cert::CertificateChoices, content_info::ContentInfo, signed_data::SignedData};
use const_oid::db::rfc5912::{ID_AD_CA_ISSUERS, ID_AD_OCSP, ID_PE_AUTHORITY_INFO_ACCESS};
use der::{asn1::ObjectIdentifier, Decode, Encode};
use log::{debug, error, info};
use x509_cert::{
    ext::pkix::{name::GeneralName, AuthorityInfoAccessSyntax},
    Certificate,
};

use crate::revocation::transport::{is_http_uri, OcspTransport};
use crate::util::cert_utils::{is_issued_by, name_to_string, parse_cert_buffer};

fn get_aia(cert: &Certificate) -> Option<AuthorityInfoAccessSyntax> {
    let exts = cert.tbs_certificate.extensions.as_ref()?;
    for ext in exts {
        if ext.extn_id == ID_PE_AUTHORITY_INFO_ACCESS {
            return match AuthorityInfoAccessSyntax::from_der(ext.extn_value.as_bytes()) {
                Ok(aia) => Some(aia),
                Err(e) => {
                    error!(
                        "Failed to parse AIA extension in certificate issued to {} with: {}",
                        name_to_string(&cert.tbs_certificate.subject),
                        e
                    );
                    None
                }
            };
        }
    }
    None
}

fn get_aia_uris(cert: &Certificate, access_method: ObjectIdentifier) -> Vec<String> {
    let mut retval: Vec<String> = vec![];
    if let Some(aias) = get_aia(cert) {
        for aia in &aias.0 {
            if aia.access_method == access_method {
                if let GeneralName::UniformResourceIdentifier(uri) = &aia.access_location {
                    let uri = uri.as_str();
                    if !is_http_uri(uri) {
                        debug!("Ignored non-HTTP URI in AIA extension: {}", uri);
                        continue;
                    }
                    if !retval.iter().any(|u| u == uri) {
                        retval.push(uri.to_string());
                    }
                }
            }
        }
    }
    retval
}

/// `detect_responder_uri` returns the first HTTP or HTTPS id-ad-ocsp location from the AIA
/// extension of `cert`, if any.
pub fn detect_responder_uri(cert: &Certificate) -> Option<String> {
    get_aia_uris(cert, ID_AD_OCSP).into_iter().next()
}

/// `ca_issuers_uris` returns the unique HTTP or HTTPS id-ad-caIssuers locations from the AIA
/// extension of `cert`.
pub fn ca_issuers_uris(cert: &Certificate) -> Vec<String> {
    get_aia_uris(cert, ID_AD_CA_ISSUERS)
}

/// `certs_from_buffer` parses a buffer retrieved from a CA Issuers location. The buffer may contain a
/// DER or PEM encoded certificate or a degenerate certs-only SignedData message.
pub fn certs_from_buffer(bytes: &[u8], source: &str) -> Vec<Certificate> {
    if let Ok(cert) = parse_cert_buffer(bytes) {
        return vec![cert];
    }

    let mut retval = vec![];
    let ci = match ContentInfo::from_der(bytes) {
        Ok(ci) => ci,
        Err(e) => {
            error!(
                "Failed to parse certificate or ContentInfo from {} with {:?}",
                source, e
            );
            return retval;
        }
    };
    let content = match ci.content.to_der() {
        Ok(content) => content,
        Err(e) => {
            error!("Failed to encode content from {} with {:?}", source, e);
            return retval;
        }
    };
    match SignedData::from_der(content.as_slice()) {
        Ok(sd) => {
            if let Some(certs) = &sd.certificates {
                for c in certs.0.iter() {
                    if let CertificateChoices::Certificate(cert) = c {
                        retval.push(cert.clone());
                    }
                }
            }
        }
        Err(e) => {
            error!("Failed to parse SignedData from {} with {:?}", source, e);
        }
    }
    retval
}

/// `find_intermediate` looks for the certificate that issued `cert`.
///
/// The `intermediates` are searched first for a certificate whose subject name matches the issuer
/// name of `cert` and whose public key verifies the signature on `cert`. Failing that, each CA
/// Issuers location from the AIA extension of `cert` is retrieved using `transport` and searched the
/// same way. Candidates whose key does not verify `cert` are skipped. All failures are logged and
/// result in `None`.
pub async fn find_intermediate<T: OcspTransport>(
    cert: &Certificate,
    intermediates: &[Certificate],
    transport: &T,
) -> Option<Certificate> {
    let issuer_name = &cert.tbs_certificate.issuer;
    let enc_cert = match cert.to_der() {
        Ok(enc_cert) => enc_cert,
        Err(e) => {
            error!(
                "Failed to encode certificate issued by {} with: {}",
                name_to_string(issuer_name),
                e
            );
            return None;
        }
    };

    if let Some(ca) = intermediates
        .iter()
        .find(|ca| is_issued_by(cert, &enc_cert, ca))
    {
        debug!(
            "Found issuer {} among registered intermediates",
            name_to_string(issuer_name)
        );
        return Some(ca.clone());
    }

    for uri in ca_issuers_uris(cert) {
        let bytes = match transport.fetch(&uri).await {
            Ok(bytes) => bytes,
            Err(e) => {
                info!("Failed to retrieve CA Issuers artifact from {}: {}", uri, e);
                continue;
            }
        };
        if let Some(ca) = certs_from_buffer(&bytes, &uri)
            .into_iter()
            .find(|ca| is_issued_by(cert, &enc_cert, ca))
        {
            info!(
                "Retrieved issuer {} from {}",
                name_to_string(issuer_name),
                uri
            );
            return Some(ca);
        }
        info!(
            "No certificate issued to {} that verifies the target found at {}",
            name_to_string(issuer_name),
            uri
        );
    }
    None
}

#[test]
fn certs_from_garbage() {
    assert!(certs_from_buffer(b"garbage", "test").is_empty());
    assert!(certs_from_buffer(&[0x30, 0x03, 0x02, 0x01, 0x01], "test").is_empty());
}
