//! Error types

use core::fmt;

use crate::revocation::status::CertificateResult;

/// Result type
pub type Result<T> = core::result::Result<T, Error>;

/// Response status values defined in [RFC 6960 Section 4.2.1]. Only `Successful` responses carry
/// certificate status information.
///
/// [RFC 6960 Section 4.2.1]: https://datatracker.ietf.org/doc/html/rfc6960#section-4.2.1
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ResponseStatus {
    /// Response has valid confirmations
    Successful,
    /// Illegal confirmation request
    MalformedRequest,
    /// Internal error in issuer
    InternalError,
    /// Try again later
    TryLater,
    /// Must sign the request
    SigRequired,
    /// Request unauthorized
    Unauthorized,
}

impl From<x509_ocsp::OcspResponseStatus> for ResponseStatus {
    fn from(status: x509_ocsp::OcspResponseStatus) -> ResponseStatus {
        use x509_ocsp::OcspResponseStatus::*;
        match status {
            Successful => ResponseStatus::Successful,
            MalformedRequest => ResponseStatus::MalformedRequest,
            InternalError => ResponseStatus::InternalError,
            TryLater => ResponseStatus::TryLater,
            SigRequired => ResponseStatus::SigRequired,
            Unauthorized => ResponseStatus::Unauthorized,
        }
    }
}

/// Reasons an OCSP response was rejected while being authenticated or decoded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum OcspProtocolError {
    /// The responder answered with a status other than successful.
    Unsuccessful(ResponseStatus),
    /// The response could not be parsed.
    Malformed,
    /// A successful response did not include responseBytes.
    MissingResponseBytes,
    /// The responseBytes were of a type other than id-pkix-ocsp-basic.
    UnsupportedResponseType,
    /// No certificate available to the client matched the ResponderID of the response.
    UnauthorizedResponder,
    /// The response signature did not verify using the responder's public key.
    SignatureInvalid,
    /// The response was signed using an algorithm that is not supported.
    UnsupportedSignatureAlgorithm,
    /// The request carried a nonce that was not echoed by the response.
    NonceMismatch,
    /// The response or a matching SingleResponse featured an unsupported critical extension.
    UnsupportedCriticalExtension,
    /// None of the SingleResponse entries matched a certificate that was asked about.
    NoMatchingResponse,
}

/// Identifies which policy switch caused a [`PolicyViolation`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ViolationKind {
    /// The certificate is revoked and `raise_on_revoked` is set.
    Revoked,
    /// The certificate status is unknown and `raise_on_unknown` is set.
    Unknown,
}

/// Raised when status was determined but the configured policy does not permit the status to be
/// returned silently. The resolved result remains available for inspection.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PolicyViolation {
    /// Policy switch that fired
    pub kind: ViolationKind,
    /// Status that was resolved from the response
    pub result: CertificateResult,
}

/// Errors reported by an [`OcspTransport`](crate::OcspTransport) implementation.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum TransportError {
    /// A URI scheme was encountered that was not valid in given context, i.e., ldap URI presented to OCSP
    InvalidUriScheme(String),
    /// The server answered with a non-success HTTP status code
    HttpStatus(u16),
    /// Connection, timeout or body read failure
    Network(String),
}

/// Error type
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Certificate or request contents could not be DER encoded or decoded.
    Encoding(der::Error),
    /// No issuer certificate was supplied and none could be discovered. Requests are not sent
    /// without an issuer because the CertID would not be bound to an issuing CA.
    IssuerUnavailable,
    /// NotFound occurs when an action failed because a necessary artifact was not found.
    NotFound,
    /// The transport failed to deliver the request or to return a response.
    Transport(TransportError),
    /// An OCSP response failed authentication or decoding.
    Protocol(OcspProtocolError),
    /// Status was resolved but policy forbids returning it without raising.
    Policy(PolicyViolation),
    /// A configuration error was detected. See textual log output for more details.
    Misconfiguration,
}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Error {
        Error::Encoding(err)
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Error {
        Error::Transport(err)
    }
}

impl From<OcspProtocolError> for Error {
    fn from(err: OcspProtocolError) -> Error {
        Error::Protocol(err)
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseStatus::Successful => write!(f, "successful"),
            ResponseStatus::MalformedRequest => write!(f, "malformedRequest"),
            ResponseStatus::InternalError => write!(f, "internalError"),
            ResponseStatus::TryLater => write!(f, "tryLater"),
            ResponseStatus::SigRequired => write!(f, "sigRequired"),
            ResponseStatus::Unauthorized => write!(f, "unauthorized"),
        }
    }
}

impl fmt::Display for OcspProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OcspProtocolError::Unsuccessful(status) => {
                write!(f, "Unsuccessful response status: {}", status)
            }
            OcspProtocolError::Malformed => write!(f, "Malformed"),
            OcspProtocolError::MissingResponseBytes => write!(f, "MissingResponseBytes"),
            OcspProtocolError::UnsupportedResponseType => write!(f, "UnsupportedResponseType"),
            OcspProtocolError::UnauthorizedResponder => write!(f, "UnauthorizedResponder"),
            OcspProtocolError::SignatureInvalid => write!(f, "SignatureInvalid"),
            OcspProtocolError::UnsupportedSignatureAlgorithm => {
                write!(f, "UnsupportedSignatureAlgorithm")
            }
            OcspProtocolError::NonceMismatch => write!(f, "NonceMismatch"),
            OcspProtocolError::UnsupportedCriticalExtension => {
                write!(f, "UnsupportedCriticalExtension")
            }
            OcspProtocolError::NoMatchingResponse => write!(f, "NoMatchingResponse"),
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::Revoked => write!(f, "Certificate is revoked"),
            ViolationKind::Unknown => write!(f, "Status of certificate is unknown"),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::InvalidUriScheme(uri) => write!(f, "InvalidUriScheme: {}", uri),
            TransportError::HttpStatus(code) => write!(f, "HttpStatus: {}", code),
            TransportError::Network(msg) => write!(f, "Network: {}", msg),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Encoding(err) => write!(f, "EncodingError: {}", err),
            Error::IssuerUnavailable => write!(f, "IssuerUnavailable"),
            Error::NotFound => write!(f, "NotFound"),
            Error::Transport(err) => write!(f, "TransportError: {}", err),
            Error::Protocol(err) => write!(f, "OcspProtocolError: {}", err),
            Error::Policy(violation) => write!(f, "PolicyViolation: {}", violation.kind),
            Error::Misconfiguration => write!(f, "Misconfiguration"),
        }
    }
}

impl std::error::Error for Error {}

impl std::error::Error for TransportError {}

#[test]
fn error_test() {
    use crate::revocation::status::CertificateStatus;

    let _s = format!("{}", ResponseStatus::Successful);
    let _s = format!("{}", OcspProtocolError::Malformed);
    let _s = format!("{}", OcspProtocolError::NoMatchingResponse);
    let _s = format!("{}", TransportError::HttpStatus(500));
    let _s = format!("{}", Error::IssuerUnavailable);
    let _s = format!("{}", Error::Misconfiguration);

    assert_eq!(
        "OcspProtocolError: Unsuccessful response status: tryLater",
        format!(
            "{}",
            Error::Protocol(OcspProtocolError::Unsuccessful(ResponseStatus::TryLater))
        )
    );

    let violation = PolicyViolation {
        kind: ViolationKind::Revoked,
        result: CertificateResult {
            status: CertificateStatus::Unknown,
            this_update: None,
            next_update: None,
        },
    };
    assert_eq!(
        "PolicyViolation: Certificate is revoked",
        format!("{}", Error::Policy(violation))
    );
}

#[test]
fn response_status_from_wire() {
    assert_eq!(
        ResponseStatus::SigRequired,
        ResponseStatus::from(x509_ocsp::OcspResponseStatus::SigRequired)
    );
    assert_eq!(
        ResponseStatus::Unauthorized,
        ResponseStatus::from(x509_ocsp::OcspResponseStatus::Unauthorized)
    );
}
