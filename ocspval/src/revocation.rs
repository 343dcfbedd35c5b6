//! OCSP request preparation, response verification and status resolution
//!
//! The revocation module provides the pipeline used to determine whether a certificate is good,
//! revoked or unknown according to its issuer's OCSP responder:
//!
//! - [`cert_id`] generates issuer fingerprints and CertIDs
//! - [`locator`] finds responder URIs and issuer certificates via the AIA extension
//! - [`request`] prepares DER encoded requests, optionally with a nonce
//! - [`transport`] delivers requests to responders
//! - [`response`] authenticates responses
//! - [`status`] resolves a certificate's status and applies revoked/unknown policy
//!
//! [`OcspClient`](ocsp_client::OcspClient) ties these together:
//!
//! ```no_run
//! # async fn example() -> ocspval::Result<()> {
//! use ocspval::{parse_cert_buffer, CertificateStatus, OcspClient, OcspSettings};
//!
//! let target = parse_cert_buffer(&std::fs::read("target.der").unwrap())?;
//! let issuer = parse_cert_buffer(&std::fs::read("issuer.der").unwrap())?;
//!
//! let client = OcspClient::new(OcspSettings::default())?;
//! let result = client.verify_with_issuer(&target, Some(&issuer)).await?;
//! assert_eq!(CertificateStatus::Good, result.status);
//! # Ok(())
//! # }
//! ```
pub mod cert_id;
pub mod locator;
pub mod ocsp_client;
pub mod request;
pub mod response;
pub mod status;
pub mod transport;

pub use crate::revocation::{
    cert_id::*, locator::*, ocsp_client::*, request::*, response::*, status::*, transport::*,
};
