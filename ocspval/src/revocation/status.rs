//! Certificate status values and enforcement of revoked/unknown policy

use x509_cert::ext::pkix::CrlReason;

use crate::revocation::cert_id::CertificateId;
use crate::revocation::response::VerifiedResponse;
use crate::settings::OcspSettings;
use crate::util::error::{Error, OcspProtocolError, PolicyViolation, Result, ViolationKind};

/// Details from a revoked SingleResponse
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RevocationInfo {
    /// revocationTime expressed as seconds since Unix epoch
    pub revoked_at: u64,
    /// revocationReason, if present
    pub reason: Option<CrlReason>,
}

/// Status of a certificate as asserted by an OCSP responder
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CertificateStatus {
    /// The certificate is not revoked
    Good,
    /// The certificate is revoked
    Revoked(RevocationInfo),
    /// The responder does not know about the certificate, or no responder could be consulted
    Unknown,
}

/// Status of one certificate along with the validity window of the assertion
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CertificateResult {
    /// Certificate status
    pub status: CertificateStatus,
    /// thisUpdate expressed as seconds since Unix epoch
    pub this_update: Option<u64>,
    /// nextUpdate expressed as seconds since Unix epoch
    pub next_update: Option<u64>,
}

impl CertificateResult {
    /// Returns an unknown result that was not obtained from a response.
    pub fn unknown() -> Self {
        CertificateResult {
            status: CertificateStatus::Unknown,
            this_update: None,
            next_update: None,
        }
    }

    /// Returns true if the status is good
    pub fn is_good(&self) -> bool {
        self.status == CertificateStatus::Good
    }

    /// Returns true if the status is revoked
    pub fn is_revoked(&self) -> bool {
        matches!(self.status, CertificateStatus::Revoked(_))
    }
}

/// Outcome of applying policy to a [`CertificateResult`]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PolicyDecision {
    /// The result may be returned to the caller
    Accept(CertificateResult),
    /// Policy requires the result to be raised as an error
    Violation(PolicyViolation),
}

impl From<PolicyDecision> for Result<CertificateResult> {
    fn from(decision: PolicyDecision) -> Self {
        match decision {
            PolicyDecision::Accept(result) => Ok(result),
            PolicyDecision::Violation(violation) => Err(Error::Policy(violation)),
        }
    }
}

/// `enforce_policy` decides whether `result` may be returned to the caller given the
/// `raise_on_revoked` and `raise_on_unknown` settings. Good results are always accepted.
pub fn enforce_policy(result: &CertificateResult, settings: &OcspSettings) -> PolicyDecision {
    let kind = match result.status {
        CertificateStatus::Good => None,
        CertificateStatus::Revoked(_) if settings.raise_on_revoked => Some(ViolationKind::Revoked),
        CertificateStatus::Unknown if settings.raise_on_unknown => Some(ViolationKind::Unknown),
        _ => None,
    };
    match kind {
        Some(kind) => PolicyDecision::Violation(PolicyViolation {
            kind,
            result: *result,
        }),
        None => PolicyDecision::Accept(*result),
    }
}

/// `resolve` retrieves the result for `cert_id` from a verified response and applies policy to it.
///
/// [`OcspProtocolError::NoMatchingResponse`] is returned if the response does not cover `cert_id`.
/// A policy violation is returned as [`Error::Policy`], with the result available for inspection.
pub fn resolve(
    response: &VerifiedResponse,
    cert_id: &CertificateId,
    settings: &OcspSettings,
) -> Result<CertificateResult> {
    let result = match response.get(cert_id) {
        Some(result) => result,
        None => return Err(Error::Protocol(OcspProtocolError::NoMatchingResponse)),
    };
    enforce_policy(result, settings).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn revoked() -> CertificateResult {
        CertificateResult {
            status: CertificateStatus::Revoked(RevocationInfo {
                revoked_at: 1_600_000_000,
                reason: Some(CrlReason::KeyCompromise),
            }),
            this_update: Some(1_700_000_000),
            next_update: Some(1_700_086_400),
        }
    }

    fn good() -> CertificateResult {
        CertificateResult {
            status: CertificateStatus::Good,
            this_update: Some(1_700_000_000),
            next_update: None,
        }
    }

    #[test]
    fn good_always_accepted() {
        let mut settings = OcspSettings::default();
        assert_eq!(
            PolicyDecision::Accept(good()),
            enforce_policy(&good(), &settings)
        );
        settings.raise_on_revoked = false;
        settings.raise_on_unknown = false;
        assert_eq!(
            PolicyDecision::Accept(good()),
            enforce_policy(&good(), &settings)
        );
    }

    #[test]
    fn revoked_policy() {
        let mut settings = OcspSettings::default();
        let decision = enforce_policy(&revoked(), &settings);
        assert_eq!(
            PolicyDecision::Violation(PolicyViolation {
                kind: ViolationKind::Revoked,
                result: revoked()
            }),
            decision
        );
        // idempotent
        assert_eq!(decision, enforce_policy(&revoked(), &settings));

        let r: Result<CertificateResult> = decision.into();
        match r {
            Err(Error::Policy(v)) => {
                assert_eq!(ViolationKind::Revoked, v.kind);
                assert!(v.result.is_revoked());
            }
            _ => panic!("Expected policy violation"),
        }

        settings.raise_on_revoked = false;
        assert_eq!(
            PolicyDecision::Accept(revoked()),
            enforce_policy(&revoked(), &settings)
        );
    }

    #[test]
    fn unknown_policy() {
        let mut settings = OcspSettings::default();
        settings.raise_on_revoked = false;
        assert_eq!(
            PolicyDecision::Violation(PolicyViolation {
                kind: ViolationKind::Unknown,
                result: CertificateResult::unknown()
            }),
            enforce_policy(&CertificateResult::unknown(), &settings)
        );

        settings.raise_on_unknown = false;
        settings.raise_on_revoked = true;
        assert_eq!(
            PolicyDecision::Accept(CertificateResult::unknown()),
            enforce_policy(&CertificateResult::unknown(), &settings)
        );
    }
}
