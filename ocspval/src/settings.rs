//! Structures and functions related to configuring OCSP client operations
//!
//! An [`OcspSettings`] instance is handed to an [`OcspClient`](crate::OcspClient) when the client is
//! created and is not changed afterwards. Settings can be created in code, usually starting from
//! `OcspSettings::default()`, or deserialized from JSON:
//!
//! ```
//! use ocspval::OcspSettings;
//!
//! let settings = OcspSettings::from_json(r#"{"raise_on_unknown": false}"#).unwrap();
//! assert!(settings.nonce_enabled);
//! assert!(settings.raise_on_revoked);
//! assert!(!settings.raise_on_unknown);
//! ```

use std::fs;
use std::path::Path;

use log::error;
use serde::{Deserialize, Serialize};

use crate::revocation::cert_id::HashAlgorithm;
use crate::util::error::{Error, Result};

/// `OcspSettings` governs how the OCSP client locates responders, prepares requests and surfaces
/// revoked and unknown statuses.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OcspSettings {
    /// When set, requests are sent to this URI and the AIA extension of the target certificate is
    /// not consulted. By default, no override is set.
    pub override_responder_uri: Option<String>,

    /// When true, a freshly generated nonce is included in each request and the response must echo
    /// it. By default, this setting is set to true.
    pub nonce_enabled: bool,

    /// When true, a revoked status is returned as [`Error::Policy`]. By default, this setting is set
    /// to true.
    pub raise_on_revoked: bool,

    /// When true, an unknown status is returned as [`Error::Policy`]. By default, this setting is set
    /// to true.
    pub raise_on_unknown: bool,

    /// Hash algorithm used to prepare the CertID in requests. By default, SHA-1 is used, per the
    /// lightweight OCSP profile (RFC 5019).
    pub hash_algorithm: HashAlgorithm,
}

impl Default for OcspSettings {
    fn default() -> Self {
        OcspSettings {
            override_responder_uri: None,
            nonce_enabled: true,
            raise_on_revoked: true,
            raise_on_unknown: true,
            hash_algorithm: HashAlgorithm::Sha1,
        }
    }
}

impl OcspSettings {
    /// Creates a new [`OcspSettings`] with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// `from_json` parses settings from a JSON string. Absent fields take default values. Unknown
    /// fields cause [`Error::Misconfiguration`] to be returned.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            error!("Failed to parse OCSP settings with: {}", e);
            Error::Misconfiguration
        })
    }

    /// `from_json_file` reads settings from the JSON file at the given path.
    pub fn from_json_file(fname: &Path) -> Result<Self> {
        let json = fs::read_to_string(fname).map_err(|e| {
            error!("Failed to read OCSP settings from {:?} with: {}", fname, e);
            Error::Misconfiguration
        })?;
        Self::from_json(&json)
    }
}

#[test]
fn test_default_settings() {
    let settings = OcspSettings::default();
    assert_eq!(None, settings.override_responder_uri);
    assert!(settings.nonce_enabled);
    assert!(settings.raise_on_revoked);
    assert!(settings.raise_on_unknown);
    assert_eq!(HashAlgorithm::Sha1, settings.hash_algorithm);
    assert_eq!(settings, OcspSettings::new());
}

#[test]
fn test_settings_json() {
    let settings = OcspSettings::from_json(
        r#"{
            "override_responder_uri": "http://ocsp.example.com",
            "nonce_enabled": false,
            "hash_algorithm": "Sha256"
        }"#,
    )
    .unwrap();
    assert_eq!(
        Some("http://ocsp.example.com".to_string()),
        settings.override_responder_uri
    );
    assert!(!settings.nonce_enabled);
    assert!(settings.raise_on_revoked);
    assert!(settings.raise_on_unknown);
    assert_eq!(HashAlgorithm::Sha256, settings.hash_algorithm);

    let json = serde_json::to_string(&settings).unwrap();
    assert_eq!(settings, OcspSettings::from_json(&json).unwrap());
}

#[test]
fn test_settings_json_errors() {
    assert_eq!(
        Err(Error::Misconfiguration),
        OcspSettings::from_json(r#"{"raise_on_revoke": false}"#)
    );
    assert_eq!(
        Err(Error::Misconfiguration),
        OcspSettings::from_json("not json")
    );
    assert_eq!(
        Err(Error::Misconfiguration),
        OcspSettings::from_json_file(Path::new("tests/nonexistent/settings.json"))
    );
}

#[test]
fn test_settings_json_file() {
    use std::io::Write;

    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(br#"{"raise_on_revoked": false}"#).unwrap();
    let settings = OcspSettings::from_json_file(f.path()).unwrap();
    assert!(!settings.raise_on_revoked);
    assert!(settings.raise_on_unknown);
}
