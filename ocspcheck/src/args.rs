//! Arguments for the ocspcheck utility

use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;

/// get_now_as_unix_epoch returns the current time as seconds since Unix epoch
pub fn get_now_as_unix_epoch() -> u64 {
    if let Ok(n) = SystemTime::now().duration_since(UNIX_EPOCH) {
        n.as_secs()
    } else {
        0
    }
}

/// Determine the OCSP status of an X.509 certificate
#[derive(Parser, Debug, Default)]
#[command(arg_required_else_help(true))]
#[clap(author, version, about, long_about = None)]
pub struct OcspCheckArgs {
    /// Full path and filename of a binary DER-encoded or PEM-encoded certificate to check.
    #[clap(short, long, help_heading = "TARGET")]
    pub cert: String,

    /// Full path and filename of a binary DER-encoded or PEM-encoded certificate of the CA that
    /// issued the certificate to check. If absent, the issuer is retrieved from the CA Issuers
    /// location in the certificate's AIA extension.
    #[clap(short, long, help_heading = "TARGET")]
    pub issuer: Option<String>,

    /// URI of an OCSP responder to use instead of the one found in the certificate's AIA extension.
    #[clap(short, long, help_heading = "OCSP OPTIONS")]
    pub uri: Option<String>,

    /// Flag that indicates no nonce should be included in the request.
    #[clap(long, help_heading = "OCSP OPTIONS")]
    pub no_nonce: bool,

    /// Flag that indicates a revoked status should not be treated as a failure.
    #[clap(long, help_heading = "OCSP OPTIONS")]
    pub allow_revoked: bool,

    /// Flag that indicates an unknown status should not be treated as a failure.
    #[clap(long, help_heading = "OCSP OPTIONS")]
    pub allow_unknown: bool,

    /// Full path and filename of a JSON file containing OCSP settings. Flags given on the command
    /// line are applied on top of the settings read from the file.
    #[clap(short, long, help_heading = "OCSP OPTIONS")]
    pub settings: Option<String>,

    /// Number of seconds to wait for a server before giving up.
    #[clap(short, long, default_value_t = 10, help_heading = "OCSP OPTIONS")]
    pub timeout: u64,

    /// Time used to check that a response is fresh, expressed as the number of seconds since Unix
    /// epoch (defaults to current system time). Pass 0 to skip the check.
    #[clap(long, default_value_t = get_now_as_unix_epoch(), help_heading = "OCSP OPTIONS")]
    pub time_of_interest: u64,

    /// Full path and filename of YAML-formatted configuration file for log4rs logging mechanism.
    /// See <https://docs.rs/log4rs/latest/log4rs/> for details.
    #[clap(short, long, help_heading = "COMMON OPTIONS")]
    pub logging_config: Option<String>,
}
