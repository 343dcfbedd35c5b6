#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

mod args;

use core::time::Duration;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use log::{debug, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use x509_cert::Certificate;

use ocspval::{
    check_response_time, parse_cert_buffer, CertificateResult, CertificateStatus, Error,
    HttpTransport, OcspClient, OcspSettings,
};

use crate::args::OcspCheckArgs;

fn configure_logging(args: &OcspCheckArgs) {
    if let Some(logging_config) = &args.logging_config {
        if let Err(e) = log4rs::init_file(logging_config, Default::default()) {
            println!(
                "ERROR: failed to configure logging using {} with {:?}. Continuing without logging.",
                logging_config, e
            );
        }
        return;
    }

    // if there's no config, prepare one using stdout
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{m}{n}")))
        .build();
    match Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))
    {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                println!(
                    "ERROR: failed to configure logging for stdout with {:?}. Continuing without logging.",
                    e
                );
            }
        }
        Err(e) => {
            println!("ERROR: failed to prepare default logging configuration with {:?}. Continuing without logging", e);
        }
    }
}

fn read_cert(fname: &str) -> Result<Certificate, String> {
    let buf = fs::read(fname).map_err(|e| format!("failed to read {}: {}", fname, e))?;
    parse_cert_buffer(&buf).map_err(|e| format!("failed to parse {}: {}", fname, e))
}

fn prepare_settings(args: &OcspCheckArgs) -> Result<OcspSettings, String> {
    let mut settings = match &args.settings {
        Some(fname) => OcspSettings::from_json_file(Path::new(fname))
            .map_err(|e| format!("failed to load settings from {}: {}", fname, e))?,
        None => OcspSettings::default(),
    };
    if args.uri.is_some() {
        settings.override_responder_uri = args.uri.clone();
    }
    if args.no_nonce {
        settings.nonce_enabled = false;
    }
    if args.allow_revoked {
        settings.raise_on_revoked = false;
    }
    if args.allow_unknown {
        settings.raise_on_unknown = false;
    }
    Ok(settings)
}

fn describe(result: &CertificateResult) -> String {
    let status = match result.status {
        CertificateStatus::Good => "good".to_string(),
        CertificateStatus::Revoked(info) => match info.reason {
            Some(reason) => format!("revoked at {} ({:?})", info.revoked_at, reason),
            None => format!("revoked at {}", info.revoked_at),
        },
        CertificateStatus::Unknown => "unknown".to_string(),
    };
    match (result.this_update, result.next_update) {
        (Some(tu), Some(nu)) => format!("{} (thisUpdate: {}, nextUpdate: {})", status, tu, nu),
        (Some(tu), None) => format!("{} (thisUpdate: {})", status, tu),
        _ => status,
    }
}

async fn run(args: &OcspCheckArgs) -> Result<CertificateResult, String> {
    let cert = read_cert(&args.cert)?;
    let issuer = match &args.issuer {
        Some(fname) => Some(read_cert(fname)?),
        None => None,
    };
    let settings = prepare_settings(args)?;

    let transport = HttpTransport::with_timeout(Duration::from_secs(args.timeout))
        .map_err(|e| e.to_string())?;
    let client = OcspClient::with_transport(settings, transport);

    let result = match client.verify_with_issuer(&cert, issuer.as_ref()).await {
        Ok(result) => result,
        Err(Error::Policy(violation)) => {
            return Err(format!(
                "{}: {}",
                violation.kind,
                describe(&violation.result)
            ))
        }
        Err(e) => return Err(e.to_string()),
    };

    if result.this_update.is_some() && !check_response_time(&result, args.time_of_interest) {
        return Err(format!(
            "response is not fresh at {}: {}",
            args.time_of_interest,
            describe(&result)
        ));
    }
    Ok(result)
}

/// Point of entry for ocspcheck application.
#[tokio::main]
async fn main() -> ExitCode {
    let args = OcspCheckArgs::parse();
    configure_logging(&args);
    debug!("ocspcheck start");

    let code = match run(&args).await {
        Ok(result) => {
            println!("Status: {}", describe(&result));
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("ERROR: {}", e);
            ExitCode::FAILURE
        }
    };

    debug!("ocspcheck end");
    code
}
