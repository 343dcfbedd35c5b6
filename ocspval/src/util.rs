//! Basic utility functionality supporting OCSP request preparation and response verification

pub mod alg_oids;
pub mod cert_utils;
pub mod crypto;
pub mod error;

pub use crate::{util::alg_oids::*, util::cert_utils::*, util::crypto::*, util::error::*};
