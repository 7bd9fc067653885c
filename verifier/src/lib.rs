// Copyright (c) 2023 The MobileCoin Foundation

#![doc = include_str!("../README.md")]
#![deny(missing_docs, missing_debug_implementations, unsafe_code)]

mod clock;
mod config;
mod error;
mod policy;
mod signed_message;
mod trust_anchor;
mod validator;
pub mod x509;

pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::config::{CertificateSource, ValidatorConfig};
pub use crate::error::{Cause, ConfigError, Error, PathError, Result};
pub use crate::policy::{CommonNameConstraint, SigningCertificateAllowList};
pub use crate::signed_message::{ParsedSignedMessage, SignerDescriptor, OID_SIGNED_DATA};
pub use crate::trust_anchor::{TrustAnchor, TrustAnchorSet};
pub use crate::validator::CmsSignatureValidator;

use core::fmt::Debug;
use std::io::Read;

/// Validates a signature over a stream of content.
///
/// Implementations exist per signature envelope format.
pub trait SignatureValidator: Debug {
    /// Validate `signature` over `content`.
    ///
    /// `content` is read to the end exactly once, whether validation
    /// succeeds or not.
    ///
    /// # Errors
    /// An [`Error`] naming why the content must not be trusted.
    fn validate(&self, signature: &[u8], content: &mut dyn Read) -> Result<()>;
}
