// Copyright (c) 2023 The MobileCoin Foundation

//! Errors that can occur during construction and validation

pub use crate::x509::PathError;

use crate::x509;
use const_oid::ObjectIdentifier;

/// Result of a signature validation
pub type Result<T> = core::result::Result<T, Error>;

/// Why a signature was rejected.
///
/// Every kind means the content must not be trusted, the distinction is
/// only useful for diagnostics.
#[derive(displaydoc::Display, Debug)]
pub enum Error {
    /// No signing certificate found
    NoSigner,
    /// Expired certificate
    ExpiredConfiguredCertificate,
    /// The cert path cannot be validated: {0}
    CertPathBuildFailure(PathError),
    /// Signing certificate does not match expected certificate
    SigningCertificateMismatch,
    /// Signing certificate does not match expected CN
    CnMismatch,
    /// The signature does not match
    SignatureMismatch,
    /// Error validating signature: {0}
    GenericValidation(Cause),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::CertPathBuildFailure(e) => Some(e),
            Error::GenericValidation(cause) => Some(cause),
            _ => None,
        }
    }
}

impl std::error::Error for PathError {}

/// Underlying failure of a [`Error::GenericValidation`]
#[derive(displaydoc::Display, Debug)]
pub enum Cause {
    /// Error decoding DER {0}
    Der(der::Error),
    /// Error reading the content stream: {0}
    Io(std::io::Error),
    /// The content type {0} is not signed data
    NotSignedData(ObjectIdentifier),
    /// Unsupported algorithm {0}
    UnsupportedAlgorithm(ObjectIdentifier),
    /// The signed attribute {0} is missing or malformed
    InvalidAttribute(ObjectIdentifier),
    /// The signed content type does not match the encapsulated content type
    ContentTypeMismatch,
    /// No digest of the content was computed for the signer's digest algorithm
    NoContentDigest,
    /// The signing certificate was not valid at the signing time
    SignerNotValidAtSigningTime,
    /// Error decoding the key of the signing certificate
    KeyDecoding,
    /// Error processing the signing certificate: {0}
    Certificate(x509::Error),
}

impl std::error::Error for Cause {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Cause::Der(e) => Some(e),
            Cause::Io(e) => Some(e),
            Cause::Certificate(e) => Some(e),
            _ => None,
        }
    }
}

impl From<der::Error> for Cause {
    fn from(e: der::Error) -> Self {
        Cause::Der(e)
    }
}

impl From<std::io::Error> for Cause {
    fn from(e: std::io::Error) -> Self {
        Cause::Io(e)
    }
}

impl From<Cause> for Error {
    fn from(cause: Cause) -> Self {
        Error::GenericValidation(cause)
    }
}

impl From<der::Error> for Error {
    fn from(e: der::Error) -> Self {
        Cause::from(e).into()
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Cause::from(e).into()
    }
}

impl From<PathError> for Error {
    fn from(e: PathError) -> Self {
        Error::CertPathBuildFailure(e)
    }
}

/// Certificate level failures surfacing from signer verification.
///
/// A non verifying signature is not an error at this level, it's reported
/// as a `false` verification result.
impl From<x509::Error> for Error {
    fn from(e: x509::Error) -> Self {
        let cause = match e {
            x509::Error::CertificateDecoding(e) => Cause::Der(e),
            x509::Error::UnsupportedAlgorithm(oid) => Cause::UnsupportedAlgorithm(oid),
            x509::Error::KeyDecoding => Cause::KeyDecoding,
            other => Cause::Certificate(other),
        };
        Error::GenericValidation(cause)
    }
}

/// Error constructing a validator from its configuration
#[derive(displaydoc::Display, Debug)]
pub enum ConfigError {
    /// Trust anchor {index} is not a valid PEM certificate: {source}
    #[allow(missing_docs)]
    TrustAnchor { index: usize, source: der::Error },
    /// Signing certificate {index} can not be decoded: {source}
    #[allow(missing_docs)]
    SigningCertificate { index: usize, source: der::Error },
    /// Error parsing the configuration JSON: {0}
    Serde(serde_json::Error),
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::TrustAnchor { source, .. } => Some(source),
            ConfigError::SigningCertificate { source, .. } => Some(source),
            ConfigError::Serde(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Serde(e)
    }
}
