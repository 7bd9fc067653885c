// Copyright (c) 2023 The MobileCoin Foundation

use const_oid::ObjectIdentifier;

/// Error type for decoding and verifying certificates.
#[derive(Debug, displaydoc::Display, PartialEq, Eq)]
pub enum Error {
    /// An error occurred decoding the signature
    SignatureDecoding,
    /// The signature does not match with the verifying key
    SignatureVerification,
    /// The certificate has expired
    CertificateExpired,
    /// An error occurred decoding the certificate: {0}
    CertificateDecoding(x509_cert::der::Error),
    /// The certificate is not yet valid
    CertificateNotYetValid,
    /// An error occurred decoding the key from a certificate
    KeyDecoding,
    /// Unsupported algorithm {0}
    UnsupportedAlgorithm(ObjectIdentifier),
    /// Unsupported critical extension {0}
    UnsupportedCriticalExtension(ObjectIdentifier),
}

impl From<x509_cert::der::Error> for Error {
    fn from(src: x509_cert::der::Error) -> Self {
        Error::CertificateDecoding(src)
    }
}

impl std::error::Error for Error {}
