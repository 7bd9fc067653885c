// Copyright (c) 2023 The MobileCoin Foundation

//! Configuration of a [`crate::CmsSignatureValidator`].

use crate::clock::Clock;
use crate::error::ConfigError;
use der::{Decode, DecodePem};
use serde::Deserialize;
use std::sync::Arc;
use x509_cert::Certificate;

/// A certificate as provided in the configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CertificateSource {
    /// PEM encoded certificate text
    Pem(String),
    /// DER encoded certificate bytes, hex in JSON
    Der(#[serde(with = "hex")] Vec<u8>),
    /// An already decoded certificate
    #[serde(skip)]
    Certificate(Certificate),
}

impl CertificateSource {
    /// Decode the certificate
    ///
    /// # Errors
    /// `der::Error` if the PEM or DER can not be decoded.
    pub fn to_certificate(&self) -> der::Result<Certificate> {
        match self {
            CertificateSource::Pem(pem) => Certificate::from_pem(pem),
            CertificateSource::Der(der) => Certificate::from_der(der),
            CertificateSource::Certificate(certificate) => Ok(certificate.clone()),
        }
    }
}

impl From<Certificate> for CertificateSource {
    fn from(certificate: Certificate) -> Self {
        CertificateSource::Certificate(certificate)
    }
}

/// All settings of a validator, fixed once the validator is constructed.
///
/// ```
/// use cms_signature_verifier::ValidatorConfig;
///
/// let json = r#"{"trustAnchors": [], "cnSuffix": ".example.nl"}"#;
/// let config = ValidatorConfig::try_from(json).expect("Invalid configuration");
/// assert_eq!(config.cn_suffix.as_deref(), Some(".example.nl"));
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidatorConfig {
    /// PEM encoded certificates terminating certificate paths
    pub trust_anchors: Vec<String>,
    /// When not empty, the signing certificate must be one of these
    pub signing_certificates: Vec<CertificateSource>,
    /// When present, a common name of the signing certificate must end
    /// with this
    pub cn_suffix: Option<String>,
    /// Time source, the system clock when absent
    #[serde(skip)]
    pub clock: Option<Arc<dyn Clock>>,
}

impl ValidatorConfig {
    /// Create a configuration trusting `trust_anchors`, PEM encoded
    pub fn new<S: Into<String>>(trust_anchors: impl IntoIterator<Item = S>) -> Self {
        Self {
            trust_anchors: trust_anchors.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Add `pem` to the trust anchors
    pub fn with_trust_anchor(mut self, pem: impl Into<String>) -> Self {
        self.trust_anchors.push(pem.into());
        self
    }

    /// Add `certificate` to the allowed signing certificates
    pub fn with_signing_certificate(mut self, certificate: impl Into<CertificateSource>) -> Self {
        self.signing_certificates.push(certificate.into());
        self
    }

    /// Require a common name of the signing certificate to end with `suffix`
    pub fn with_cn_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.cn_suffix = Some(suffix.into());
        self
    }

    /// Use `clock` for expiry evaluation
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }
}

impl TryFrom<&str> for ValidatorConfig {
    type Error = ConfigError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let config: ValidatorConfig = serde_json::from_str(value)?;
        Ok(config)
    }
}
