// Copyright (c) 2023 The MobileCoin Foundation

//! Restrictions on which signing certificates are accepted.

use crate::config::CertificateSource;
use crate::error::ConfigError;
use crate::x509::DistinguishedName;
use core::time::Duration;
use der::Encode;
use subtle::{Choice, ConstantTimeEq};
use x509_cert::Certificate;

#[derive(Debug, Clone, PartialEq, Eq)]
struct AllowedCertificate {
    certificate: Certificate,
    der: Vec<u8>,
}

/// The certificates a message may be signed with.
///
/// An empty list allows any certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigningCertificateAllowList {
    entries: Vec<AllowedCertificate>,
}

impl SigningCertificateAllowList {
    /// Decode every source into the allow list.
    ///
    /// # Errors
    /// `ConfigError::SigningCertificate` for the first source that can't be
    /// decoded.
    pub fn try_from_sources<'a>(
        sources: impl IntoIterator<Item = &'a CertificateSource>,
    ) -> Result<Self, ConfigError> {
        let entries = sources
            .into_iter()
            .enumerate()
            .map(|(index, source)| {
                let to_error = |source| ConfigError::SigningCertificate { index, source };
                let certificate = source.to_certificate().map_err(to_error)?;
                let der = certificate.to_der().map_err(to_error)?;
                Ok(AllowedCertificate { certificate, der })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self { entries })
    }

    /// Is the allow list in effect
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Is at least one entry not expired at `unix_time`.
    ///
    /// Only the end of the validity period is considered.
    pub fn any_unexpired(&self, unix_time: Duration) -> bool {
        self.entries.iter().any(|entry| {
            unix_time
                <= entry
                    .certificate
                    .tbs_certificate
                    .validity
                    .not_after
                    .to_unix_duration()
        })
    }

    /// Is `certificate` byte for byte one of the entries.
    ///
    /// # Errors
    /// `der::Error` if `certificate` can't be encoded.
    pub fn contains(&self, certificate: &Certificate) -> der::Result<bool> {
        let der = certificate.to_der()?;
        let found = self
            .entries
            .iter()
            .fold(Choice::from(0), |found, entry| found | entry.der.ct_eq(&der));
        Ok(found.into())
    }
}

/// Requires a common name of the signing certificate to end with a suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonNameConstraint(String);

impl CommonNameConstraint {
    /// Create a constraint requiring `suffix`
    pub fn new(suffix: impl Into<String>) -> Self {
        Self(suffix.into())
    }

    /// The required suffix
    pub fn suffix(&self) -> &str {
        &self.0
    }

    /// Does any common name of the subject of `certificate` end with the
    /// suffix. The comparison is case sensitive.
    pub fn matches(&self, certificate: &Certificate) -> bool {
        DistinguishedName::from(&certificate.tbs_certificate.subject)
            .common_names()
            .any(|common_name| common_name.ends_with(&self.0))
    }
}
