// Copyright (c) 2023 The MobileCoin Foundation

//! Trust anchors terminating certificate paths.

use crate::x509::is_issuer_of;
use der::{Decode, DecodePem, Encode};
use x509_cert::Certificate;

/// A certificate treated as authoritative when building paths.
///
/// No name constraints are applied to the anchor and it's never itself
/// validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustAnchor {
    certificate: Certificate,
    der: Vec<u8>,
}

impl TrustAnchor {
    /// Try to get a trust anchor from a PEM encoded string.
    ///
    /// # Errors
    /// `der::Error` if the string is not a valid PEM certificate.
    pub fn try_from_pem(pem: impl AsRef<str>) -> der::Result<Self> {
        let certificate = Certificate::from_pem(pem.as_ref())?;
        Self::try_from(certificate)
    }

    /// Try to get a trust anchor from DER encoded bytes.
    ///
    /// # Errors
    /// `der::Error` if the bytes are not a valid DER certificate.
    pub fn try_from_der(der: impl AsRef<[u8]>) -> der::Result<Self> {
        let certificate = Certificate::from_der(der.as_ref())?;
        Self::try_from(certificate)
    }

    /// The anchor's certificate
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Is `certificate` issued by this anchor.
    pub fn is_issuer_of(&self, certificate: &Certificate) -> bool {
        is_issuer_of(&self.certificate, certificate)
    }
}

impl TryFrom<Certificate> for TrustAnchor {
    type Error = der::Error;

    fn try_from(certificate: Certificate) -> der::Result<Self> {
        let der = certificate.to_der()?;
        Ok(Self { certificate, der })
    }
}

/// The set of trust anchors of a validator, unique by encoded certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustAnchorSet {
    anchors: Vec<TrustAnchor>,
}

impl TrustAnchorSet {
    /// Build the set from PEM encoded certificates, in order.
    ///
    /// # Errors
    /// The index of the first entry that is not a valid PEM certificate,
    /// along with the decoding error.
    pub fn try_from_pems<'a>(
        pems: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, (usize, der::Error)> {
        let mut set = Self::default();
        for (index, pem) in pems.into_iter().enumerate() {
            let anchor = TrustAnchor::try_from_pem(pem).map_err(|e| (index, e))?;
            set.insert(anchor);
        }
        Ok(set)
    }

    /// Add `anchor` unless an identical certificate is already present.
    ///
    /// Returns `true` if the anchor was added.
    pub fn insert(&mut self, anchor: TrustAnchor) -> bool {
        if self.anchors.iter().any(|existing| existing.der == anchor.der) {
            return false;
        }
        self.anchors.push(anchor);
        true
    }

    /// Is `certificate` one of the anchors
    pub fn contains(&self, certificate: &Certificate) -> bool {
        self.anchors
            .iter()
            .any(|anchor| &anchor.certificate == certificate)
    }

    /// Iterate over the anchors in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &TrustAnchor> {
        self.anchors.iter()
    }

    /// The number of anchors
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Is the set empty
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}
