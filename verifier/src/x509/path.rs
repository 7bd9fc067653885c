// Copyright (c) 2023 The MobileCoin Foundation

//! Construction of certificate paths from a signer certificate up to a
//! configured trust anchor.
//!
//! This is a reduced form of the path validation in
//! [section 6](https://datatracker.ietf.org/doc/html/rfc5280#section-6) of
//! RFC5280: names are chained, signatures and validity periods are checked,
//! basic constraints and key usage of issuers are enforced. Revocation is
//! never checked.

use super::{DigestAlgorithm, DistinguishedName, Error, PublicKey, Result, Signature};
use crate::trust_anchor::TrustAnchorSet;
use const_oid::AssociatedOid;
use core::time::Duration;
use tracing::debug;
use x509_cert::der::{Decode, Encode};
use x509_cert::ext::pkix::{
    BasicConstraints, ExtendedKeyUsage, KeyUsage, KeyUsages, SubjectAltName, SubjectKeyIdentifier,
};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::Certificate;

/// Longest path, including the leaf, that will be searched for.
const MAX_PATH_LENGTH: usize = 10;

/// Most certificate signatures verified while building one path
const MAX_SIGNATURE_CHECKS: usize = 256;

/// Error building a certificate path
#[derive(displaydoc::Display, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// No certificate matches the signer identity
    SignerCertificateNotFound,
    /// No path from the signer certificate to a trust anchor
    NoPathToTrustAnchor,
}

/// The certificate a signer claims to have signed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignerIdentity {
    /// Identified by the issuer name and serial number of the certificate
    IssuerAndSerialNumber {
        /// Issuer of the signer's certificate
        issuer: Name,
        /// Serial number of the signer's certificate
        serial_number: SerialNumber,
    },
    /// Identified by the subject key identifier extension of the certificate
    SubjectKeyIdentifier(Vec<u8>),
}

impl SignerIdentity {
    /// Does `certificate` match this identity.
    pub fn matches(&self, certificate: &Certificate) -> bool {
        let tbs = &certificate.tbs_certificate;
        match self {
            SignerIdentity::IssuerAndSerialNumber {
                issuer,
                serial_number,
            } => {
                tbs.serial_number == *serial_number
                    && DistinguishedName::from(&tbs.issuer) == DistinguishedName::from(issuer)
            }
            SignerIdentity::SubjectKeyIdentifier(key_id) => {
                match extension::<SubjectKeyIdentifier>(certificate) {
                    Ok(Some(ski)) => ski.0.as_bytes() == key_id.as_slice(),
                    _ => false,
                }
            }
        }
    }
}

/// A path from a leaf certificate towards a trust anchor.
///
/// The first certificate is the leaf. The trust anchor that terminates the
/// path is not part of it, unless the leaf itself is a trust anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificatePath<'a> {
    certificates: Vec<&'a Certificate>,
}

impl<'a> CertificatePath<'a> {
    /// The leaf, or signing, certificate of the path
    pub fn leaf(&self) -> &'a Certificate {
        self.certificates[0]
    }

    /// All certificates of the path, leaf first
    pub fn certificates(&self) -> &[&'a Certificate] {
        &self.certificates
    }
}

/// Builds [`CertificatePath`]s out of a pool of candidate certificates.
#[derive(Debug)]
pub struct PathBuilder<'a> {
    trust_anchors: &'a TrustAnchorSet,
    pool: Vec<&'a Certificate>,
    unix_time: Duration,
}

impl<'a> PathBuilder<'a> {
    /// Create a builder terminating at `trust_anchors`.
    ///
    /// The trust anchor certificates are part of the candidate pool. Validity
    /// periods are evaluated at `unix_time`.
    pub fn new(trust_anchors: &'a TrustAnchorSet, unix_time: Duration) -> Self {
        let pool = trust_anchors
            .iter()
            .map(|anchor| anchor.certificate())
            .collect();
        Self {
            trust_anchors,
            pool,
            unix_time,
        }
    }

    /// Add untrusted `certificates` to the candidate pool
    pub fn with_certificates(
        mut self,
        certificates: impl IntoIterator<Item = &'a Certificate>,
    ) -> Self {
        self.pool.extend(certificates);
        self
    }

    /// Build a path for the certificate identified by `target`.
    ///
    /// Every candidate matching `target` is tried in pool order, the first
    /// one reaching a trust anchor wins.
    pub fn build(
        &self,
        target: &SignerIdentity,
    ) -> core::result::Result<CertificatePath<'a>, PathError> {
        let mut signature_checks = MAX_SIGNATURE_CHECKS;
        let mut found_target = false;
        for candidate in self.pool.iter().copied().filter(|cert| target.matches(cert)) {
            found_target = true;
            if self.trust_anchors.contains(candidate) {
                if let Err(error) = self.check_certificate(candidate) {
                    debug!(
                        subject = %candidate.tbs_certificate.subject,
                        %error,
                        "Rejecting trust anchor as leaf"
                    );
                    continue;
                }
                return Ok(CertificatePath {
                    certificates: vec![candidate],
                });
            }
            let mut certificates = vec![candidate];
            if self.extend(&mut certificates, candidate, &mut signature_checks) {
                return Ok(CertificatePath { certificates });
            }
        }

        if signature_checks == 0 {
            debug!(
                limit = MAX_SIGNATURE_CHECKS,
                "Gave up path building, signature check limit reached"
            );
        }
        Err(if found_target {
            PathError::NoPathToTrustAnchor
        } else {
            PathError::SignerCertificateNotFound
        })
    }

    /// Depth first extension of `path` whose last element is `current`.
    ///
    /// Every certificate signature verified counts against
    /// `signature_checks`.
    fn extend(
        &self,
        path: &mut Vec<&'a Certificate>,
        current: &'a Certificate,
        signature_checks: &mut usize,
    ) -> bool {
        if let Err(error) = self.check_certificate(current) {
            debug!(subject = %current.tbs_certificate.subject, %error, "Rejecting certificate");
            return false;
        }

        if self
            .trust_anchors
            .iter()
            .any(|anchor| issued_within(anchor.certificate(), current, signature_checks))
        {
            return true;
        }

        if path.len() >= MAX_PATH_LENGTH {
            return false;
        }

        for issuer in self.pool.iter().copied() {
            // Another copy of a subject and key already on the path can't
            // lead anywhere new
            if self.trust_anchors.contains(issuer)
                || path.iter().any(|cert| same_subject_and_key(cert, issuer))
            {
                continue;
            }
            // The number of intermediate certificates below `issuer`
            let intermediates = path.len() - 1;
            if !may_issue(issuer, intermediates)
                || !issued_within(issuer, current, signature_checks)
            {
                continue;
            }

            path.push(issuer);
            if self.extend(path, issuer, signature_checks) {
                return true;
            }
            path.pop();
        }
        false
    }

    fn check_certificate(&self, certificate: &Certificate) -> Result<()> {
        check_validity(certificate, self.unix_time)?;
        check_critical_extensions(certificate)
    }
}

/// Check that `unix_time` is within the validity period of `certificate`
pub fn check_validity(certificate: &Certificate, unix_time: Duration) -> Result<()> {
    let validity = &certificate.tbs_certificate.validity;
    if unix_time < validity.not_before.to_unix_duration() {
        Err(Error::CertificateNotYetValid)
    } else if unix_time > validity.not_after.to_unix_duration() {
        Err(Error::CertificateExpired)
    } else {
        Ok(())
    }
}

/// Verify the signature of `certificate` with the `key` of its issuer
pub fn verify_certificate_signature(certificate: &Certificate, key: &PublicKey) -> Result<()> {
    let algorithm = &certificate.signature_algorithm;
    let digest = DigestAlgorithm::try_from_signature_algorithm(algorithm)?;
    let signature_bytes = certificate
        .signature
        .as_bytes()
        .ok_or(Error::SignatureDecoding)?;
    let signature = Signature::try_from_algorithm_and_signature(algorithm, signature_bytes)?;
    let tbs_contents = certificate.tbs_certificate.to_der()?;
    key.verify(digest, &tbs_contents, &signature)
}

/// Has `issuer` issued `certificate`; names chain and the signature verifies.
pub(crate) fn is_issuer_of(issuer: &Certificate, certificate: &Certificate) -> bool {
    names_chain(issuer, certificate) && signed_by(issuer, certificate)
}

/// [`is_issuer_of`] while `signature_checks` remain, consuming one when the
/// names chain.
fn issued_within(
    issuer: &Certificate,
    certificate: &Certificate,
    signature_checks: &mut usize,
) -> bool {
    if !names_chain(issuer, certificate) || *signature_checks == 0 {
        return false;
    }
    *signature_checks -= 1;
    signed_by(issuer, certificate)
}

fn names_chain(issuer: &Certificate, certificate: &Certificate) -> bool {
    DistinguishedName::from(&issuer.tbs_certificate.subject)
        == DistinguishedName::from(&certificate.tbs_certificate.issuer)
}

fn signed_by(issuer: &Certificate, certificate: &Certificate) -> bool {
    PublicKey::try_from(&issuer.tbs_certificate.subject_public_key_info)
        .and_then(|key| verify_certificate_signature(certificate, &key))
        .is_ok()
}

fn same_subject_and_key(certificate: &Certificate, other: &Certificate) -> bool {
    let (tbs, other_tbs) = (&certificate.tbs_certificate, &other.tbs_certificate);
    tbs.subject_public_key_info == other_tbs.subject_public_key_info
        && DistinguishedName::from(&tbs.subject) == DistinguishedName::from(&other_tbs.subject)
}

/// May `issuer` act as a CA with `intermediates` certificates below it
fn may_issue(issuer: &Certificate, intermediates: usize) -> bool {
    let constraints = match extension::<BasicConstraints>(issuer) {
        Ok(Some(constraints)) if constraints.ca => constraints,
        _ => return false,
    };
    if let Some(path_len) = constraints.path_len_constraint {
        if intermediates > usize::from(path_len) {
            return false;
        }
    }
    match extension::<KeyUsage>(issuer) {
        Ok(Some(usage)) => usage.0.contains(KeyUsages::KeyCertSign),
        Ok(None) => true,
        Err(_) => false,
    }
}

fn check_critical_extensions(certificate: &Certificate) -> Result<()> {
    let understood = [
        BasicConstraints::OID,
        KeyUsage::OID,
        ExtendedKeyUsage::OID,
        SubjectAltName::OID,
    ];
    let unknown_critical = certificate
        .tbs_certificate
        .extensions
        .iter()
        .flatten()
        .find(|extension| extension.critical && !understood.contains(&extension.extn_id));
    match unknown_critical {
        Some(extension) => Err(Error::UnsupportedCriticalExtension(extension.extn_id)),
        None => Ok(()),
    }
}

/// Decode the extension `T` of `certificate` if present
fn extension<'a, T>(certificate: &'a Certificate) -> Result<Option<T>>
where
    T: AssociatedOid + Decode<'a>,
{
    certificate
        .tbs_certificate
        .extensions
        .iter()
        .flatten()
        .find(|extension| extension.extn_id == T::OID)
        .map(|extension| T::from_der(extension.extn_value.as_bytes()))
        .transpose()
        .map_err(Error::from)
}
