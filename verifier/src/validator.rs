// Copyright (c) 2023 The MobileCoin Foundation

//! Validation of detached CMS signatures.

use crate::clock::{Clock, SystemClock};
use crate::config::ValidatorConfig;
use crate::error::{ConfigError, Error, Result};
use crate::policy::{CommonNameConstraint, SigningCertificateAllowList};
use crate::signed_message::ParsedSignedMessage;
use crate::trust_anchor::TrustAnchorSet;
use crate::x509::PathBuilder;
use crate::SignatureValidator;
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, warn};

/// Validates detached CMS `SignedData` signatures.
///
/// The configuration is fixed at construction, so one instance can be
/// shared between threads.
#[derive(Debug, Clone)]
pub struct CmsSignatureValidator {
    trust_anchors: TrustAnchorSet,
    allow_list: SigningCertificateAllowList,
    cn_constraint: Option<CommonNameConstraint>,
    clock: Arc<dyn Clock>,
}

impl CmsSignatureValidator {
    /// Create a validator from `config`.
    ///
    /// # Errors
    /// `ConfigError` when a trust anchor or signing certificate can not be
    /// decoded.
    pub fn new(config: ValidatorConfig) -> core::result::Result<Self, ConfigError> {
        let trust_anchors =
            TrustAnchorSet::try_from_pems(config.trust_anchors.iter().map(String::as_str))
                .map_err(|(index, source)| ConfigError::TrustAnchor { index, source })?;
        let allow_list =
            SigningCertificateAllowList::try_from_sources(&config.signing_certificates)?;
        let cn_constraint = config.cn_suffix.map(CommonNameConstraint::new);
        let clock = config.clock.unwrap_or_else(|| Arc::new(SystemClock));

        debug!(
            trust_anchors = trust_anchors.len(),
            signing_certificates = config.signing_certificates.len(),
            cn_suffix = ?cn_constraint.as_ref().map(CommonNameConstraint::suffix),
            "Created CMS signature validator"
        );

        Ok(Self {
            trust_anchors,
            allow_list,
            cn_constraint,
            clock,
        })
    }

    fn validate_message(&self, signature: &[u8], content: &mut dyn Read) -> Result<()> {
        let message = ParsedSignedMessage::parse(signature, content)?;

        let signer = message.first_signer().ok_or(Error::NoSigner)?;
        debug!(
            signers = message.signers().len(),
            certificates = message.certificates().len(),
            "Parsed signed message"
        );
        let now = self.clock.now();

        if !self.allow_list.is_empty() {
            let unexpired = self.allow_list.any_unexpired(now);
            debug!(unexpired, "Checked expiry of configured signing certificates");
            if !unexpired {
                return Err(Error::ExpiredConfiguredCertificate);
            }
        }

        let path = PathBuilder::new(&self.trust_anchors, now)
            .with_certificates(message.certificates())
            .build(signer.identity())?;
        let leaf = path.leaf();
        debug!(
            subject = %leaf.tbs_certificate.subject,
            serial = %hex::encode(leaf.tbs_certificate.serial_number.as_bytes()),
            length = path.certificates().len(),
            "Built certificate path"
        );

        if !self.allow_list.is_empty() {
            let allowed = self.allow_list.contains(leaf)?;
            debug!(allowed, "Matched signing certificate against configured certificates");
            if !allowed {
                return Err(Error::SigningCertificateMismatch);
            }
        }

        if let Some(constraint) = &self.cn_constraint {
            let matches = constraint.matches(leaf);
            debug!(suffix = constraint.suffix(), matches, "Matched common name");
            if !matches {
                return Err(Error::CnMismatch);
            }
        }

        let verified = signer.verify(leaf)?;
        debug!(verified, "Verified signature");
        if !verified {
            return Err(Error::SignatureMismatch);
        }
        Ok(())
    }
}

impl SignatureValidator for CmsSignatureValidator {
    fn validate(&self, signature: &[u8], content: &mut dyn Read) -> Result<()> {
        let result = self.validate_message(signature, content);
        match &result {
            Ok(()) => debug!("Signature is valid"),
            Err(error) => warn!(%error, "Rejected signature"),
        }
        result
    }
}
