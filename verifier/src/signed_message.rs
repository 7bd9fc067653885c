// Copyright (c) 2023 The MobileCoin Foundation

//! Parsing of detached CMS `SignedData` as described in
//! [RFC5652](https://datatracker.ietf.org/doc/html/rfc5652#section-5).
//!
//! ```ignore
//!     SignedData ::= SEQUENCE {
//!         version CMSVersion,
//!         digestAlgorithms DigestAlgorithmIdentifiers,
//!         encapContentInfo EncapsulatedContentInfo,
//!         certificates [0] IMPLICIT CertificateSet OPTIONAL,
//!         crls [1] IMPLICIT RevocationInfoChoices OPTIONAL,
//!         signerInfos SignerInfos }
//! ```
//!
//! The signed content is not part of the structure, it's streamed in
//! separately and digested with every supported algorithm listed in
//! `digestAlgorithms`.

use crate::error::{Cause, Error, Result};
use crate::x509::{
    self, check_validity, DigestAlgorithm, Hasher, PublicKey, Signature, SignerIdentity,
};
use cms::cert::CertificateChoices;
use cms::content_info::ContentInfo;
use cms::signed_data::{SignedAttributes, SignedData, SignerIdentifier};
use const_oid::ObjectIdentifier;
use der::asn1::OctetString;
use der::{Any, Decode, Encode};
use std::io::{self, Read, Write};
use subtle::ConstantTimeEq;
use tracing::debug;
use x509_cert::spki::AlgorithmIdentifierOwned;
use x509_cert::time::Time;
use x509_cert::Certificate;

/// id-signedData
pub const OID_SIGNED_DATA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");
/// id-contentType
const OID_CONTENT_TYPE: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.3");
/// id-messageDigest
const OID_MESSAGE_DIGEST: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");
/// id-signingTime
const OID_SIGNING_TIME: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.5");

/// The parts of a signature needed for validation, along with the digests of
/// the content.
#[derive(Debug, Clone)]
pub struct ParsedSignedMessage {
    certificates: Vec<Certificate>,
    signers: Vec<SignerDescriptor>,
}

impl ParsedSignedMessage {
    /// Parse the DER `signature` and digest `content`.
    ///
    /// `content` is always read to the end, even when `signature` can't be
    /// parsed.
    ///
    /// # Errors
    /// `Error::GenericValidation` when `signature` is not a `SignedData`
    /// `ContentInfo` or `content` fails to be read.
    pub fn parse(signature: &[u8], content: &mut dyn Read) -> Result<Self> {
        let signed_data = match decode_signed_data(signature) {
            Ok(signed_data) => signed_data,
            Err(cause) => {
                if let Err(error) = io::copy(content, &mut io::sink()) {
                    debug!(%error, "Failed to drain content");
                }
                return Err(cause.into());
            }
        };

        let mut writer = DigestWriter::from_identifiers(signed_data.digest_algorithms.iter());
        let length = io::copy(content, &mut writer).map_err(Cause::from)?;
        debug!(length, "Digested content");
        let digests = writer.finalize();

        let certificates = signed_data
            .certificates
            .iter()
            .flat_map(|set| set.0.iter())
            .filter_map(|choice| match choice {
                CertificateChoices::Certificate(certificate) => Some(certificate.clone()),
                _ => None,
            })
            .collect();

        let econtent_type = signed_data.encap_content_info.econtent_type;
        let signers = signed_data
            .signer_infos
            .0
            .iter()
            .map(|info| {
                let content_digest = DigestAlgorithm::try_from(&info.digest_alg)
                    .ok()
                    .and_then(|algorithm| {
                        digests
                            .iter()
                            .find(|(digest_algorithm, _)| *digest_algorithm == algorithm)
                            .map(|(_, digest)| digest.clone())
                    });
                SignerDescriptor {
                    identity: SignerIdentity::from(&info.sid),
                    digest_algorithm: info.digest_alg.clone(),
                    signature_algorithm: info.signature_algorithm.clone(),
                    signature: info.signature.as_bytes().to_vec(),
                    signed_attributes: info.signed_attrs.clone(),
                    econtent_type,
                    content_digest,
                }
            })
            .collect();

        Ok(Self {
            certificates,
            signers,
        })
    }

    /// The certificates embedded in the signature
    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    /// The signers in encoded order
    pub fn signers(&self) -> &[SignerDescriptor] {
        &self.signers
    }

    /// The first signer, the only one that is validated
    pub fn first_signer(&self) -> Option<&SignerDescriptor> {
        self.signers.first()
    }
}

fn decode_signed_data(signature: &[u8]) -> core::result::Result<SignedData, Cause> {
    let content_info = ContentInfo::from_der(signature)?;
    if content_info.content_type != OID_SIGNED_DATA {
        return Err(Cause::NotSignedData(content_info.content_type));
    }
    Ok(content_info.content.decode_as::<SignedData>()?)
}

/// One signer of a message, bound to the content digest it needs.
#[derive(Debug, Clone)]
pub struct SignerDescriptor {
    identity: SignerIdentity,
    digest_algorithm: AlgorithmIdentifierOwned,
    signature_algorithm: AlgorithmIdentifierOwned,
    signature: Vec<u8>,
    signed_attributes: Option<SignedAttributes>,
    econtent_type: ObjectIdentifier,
    content_digest: Option<Vec<u8>>,
}

impl SignerDescriptor {
    /// The certificate the signer claims to have signed with
    pub fn identity(&self) -> &SignerIdentity {
        &self.identity
    }

    /// The declared digest algorithm
    pub fn digest_algorithm(&self) -> &AlgorithmIdentifierOwned {
        &self.digest_algorithm
    }

    /// The declared signature algorithm
    pub fn signature_algorithm(&self) -> &AlgorithmIdentifierOwned {
        &self.signature_algorithm
    }

    /// Verify the signature with the public key of `certificate`.
    ///
    /// Returns `Ok(false)` when the signature, or the digest it covers, does
    /// not match.
    ///
    /// # Errors
    /// `Error::GenericValidation` for unsupported algorithms, undecodable
    /// keys and malformed or inconsistent signed attributes.
    pub fn verify(&self, certificate: &Certificate) -> Result<bool> {
        let digest_algorithm = DigestAlgorithm::try_from(&self.digest_algorithm)?;
        let content_digest = self
            .content_digest
            .as_deref()
            .ok_or(Cause::NoContentDigest)?;
        let key = PublicKey::try_from(&certificate.tbs_certificate.subject_public_key_info)
            .map_err(|_| Cause::KeyDecoding)?;
        let signature = match Signature::try_from_algorithm_and_signature(
            &self.signature_algorithm,
            &self.signature,
        ) {
            Ok(signature) => signature,
            Err(x509::Error::SignatureDecoding) => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        let signed_digest = match &self.signed_attributes {
            None => content_digest.to_vec(),
            Some(attributes) => {
                let content_type =
                    required_attribute::<ObjectIdentifier>(attributes, OID_CONTENT_TYPE)?;
                if content_type != self.econtent_type {
                    return Err(Cause::ContentTypeMismatch.into());
                }

                let message_digest =
                    required_attribute::<OctetString>(attributes, OID_MESSAGE_DIGEST)?;
                if !bool::from(message_digest.as_bytes().ct_eq(content_digest)) {
                    debug!("Message digest attribute does not match the content");
                    return Ok(false);
                }

                if let Some(signing_time) = attribute::<Time>(attributes, OID_SIGNING_TIME)? {
                    check_validity(certificate, signing_time.to_unix_duration())
                        .map_err(|_| Cause::SignerNotValidAtSigningTime)?;
                }

                // Digested as an explicit `SET OF`, not the implicit `[0]`
                digest_algorithm.digest(&attributes.to_der()?)
            }
        };

        Ok(key
            .verify_digest(digest_algorithm, &signed_digest, &signature)
            .is_ok())
    }
}

impl From<&SignerIdentifier> for SignerIdentity {
    fn from(sid: &SignerIdentifier) -> Self {
        match sid {
            SignerIdentifier::IssuerAndSerialNumber(issuer_and_serial) => {
                SignerIdentity::IssuerAndSerialNumber {
                    issuer: issuer_and_serial.issuer.clone(),
                    serial_number: issuer_and_serial.serial_number.clone(),
                }
            }
            SignerIdentifier::SubjectKeyIdentifier(key_id) => {
                SignerIdentity::SubjectKeyIdentifier(key_id.0.as_bytes().to_vec())
            }
        }
    }
}

/// Decode the single value of the attribute `oid`, if present
fn attribute<T>(attributes: &SignedAttributes, oid: ObjectIdentifier) -> Result<Option<T>>
where
    T: for<'a> Decode<'a>,
{
    let Some(attribute) = attributes.iter().find(|attribute| attribute.oid == oid) else {
        return Ok(None);
    };
    let value: &Any = match attribute.values.get(0) {
        Some(value) if attribute.values.len() == 1 => value,
        _ => return Err(Cause::InvalidAttribute(oid).into()),
    };
    let bytes = value.to_der()?;
    T::from_der(&bytes)
        .map(Some)
        .map_err(|_| Cause::InvalidAttribute(oid).into())
}

fn required_attribute<T>(attributes: &SignedAttributes, oid: ObjectIdentifier) -> Result<T>
where
    T: for<'a> Decode<'a>,
{
    attribute(attributes, oid)?.ok_or_else(|| Error::from(Cause::InvalidAttribute(oid)))
}

/// Feeds written bytes into a set of digests
#[derive(Debug)]
struct DigestWriter {
    hashers: Vec<Hasher>,
}

impl DigestWriter {
    /// Unsupported algorithms are skipped, duplicates are digested once.
    fn from_identifiers<'a>(
        identifiers: impl IntoIterator<Item = &'a AlgorithmIdentifierOwned>,
    ) -> Self {
        let mut hashers: Vec<Hasher> = Vec::new();
        for identifier in identifiers {
            match DigestAlgorithm::try_from(identifier) {
                Ok(algorithm) => {
                    if !hashers.iter().any(|hasher| hasher.algorithm() == algorithm) {
                        hashers.push(algorithm.hasher());
                    }
                }
                Err(_) => debug!(oid = %identifier.oid, "Skipping unsupported digest algorithm"),
            }
        }
        Self { hashers }
    }

    fn finalize(self) -> Vec<(DigestAlgorithm, Vec<u8>)> {
        self.hashers
            .into_iter()
            .map(|hasher| (hasher.algorithm(), hasher.finalize()))
            .collect()
    }
}

impl Write for DigestWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for hasher in &mut self.hashers {
            hasher.update(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;
    use cms::signed_data::SignerInfos;
    use der::asn1::{SetOfVec, UtcTime};
    use der::{DateTime, DecodePem};
    use std::io::Cursor;
    use yare::parameterized;

    const SIGNER_P7S: &[u8] = include_bytes!("../data/tests/signer.p7s");
    const SIGNER_NO_ATTRIBUTES_P7S: &[u8] = include_bytes!("../data/tests/signer_no_attributes.p7s");
    const SIGNER_NO_CERTS_P7S: &[u8] = include_bytes!("../data/tests/signer_no_certs.p7s");
    const EC_SIGNER_P7S: &[u8] = include_bytes!("../data/tests/ec_signer.p7s");
    const CONTENT: &[u8] = include_bytes!("../data/tests/content.json");
    const SIGNER: &str = include_str!("../data/tests/signer.pem");
    const OTHER_SIGNER: &str = include_str!("../data/tests/other_signer.pem");
    const EC_SIGNER: &str = include_str!("../data/tests/ec_signer.pem");
    const INTERMEDIATE_CA: &str = include_str!("../data/tests/intermediate_ca.pem");

    const OID_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");
    const OID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");

    fn certificate(pem: &str) -> Certificate {
        Certificate::from_pem(pem).expect("Failed to decode certificate")
    }

    fn parse(signature: &[u8], content: &[u8]) -> ParsedSignedMessage {
        ParsedSignedMessage::parse(signature, &mut Cursor::new(content))
            .expect("Failed to parse signature")
    }

    /// Re-encode `signature` after `modify` has changed its `SignedData`
    fn modify_signed_data(signature: &[u8], modify: impl FnOnce(&mut SignedData)) -> Vec<u8> {
        let mut signed_data = decode_signed_data(signature).expect("Failed to decode");
        modify(&mut signed_data);
        let content_info = ContentInfo {
            content_type: OID_SIGNED_DATA,
            content: Any::encode_from(&signed_data).expect("Failed to encode signed data"),
        };
        content_info.to_der().expect("Failed to encode content info")
    }

    fn sha1() -> AlgorithmIdentifierOwned {
        AlgorithmIdentifierOwned {
            oid: OID_SHA1,
            parameters: None,
        }
    }

    #[test]
    fn parse_embedded_certificates_and_signer() {
        let message = parse(SIGNER_P7S, CONTENT);

        let signer = certificate(SIGNER);
        let intermediate = certificate(INTERMEDIATE_CA);
        assert_eq!(message.certificates().len(), 2);
        assert!(message.certificates().contains(&signer));
        assert!(message.certificates().contains(&intermediate));

        assert_eq!(message.signers().len(), 1);
        let descriptor = message.first_signer().expect("Missing signer");
        assert!(descriptor.identity().matches(&signer));
        assert!(!descriptor.identity().matches(&intermediate));
        assert_eq!(
            DigestAlgorithm::try_from(descriptor.digest_algorithm()),
            Ok(DigestAlgorithm::Sha256)
        );
    }

    #[test]
    fn signature_without_certificates() {
        let message = parse(SIGNER_NO_CERTS_P7S, CONTENT);
        assert!(message.certificates().is_empty());
        assert!(message.first_signer().is_some());
    }

    #[test]
    fn verify_with_signed_attributes() {
        let message = parse(SIGNER_P7S, CONTENT);
        let descriptor = message.first_signer().expect("Missing signer");
        assert_matches!(descriptor.verify(&certificate(SIGNER)), Ok(true));
    }

    #[test]
    fn verify_without_signed_attributes() {
        let message = parse(SIGNER_NO_ATTRIBUTES_P7S, CONTENT);
        let descriptor = message.first_signer().expect("Missing signer");
        assert_matches!(descriptor.verify(&certificate(SIGNER)), Ok(true));
    }

    #[test]
    fn verify_ecdsa_with_sha384() {
        let message = parse(EC_SIGNER_P7S, CONTENT);
        let descriptor = message.first_signer().expect("Missing signer");
        assert_eq!(
            DigestAlgorithm::try_from(descriptor.digest_algorithm()),
            Ok(DigestAlgorithm::Sha384)
        );
        assert_matches!(descriptor.verify(&certificate(EC_SIGNER)), Ok(true));
    }

    #[test]
    fn verify_with_changed_content_fails() {
        let mut content = CONTENT.to_vec();
        content[3] ^= 0x01;
        for signature in [SIGNER_P7S, SIGNER_NO_ATTRIBUTES_P7S] {
            let message = parse(signature, &content);
            let descriptor = message.first_signer().expect("Missing signer");
            assert_matches!(descriptor.verify(&certificate(SIGNER)), Ok(false));
        }
    }

    #[test]
    fn verify_with_another_key_fails() {
        let message = parse(SIGNER_P7S, CONTENT);
        let descriptor = message.first_signer().expect("Missing signer");
        assert_matches!(descriptor.verify(&certificate(OTHER_SIGNER)), Ok(false));
        // An EC key can not verify an RSA signature
        assert_matches!(descriptor.verify(&certificate(EC_SIGNER)), Ok(false));
    }

    #[test]
    fn garbage_signature_fails_and_drains_content() {
        let mut content = Cursor::new(CONTENT);
        let result = ParsedSignedMessage::parse(b"not a signature", &mut content);
        assert_matches!(result, Err(Error::GenericValidation(Cause::Der(_))));
        assert_eq!(content.position(), CONTENT.len() as u64);
    }

    #[test]
    fn content_info_of_other_type_fails() {
        let content_info = ContentInfo {
            content_type: OID_DATA,
            content: Any::encode_from(&OctetString::new(CONTENT).expect("Failed to build"))
                .expect("Failed to encode"),
        };
        let signature = content_info.to_der().expect("Failed to encode");
        let mut content = Cursor::new(CONTENT);

        let result = ParsedSignedMessage::parse(&signature, &mut content);

        assert_matches!(
            result,
            Err(Error::GenericValidation(Cause::NotSignedData(oid))) if oid == OID_DATA
        );
        assert_eq!(content.position(), CONTENT.len() as u64);
    }

    #[test]
    fn empty_signer_infos() {
        let signature = modify_signed_data(SIGNER_P7S, |signed_data| {
            signed_data.signer_infos = SignerInfos(SetOfVec::new());
        });
        let message = parse(&signature, CONTENT);
        assert!(message.first_signer().is_none());
        assert_eq!(message.certificates().len(), 2);
    }

    #[test]
    fn unsupported_signer_digest_algorithm() {
        let signature = modify_signed_data(SIGNER_P7S, |signed_data| {
            let mut infos = signed_data.signer_infos.0.iter().cloned().collect::<Vec<_>>();
            infos[0].digest_alg = sha1();
            signed_data.signer_infos =
                SignerInfos(SetOfVec::try_from(infos).expect("Failed to build signer infos"));
        });
        let message = parse(&signature, CONTENT);
        let descriptor = message.first_signer().expect("Missing signer");
        assert_matches!(
            descriptor.verify(&certificate(SIGNER)),
            Err(Error::GenericValidation(Cause::UnsupportedAlgorithm(oid))) if oid == OID_SHA1
        );
    }

    #[test]
    fn signer_digest_algorithm_not_declared() {
        // Only SHA-1 is declared, so no content digest is computed for the
        // signer's SHA-256
        let signature = modify_signed_data(SIGNER_P7S, |signed_data| {
            signed_data.digest_algorithms =
                SetOfVec::try_from(vec![sha1()]).expect("Failed to build digest algorithms");
        });
        let message = parse(&signature, CONTENT);
        let descriptor = message.first_signer().expect("Missing signer");
        assert_matches!(
            descriptor.verify(&certificate(SIGNER)),
            Err(Error::GenericValidation(Cause::NoContentDigest))
        );
    }

    #[test]
    fn content_type_attribute_mismatch() {
        let signature = modify_signed_data(SIGNER_P7S, |signed_data| {
            signed_data.encap_content_info.econtent_type = OID_SIGNED_DATA;
        });
        let message = parse(&signature, CONTENT);
        let descriptor = message.first_signer().expect("Missing signer");
        assert_matches!(
            descriptor.verify(&certificate(SIGNER)),
            Err(Error::GenericValidation(Cause::ContentTypeMismatch))
        );
    }

    #[test]
    fn missing_message_digest_attribute() {
        let signature = modify_signed_data(SIGNER_P7S, |signed_data| {
            let mut infos = signed_data.signer_infos.0.iter().cloned().collect::<Vec<_>>();
            let attributes = infos[0]
                .signed_attrs
                .as_ref()
                .expect("Missing signed attributes")
                .iter()
                .filter(|attribute| attribute.oid != OID_MESSAGE_DIGEST)
                .cloned()
                .collect::<Vec<_>>();
            infos[0].signed_attrs =
                Some(SetOfVec::try_from(attributes).expect("Failed to build attributes"));
            signed_data.signer_infos =
                SignerInfos(SetOfVec::try_from(infos).expect("Failed to build signer infos"));
        });
        let message = parse(&signature, CONTENT);
        let descriptor = message.first_signer().expect("Missing signer");
        assert_matches!(
            descriptor.verify(&certificate(SIGNER)),
            Err(Error::GenericValidation(Cause::InvalidAttribute(oid))) if oid == OID_MESSAGE_DIGEST
        );
    }

    /// Replace the signing-time attribute with the start of `year`
    fn with_signing_time(signature: &[u8], year: u16) -> Vec<u8> {
        let date_time = DateTime::new(year, 1, 1, 0, 0, 0).expect("Invalid date");
        let signing_time =
            Time::UtcTime(UtcTime::from_date_time(date_time).expect("Invalid UTC time"));
        let value = Any::encode_from(&signing_time).expect("Failed to encode signing time");
        modify_signed_data(signature, |signed_data| {
            let mut infos = signed_data.signer_infos.0.iter().cloned().collect::<Vec<_>>();
            let attributes = infos[0]
                .signed_attrs
                .as_ref()
                .expect("Missing signed attributes")
                .iter()
                .cloned()
                .map(|mut attribute| {
                    if attribute.oid == OID_SIGNING_TIME {
                        attribute.values = SetOfVec::try_from(vec![value.clone()])
                            .expect("Failed to build attribute values");
                    }
                    attribute
                })
                .collect::<Vec<_>>();
            infos[0].signed_attrs =
                Some(SetOfVec::try_from(attributes).expect("Failed to build attributes"));
            signed_data.signer_infos =
                SignerInfos(SetOfVec::try_from(infos).expect("Failed to build signer infos"));
        })
    }

    #[parameterized(
        before_not_before = { 2024 },
        after_not_after = { 2031 },
    )]
    fn signing_time_outside_signer_validity(year: u16) {
        let signature = with_signing_time(SIGNER_P7S, year);
        let message = parse(&signature, CONTENT);
        let descriptor = message.first_signer().expect("Missing signer");
        assert_matches!(
            descriptor.verify(&certificate(SIGNER)),
            Err(Error::GenericValidation(Cause::SignerNotValidAtSigningTime))
        );
    }

    #[test]
    fn signing_time_within_signer_validity_reaches_signature_check() {
        // The changed attribute no longer matches what was signed
        let signature = with_signing_time(SIGNER_P7S, 2028);
        let message = parse(&signature, CONTENT);
        let descriptor = message.first_signer().expect("Missing signer");
        assert_matches!(descriptor.verify(&certificate(SIGNER)), Ok(false));
    }

    #[test]
    fn malformed_rsa_signature_does_not_match() {
        let signature = modify_signed_data(SIGNER_P7S, |signed_data| {
            let mut infos = signed_data.signer_infos.0.iter().cloned().collect::<Vec<_>>();
            infos[0].signature = OctetString::new(vec![0x01, 0x02]).expect("Failed to build");
            signed_data.signer_infos =
                SignerInfos(SetOfVec::try_from(infos).expect("Failed to build signer infos"));
        });
        let message = parse(&signature, CONTENT);
        let descriptor = message.first_signer().expect("Missing signer");
        assert_matches!(descriptor.verify(&certificate(SIGNER)), Ok(false));
    }

    #[test]
    fn digest_writer_skips_unsupported_and_duplicates() {
        let sha256 = AlgorithmIdentifierOwned {
            oid: DigestAlgorithm::Sha256.oid(),
            parameters: None,
        };
        let identifiers = [sha256.clone(), sha1(), sha256];
        let mut writer = DigestWriter::from_identifiers(identifiers.iter());
        writer.write_all(CONTENT).expect("Failed to write");
        let digests = writer.finalize();
        assert_eq!(
            digests,
            vec![(DigestAlgorithm::Sha256, DigestAlgorithm::Sha256.digest(CONTENT))]
        );
    }
}
