// Copyright (c) 2023 The MobileCoin Foundation

use cms::content_info::ContentInfo;
use cms::signed_data::{SignedData, SignerInfos};
use cms_signature_verifier::{
    CmsSignatureValidator, FixedClock, SignatureValidator, ValidatorConfig, OID_SIGNED_DATA,
};
use der::asn1::SetOfVec;
use der::{Any, DateTime, Decode, Encode};
use std::io::Cursor;

pub const ROOT_CA_1: &str = include_str!("../../data/tests/root_ca_1.pem");
pub const ROOT_CA_2: &str = include_str!("../../data/tests/root_ca_2.pem");
pub const SIGNER: &str = include_str!("../../data/tests/signer.pem");
pub const SIGNER_DER: &[u8] = include_bytes!("../../data/tests/signer.der");
pub const OTHER_SIGNER: &str = include_str!("../../data/tests/other_signer.pem");
pub const EXPIRED_SIGNER: &str = include_str!("../../data/tests/expired_signer.pem");
pub const EC_SIGNER: &str = include_str!("../../data/tests/ec_signer.pem");
pub const ROGUE_ROOT_CA: &str = include_str!("../../data/tests/rogue_root_ca.pem");

pub const SIGNER_P7S: &[u8] = include_bytes!("../../data/tests/signer.p7s");
pub const SIGNER_NO_ATTRIBUTES_P7S: &[u8] =
    include_bytes!("../../data/tests/signer_no_attributes.p7s");
pub const SIGNER_NO_CERTS_P7S: &[u8] = include_bytes!("../../data/tests/signer_no_certs.p7s");
pub const EC_SIGNER_P7S: &[u8] = include_bytes!("../../data/tests/ec_signer.p7s");
pub const ROGUE_SIGNER_P7S: &[u8] = include_bytes!("../../data/tests/rogue_signer.p7s");
pub const CONTENT: &[u8] = include_bytes!("../../data/tests/content.json");

/// A clock at the start of `year`
pub fn clock_at(year: u16) -> FixedClock {
    let date_time = DateTime::new(year, 1, 1, 0, 0, 0).expect("Invalid date");
    FixedClock::from(date_time)
}

/// Configuration trusting both content roots at the start of 2027
pub fn config() -> ValidatorConfig {
    ValidatorConfig::new([ROOT_CA_1, ROOT_CA_2]).with_clock(clock_at(2027))
}

pub fn validator(config: ValidatorConfig) -> CmsSignatureValidator {
    CmsSignatureValidator::new(config).expect("Failed to create validator")
}

/// Validate `signature` over `content`, asserting the content was drained
pub fn validate(
    validator: &dyn SignatureValidator,
    signature: &[u8],
    content: &[u8],
) -> cms_signature_verifier::Result<()> {
    let mut stream = Cursor::new(content);
    let result = validator.validate(signature, &mut stream);
    assert_eq!(stream.position(), content.len() as u64);
    result
}

/// Re-encode `signature` with all of its signer infos removed
pub fn without_signers(signature: &[u8]) -> Vec<u8> {
    let content_info = ContentInfo::from_der(signature).expect("Failed to decode content info");
    let mut signed_data = content_info
        .content
        .decode_as::<SignedData>()
        .expect("Failed to decode signed data");
    signed_data.signer_infos = SignerInfos(SetOfVec::new());

    let content_info = ContentInfo {
        content_type: OID_SIGNED_DATA,
        content: Any::encode_from(&signed_data).expect("Failed to encode signed data"),
    };
    content_info.to_der().expect("Failed to encode content info")
}

/// Flip the lowest bit of the byte `offset` bytes from the end
pub fn flip_bit_from_end(signature: &[u8], offset: usize) -> Vec<u8> {
    let mut flipped = signature.to_vec();
    let index = flipped.len() - offset;
    flipped[index] ^= 0x01;
    flipped
}
