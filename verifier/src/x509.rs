// Copyright (c) 2023 The MobileCoin Foundation

//! Certificate level primitives: algorithms, names and path construction.

mod algorithm;
mod error;
mod name;
mod path;
mod rfc4518;

pub use algorithm::{DigestAlgorithm, Hasher, PublicKey, Signature};
pub use error::Error;
pub use name::DistinguishedName;
pub use path::{
    check_validity, verify_certificate_signature, CertificatePath, PathBuilder, PathError,
    SignerIdentity,
};
pub(crate) use path::is_issuer_of;

/// Result for certificate level operations
pub type Result<T> = core::result::Result<T, Error>;
