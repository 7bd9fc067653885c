// Copyright (c) 2023 The MobileCoin Foundation

//! Algorithm data types used in certificate and CMS signature logic
//!

use super::{Error, Result};
use const_oid::ObjectIdentifier;
use core::fmt::{Debug, Formatter};
use p256::ecdsa;
use p256::ecdsa::signature::hazmat::PrehashVerifier;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::Pkcs1v15Sign;
use sha2::{Digest, Sha256, Sha384, Sha512};
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

const OID_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");
const OID_SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.2");
const OID_SHA512: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.3");
const OID_PKCS1_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const OID_PKCS1_SHA256_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
const OID_PKCS1_SHA384_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12");
const OID_PKCS1_SHA512_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");
const OID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const OID_SIG_ECDSA_WITH_SHA256: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
const OID_SIG_ECDSA_WITH_SHA384: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3");
const OID_SIG_ECDSA_WITH_SHA512: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.4");

/// Message digest algorithms supported for content and certificate hashing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl DigestAlgorithm {
    /// The object identifier naming this algorithm
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            DigestAlgorithm::Sha256 => OID_SHA256,
            DigestAlgorithm::Sha384 => OID_SHA384,
            DigestAlgorithm::Sha512 => OID_SHA512,
        }
    }

    /// Start an incremental digest computation
    pub fn hasher(&self) -> Hasher {
        match self {
            DigestAlgorithm::Sha256 => Hasher::Sha256(Sha256::new()),
            DigestAlgorithm::Sha384 => Hasher::Sha384(Sha384::new()),
            DigestAlgorithm::Sha512 => Hasher::Sha512(Sha512::new()),
        }
    }

    /// Digest `message` in one shot
    pub fn digest(&self, message: &[u8]) -> Vec<u8> {
        let mut hasher = self.hasher();
        hasher.update(message);
        hasher.finalize()
    }

    /// The digest implied by a certificate `signatureAlgorithm`.
    ///
    /// # Errors
    /// `Error::UnsupportedAlgorithm` if the algorithm does not name one of
    /// the supported RSA or ECDSA signature schemes.
    pub fn try_from_signature_algorithm(algorithm: &AlgorithmIdentifierOwned) -> Result<Self> {
        match algorithm.oid {
            OID_PKCS1_SHA256_WITH_RSA | OID_SIG_ECDSA_WITH_SHA256 => Ok(DigestAlgorithm::Sha256),
            OID_PKCS1_SHA384_WITH_RSA | OID_SIG_ECDSA_WITH_SHA384 => Ok(DigestAlgorithm::Sha384),
            OID_PKCS1_SHA512_WITH_RSA | OID_SIG_ECDSA_WITH_SHA512 => Ok(DigestAlgorithm::Sha512),
            oid => Err(Error::UnsupportedAlgorithm(oid)),
        }
    }

    fn pkcs1v15(&self) -> Pkcs1v15Sign {
        match self {
            DigestAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
            DigestAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
            DigestAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
        }
    }
}

/// Create a [`DigestAlgorithm`] from a `DigestAlgorithmIdentifier`
impl TryFrom<&AlgorithmIdentifierOwned> for DigestAlgorithm {
    type Error = Error;

    fn try_from(value: &AlgorithmIdentifierOwned) -> core::result::Result<Self, Self::Error> {
        match value.oid {
            OID_SHA256 => Ok(DigestAlgorithm::Sha256),
            OID_SHA384 => Ok(DigestAlgorithm::Sha384),
            OID_SHA512 => Ok(DigestAlgorithm::Sha512),
            oid => Err(Error::UnsupportedAlgorithm(oid)),
        }
    }
}

/// An in progress digest computation
#[derive(Clone)]
pub enum Hasher {
    /// SHA-256 state
    Sha256(Sha256),
    /// SHA-384 state
    Sha384(Sha384),
    /// SHA-512 state
    Sha512(Sha512),
}

impl Hasher {
    /// The algorithm this hasher computes
    pub fn algorithm(&self) -> DigestAlgorithm {
        match self {
            Hasher::Sha256(_) => DigestAlgorithm::Sha256,
            Hasher::Sha384(_) => DigestAlgorithm::Sha384,
            Hasher::Sha512(_) => DigestAlgorithm::Sha512,
        }
    }

    /// Feed `data` into the digest
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha256(hasher) => Digest::update(hasher, data),
            Hasher::Sha384(hasher) => Digest::update(hasher, data),
            Hasher::Sha512(hasher) => Digest::update(hasher, data),
        }
    }

    /// Consume the hasher returning the digest bytes
    pub fn finalize(self) -> Vec<u8> {
        match self {
            Hasher::Sha256(hasher) => hasher.finalize().to_vec(),
            Hasher::Sha384(hasher) => hasher.finalize().to_vec(),
            Hasher::Sha512(hasher) => hasher.finalize().to_vec(),
        }
    }
}

impl Debug for Hasher {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "Hasher({:?})", self.algorithm())
    }
}

/// Public key used in PKI signature verification
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum PublicKey {
    /// Elliptic curve public key
    Ecdsa(ecdsa::VerifyingKey),
    /// RSA public key
    Rsa(rsa::RsaPublicKey),
}

impl PublicKey {
    /// Verify the `message` and `signature` match this [`PublicKey`]
    ///
    /// The `message` is hashed with `algorithm` prior to verification.
    pub fn verify(
        &self,
        algorithm: DigestAlgorithm,
        message: &[u8],
        signature: &Signature,
    ) -> Result<()> {
        self.verify_digest(algorithm, &algorithm.digest(message), signature)
    }

    /// Verify the `signature` over an already computed `digest`
    pub fn verify_digest(
        &self,
        algorithm: DigestAlgorithm,
        digest: &[u8],
        signature: &Signature,
    ) -> Result<()> {
        match self {
            PublicKey::Ecdsa(key) => match signature {
                Signature::Ecdsa(sig) => key
                    .verify_prehash(digest, sig)
                    .map_err(|_| Error::SignatureVerification),
                _ => Err(Error::SignatureVerification),
            },
            PublicKey::Rsa(key) => match signature {
                Signature::Rsa(sig) => key
                    .verify(algorithm.pkcs1v15(), digest, sig)
                    .map_err(|_| Error::SignatureVerification),
                _ => Err(Error::SignatureVerification),
            },
        }
    }
}

/// Create a [`PublicKey`] from a [`SubjectPublicKeyInfoOwned`]
impl TryFrom<&SubjectPublicKeyInfoOwned> for PublicKey {
    type Error = Error;

    fn try_from(value: &SubjectPublicKeyInfoOwned) -> core::result::Result<Self, Self::Error> {
        let bytes = value
            .subject_public_key
            .as_bytes()
            .ok_or(Error::KeyDecoding)?;
        match value.algorithm.oid {
            OID_EC_PUBLIC_KEY => {
                let key =
                    ecdsa::VerifyingKey::from_sec1_bytes(bytes).map_err(|_| Error::KeyDecoding)?;
                Ok(PublicKey::Ecdsa(key))
            }
            OID_PKCS1_RSA_ENCRYPTION => {
                let key =
                    rsa::RsaPublicKey::from_pkcs1_der(bytes).map_err(|_| Error::KeyDecoding)?;
                Ok(PublicKey::Rsa(key))
            }
            _ => Err(Error::KeyDecoding),
        }
    }
}

/// Signature used in PKI verification
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Signature {
    /// Elliptic curve signature
    Ecdsa(ecdsa::Signature),
    /// RSA signature
    Rsa(Vec<u8>),
}

impl Signature {
    /// Create a [`Signature`] from the `algorithm` and `signature` bytes
    ///
    /// CMS signer infos may name the bare key algorithm (`rsaEncryption`,
    /// `id-ecPublicKey`) instead of a combined signature algorithm, both are
    /// accepted here.
    pub fn try_from_algorithm_and_signature(
        algorithm: &AlgorithmIdentifierOwned,
        signature: &[u8],
    ) -> Result<Self> {
        match algorithm.oid {
            OID_SIG_ECDSA_WITH_SHA256
            | OID_SIG_ECDSA_WITH_SHA384
            | OID_SIG_ECDSA_WITH_SHA512
            | OID_EC_PUBLIC_KEY => {
                let sig =
                    ecdsa::Signature::from_der(signature).map_err(|_| Error::SignatureDecoding)?;
                Ok(Signature::Ecdsa(sig))
            }
            OID_PKCS1_RSA_ENCRYPTION
            | OID_PKCS1_SHA256_WITH_RSA
            | OID_PKCS1_SHA384_WITH_RSA
            | OID_PKCS1_SHA512_WITH_RSA => Ok(Signature::Rsa(signature.to_vec())),
            oid => Err(Error::UnsupportedAlgorithm(oid)),
        }
    }
}
