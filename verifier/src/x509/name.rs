// Copyright (c) 2023 The MobileCoin Foundation

//! Distinguished names of certificate issuers and subjects.
//!
//! Path building chains the issuer of one certificate to the subject of
//! another. Per [section 7.1](https://datatracker.ietf.org/doc/html/rfc5280#section-7.1)
//! of RFC5280 the attribute values are compared after
//! [RFC4518](https://www.rfc-editor.org/rfc/rfc4518) preparation and case
//! folding, so `CN=Content Root CA` names the same entity as
//! `CN=content  root ca`.
//!
//! Only the `PrintableString`, `UTF8String` and `IA5String` forms of a
//! `DirectoryString` are understood, any other form never compares equal.

use super::rfc4518::Rfc4518String;
use const_oid::ObjectIdentifier;
use x509_cert::attr::{AttributeTypeAndValue, AttributeValue};
use x509_cert::der::asn1::{Ia5StringRef, PrintableStringRef, Utf8StringRef};
use x509_cert::der::{Tag, Tagged};
use x509_cert::name::Name;

/// id-at-commonName
const OID_COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

/// A borrowed [`Name`] with RFC5280 comparison rules.
#[derive(Debug, Clone, Copy)]
pub struct DistinguishedName<'a>(&'a Name);

impl<'a> From<&'a Name> for DistinguishedName<'a> {
    fn from(name: &'a Name) -> Self {
        Self(name)
    }
}

impl<'a> DistinguishedName<'a> {
    /// The values of every common name (CN) attribute, in encoded order.
    ///
    /// Values that aren't a supported directory string are skipped.
    pub fn common_names(&self) -> impl Iterator<Item = &'a str> {
        let name: &'a Name = self.0;
        attributes(name)
            .filter(|attribute| attribute.oid == OID_COMMON_NAME)
            .filter_map(|attribute| directory_string(&attribute.value))
    }
}

impl<'a> PartialEq for DistinguishedName<'a> {
    fn eq(&self, other: &Self) -> bool {
        let (rdns, other_rdns) = (&self.0 .0, &other.0 .0);
        if rdns.len() != other_rdns.len() {
            return false;
        }
        rdns.iter().zip(other_rdns.iter()).all(|(rdn, other_rdn)| {
            rdn.0.len() == other_rdn.0.len()
                && rdn
                    .0
                    .iter()
                    .zip(other_rdn.0.iter())
                    .all(|(attribute, other_attribute)| {
                        attribute.oid == other_attribute.oid
                            && values_match(&attribute.value, &other_attribute.value)
                    })
        })
    }
}

fn attributes(name: &Name) -> impl Iterator<Item = &AttributeTypeAndValue> {
    name.0.iter().flat_map(|rdn| rdn.0.iter())
}

fn values_match(value: &AttributeValue, other: &AttributeValue) -> bool {
    match (directory_string(value), directory_string(other)) {
        (Some(value), Some(other)) => case_folded(value) == case_folded(other),
        _ => false,
    }
}

fn case_folded(value: &str) -> String {
    let prepared = Rfc4518String::from(value);
    caseless::default_case_fold_str((&prepared).into())
}

/// The text of a `DirectoryString` attribute value
fn directory_string(value: &AttributeValue) -> Option<&str> {
    match value.tag() {
        Tag::PrintableString => PrintableStringRef::try_from(value)
            .ok()
            .map(|s| s.as_str()),
        Tag::Utf8String => Utf8StringRef::try_from(value).ok().map(|s| s.as_str()),
        Tag::Ia5String => Ia5StringRef::try_from(value).ok().map(|s| s.as_str()),
        _ => None,
    }
}
