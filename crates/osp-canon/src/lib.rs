// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = "Canonical JSON serialization, hashing, and detached signatures."]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! The request-authentication plane of the OSP server rests on one
//! guarantee: two semantically equal JSON values produce byte-identical
//! canonical output, so a detached signature computed over those bytes is
//! independent of how the value was originally represented.
//!
//! [`canonicalize`] implements the RFC 8785 discipline (sorted keys, no
//! insignificant whitespace, minimal string escapes, shortest number
//! forms); [`sign`] and [`verify`] layer the nine supported signature
//! algorithms on top of the canonical bytes.

mod alg;
mod jcs;
mod keys;
mod sig;

pub use alg::{Algorithm, UnknownAlgorithm};
pub use jcs::{canonicalize, hash};
pub use keys::{KeyMaterial, KeyPair, generate_key};
pub use sig::{SignError, sign, verify};
