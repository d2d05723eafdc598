// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = "Signed skill registry with revocation and transparency logging."]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Registrations, delegations, and key rotations arrive as signed
//! [`RegistryEntry`] values. The service validates the trust chain, checks
//! the detached signature over the entry's canonical form (minus the
//! signature field itself), enforces the revocation invariant — a revoked
//! `skill_ref` never re-registers — and appends every accepted or rejected
//! mutation to a bounded, hash-chained transparency log.

mod entry;
mod log;
mod service;

pub use entry::{EntryStatus, EntryType, RegistryEntry, StoredEntry, TrustAnchor, TrustAnchorType};
pub use log::{TransparencyEntry, TransparencyLog, TransparencyPage};
pub use service::{RegistryError, RegistryService, TrustVerification};
