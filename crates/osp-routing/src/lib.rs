// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = "Four-stage skill routing pipeline."]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Routing selects exactly one skill (or escalates / refuses) from a
//! request-scoped candidate pool:
//!
//! 1. **Lexical** — Okapi BM25 over candidate documents with a
//!    request-corpus IDF table.
//! 2. **Semantic** — cosine rerank against a batch-encoded query vector,
//!    behind the [`Embedder`] capability trait.
//! 3. **Conflict resolution** — ε-tied scores narrowed by risk level, then
//!    broken by UTF-8 skill-id order.
//!
//! Safety runs before any scoring; decisions are cached in a bounded LRU
//! keyed on the query and the sorted candidate ids. For a fixed request the
//! decision is deterministic as long as the embedder is — the built-in
//! [`HashingEmbedder`] is.

mod bm25;
mod cache;
mod embedder;
mod router;

pub use bm25::Bm25Scorer;
pub use cache::DecisionCache;
pub use embedder::{Embedder, EmbedderError, HashingEmbedder};
pub use router::{RouteRequest, RouterService, RoutingConditions};
