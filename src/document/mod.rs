// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Resolved documents and their cache.
//!
//! # Architecture
//!
//! ```text
//!   on_file_changed ─┐          ┌──────────────────────────┐
//!   on_environment ──┼────────► │    DocumentInfoCache     │
//!   _changed         │          │  FileKey → Slot (state)  │
//!   get ─────────────┘          └────────────┬─────────────┘
//!                                            │ rebuild (one per key)
//!                                            ▼
//!                      SourceAccess ─► ResolverRegistry ─► LanguageResolver
//!                                            │
//!                                            ▼
//!                                  Arc<DocumentInfo> (immutable)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let cache = DocumentInfoCache::new(source, registry, environment.clone());
//! let key = FileKey::from_path("app/billing.py");
//! if let Some(info) = cache.get(&key) {
//!     for id in info.method_ids() {
//!         println!("{}", id);
//!     }
//! }
//! ```

mod cache;
mod types;

pub use cache::DocumentInfoCache;
pub use types::{DocumentInfo, EntryState};
