// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Correlation providers.
//!
//! Providers join code-object ids with telemetry held by the analytics
//! backend and turn the raw records into view lists:
//!
//! - [`InsightsProvider`]: per-method insights, grouped by span or endpoint
//! - [`ErrorsProvider`]: errors of one method, grouped by request flow
//! - [`SummariesProvider`]: global insights grouped by type, plus usage status
//!
//! Every backend call goes through a [`RetryPolicy`](crate::retry::RetryPolicy)
//! that retries only [`BackendError::Unavailable`](crate::error::BackendError).
//! A call that still fails yields an empty result and is logged once per
//! failure episode.
//!
//! # List building
//!
//! ```text
//!  records (discovery order)
//!      │  index 0, 1, 2, ...
//!      ▼
//!  ListBuilder ──► duplicate? drop (first occurrence wins)
//!      │
//!      ├── no group key ──► ListItem::Single
//!      └── group key ─────► ListGroupManager::get_or_create
//!                              (group index = first member's index)
//!      ▼
//!  stable sort by index ──► Vec<ListItem<T>>
//! ```

mod episode;
mod errors;
mod insights;
mod list;
mod summaries;

pub use episode::FailureEpisode;
pub use errors::ErrorsProvider;
pub use insights::InsightsProvider;
pub use list::{build_list, GroupListViewItem, ListBuilder, ListGroupManager, ListItem, ListViewItem};
pub use summaries::SummariesProvider;
