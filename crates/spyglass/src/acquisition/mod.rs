// Copyright 2026 Spyglass Contributors
// SPDX-License-Identifier: Apache-2.0

//! Network acquisition of spy report markup.
//!
//! [`fetcher::Fetcher`] walks an ordered list of [`strategy::Strategy`]
//! values over a [`transport::Transport`], retrying with backoff and
//! falling back to relays, until one response looks like a real report.

pub mod fetcher;
pub mod strategy;
pub mod transport;

pub use fetcher::{FetchOutcome, Fetcher};
pub use strategy::{default_strategies, Strategy};
pub use transport::{ReqwestTransport, Transport, TransportError, TransportRequest, TransportResponse};
