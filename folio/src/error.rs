// Copyright 2026 folio Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Paged cache error types.

use std::time::Duration;

/// Paged cache error.
///
/// Callers conventionally treat [`Error::Cancelled`] as silent (the request
/// was superseded) and every other kind as a reportable failure.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The caller's cancellation token fired before the operation completed.
    #[error("operation cancelled")]
    Cancelled,
    /// The request deadline elapsed before the operation completed.
    #[error("operation timed out after {timeout:?}")]
    Timeout {
        /// The time budget that was exceeded.
        timeout: Duration,
    },
    /// The source failed, or returned an invalid or empty payload where data
    /// was expected.
    #[error("source error: {0}")]
    Source(#[from] anyhow::Error),
    /// The requested range does not fit the last known item count.
    #[error("range [{start}, {end}) out of bounds, total: {total:?}")]
    OutOfRange {
        /// First requested index.
        start: usize,
        /// Past-the-end requested index.
        end: usize,
        /// Last known item count, if any.
        total: Option<usize>,
    },
}

impl Error {
    /// A success payload that does not hold the data it was expected to.
    pub fn invalid_payload(message: &'static str) -> Self {
        Self::Source(anyhow::anyhow!(message))
    }
}

/// Paged cache result.
pub type Result<T> = std::result::Result<T, Error>;
