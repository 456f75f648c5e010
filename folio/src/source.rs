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

//! The asynchronous provider interface the cache fetches through.

use std::ops::Range;

use async_trait::async_trait;
use folio_common::code::Item;
use tokio_util::sync::CancellationToken;

/// An asynchronous provider of a server-resident item list.
///
/// Implementations may fail or hang indefinitely; the cache imposes the
/// deadline on every call and signals abandonment through `token`.
/// Implementations that spawn work observe the token cooperatively.
#[async_trait]
pub trait Source: Send + Sync + 'static {
    /// Item type served by this source.
    type Item: Item;

    /// Queries how many items the remote list currently holds.
    async fn total(&self, token: CancellationToken) -> anyhow::Result<usize>;

    /// Fetches the items in `range` of the remote list, in order.
    ///
    /// A well-behaved source returns exactly `range.len()` items, or fewer
    /// when the remote list ends inside `range`.
    async fn fetch(&self, range: Range<usize>, token: CancellationToken)
        -> anyhow::Result<Vec<Self::Item>>;
}
