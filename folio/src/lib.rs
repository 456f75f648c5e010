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

//! folio is a paged remote-data cache for Rust.
//!
//! A [`PageCache`] mirrors a logically unbounded, server-resident list of
//! items. It learns the list's length with [`PageCache::refresh_total`],
//! fetches fixed-size pages through a swappable [`Source`], serves
//! previously fetched ranges from memory with [`PageCache::get`], and bounds
//! every remote call with a timeout that is itself cooperatively
//! cancellable.
//!
//! ```
//! use std::ops::Range;
//!
//! use async_trait::async_trait;
//! use folio::{PageCache, Source};
//! use tokio_util::sync::CancellationToken;
//!
//! struct Numbers;
//!
//! #[async_trait]
//! impl Source for Numbers {
//!     type Item = u64;
//!
//!     async fn total(&self, _token: CancellationToken) -> anyhow::Result<usize> {
//!         Ok(100)
//!     }
//!
//!     async fn fetch(
//!         &self,
//!         range: Range<usize>,
//!         _token: CancellationToken,
//!     ) -> anyhow::Result<Vec<u64>> {
//!         Ok(range.map(|index| index as u64).collect())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> folio::Result<()> {
//!     let cache = PageCache::new(Numbers);
//!     let token = CancellationToken::new();
//!
//!     let total = cache.refresh_total(&token).await?;
//!     assert_eq!(total, 100);
//!
//!     // Nothing fetched yet: a miss, so go fetch.
//!     assert!(cache.get(0..10).await.is_none());
//!     let page = cache.fetch(0..10, &token).await?;
//!     assert_eq!(page.len(), 10);
//!
//!     // Served from memory now, returned by value.
//!     let cached = cache.get(0..10).await.unwrap();
//!     assert_eq!(cached, page);
//!
//!     Ok(())
//! }
//! ```

mod cache;
mod entry;
mod error;
mod source;

pub mod prelude;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use folio_common::code::Item;

pub use crate::{
    cache::{PageCache, PageCacheBuilder, PageCacheConfig},
    entry::Entry,
    error::{Error, Result},
    source::Source,
};
