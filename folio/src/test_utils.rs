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

//! Utilities for testing paged caches.

use std::{marker::PhantomData, ops::Range, sync::Arc, time::Duration};

use async_trait::async_trait;
use folio_common::code::Item;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::source::Source;

/// An in-memory source backed by a mutable item vector.
///
/// Calls can be slowed down with a simulated latency (during which the
/// cancellation token is honored) and made to fail on demand. Handles are
/// cheap to clone and share one backing vector, so a test can keep a handle
/// for injection while the cache owns another.
pub struct StaticSource<T> {
    inner: Arc<Mutex<StaticSourceInner<T>>>,
}

struct StaticSourceInner<T> {
    items: Vec<T>,
    latency: Duration,
    fail: bool,
}

impl<T> Clone for StaticSource<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> StaticSource<T> {
    /// Creates a source serving `items`.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StaticSourceInner {
                items,
                latency: Duration::ZERO,
                fail: false,
            })),
        }
    }

    /// Adds a simulated per-call latency.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.set_latency(latency);
        self
    }

    /// Changes the simulated per-call latency.
    pub fn set_latency(&self, latency: Duration) {
        self.inner.lock().latency = latency;
    }

    /// Makes every following call fail, or succeed again.
    pub fn set_fail(&self, fail: bool) {
        self.inner.lock().fail = fail;
    }

    /// Replaces the served items.
    pub fn set_items(&self, items: Vec<T>) {
        self.inner.lock().items = items;
    }

    async fn call(&self, token: &CancellationToken) -> anyhow::Result<()> {
        let latency = self.inner.lock().latency;
        if !latency.is_zero() {
            tokio::select! {
                biased;
                _ = token.cancelled() => anyhow::bail!("call abandoned"),
                _ = tokio::time::sleep(latency) => {}
            }
        }
        if self.inner.lock().fail {
            anyhow::bail!("injected source failure");
        }
        Ok(())
    }
}

#[async_trait]
impl<T> Source for StaticSource<T>
where
    T: Item,
{
    type Item = T;

    async fn total(&self, token: CancellationToken) -> anyhow::Result<usize> {
        self.call(&token).await?;
        Ok(self.inner.lock().items.len())
    }

    async fn fetch(
        &self,
        range: Range<usize>,
        token: CancellationToken,
    ) -> anyhow::Result<Vec<T>> {
        self.call(&token).await?;
        let inner = self.inner.lock();
        // Clamp like a remote list that may have shrunk: serve what exists.
        let end = range.end.min(inner.items.len());
        let start = range.start.min(end);
        Ok(inner.items[start..end].to_vec())
    }
}

/// A source whose calls never complete. Drives timeout coverage.
#[derive(Debug)]
pub struct PendingSource<T>(PhantomData<T>);

impl<T> Default for PendingSource<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

#[async_trait]
impl<T> Source for PendingSource<T>
where
    T: Item,
{
    type Item = T;

    async fn total(&self, _token: CancellationToken) -> anyhow::Result<usize> {
        std::future::pending().await
    }

    async fn fetch(
        &self,
        _range: Range<usize>,
        _token: CancellationToken,
    ) -> anyhow::Result<Vec<T>> {
        std::future::pending().await
    }
}

/// Rendering category of a [`Sample`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    /// The common case.
    Standard,
    /// Shown with an accent.
    Highlight,
    /// Shown with a badge.
    Premium,
}

/// A record payload in the shape the cache is typically fed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Human-readable description.
    pub description: String,
    /// Rendering category.
    pub category: Category,
    /// Marks records the presentation layer singles out.
    pub special: bool,
}

impl Sample {
    /// Generates `count` distinct records, cycling categories and flagging
    /// every seventh record as special.
    pub fn generate(count: usize) -> Vec<Sample> {
        (0..count)
            .map(|i| Sample {
                description: format!("item #{i}"),
                category: match i % 3 {
                    0 => Category::Standard,
                    1 => Category::Highlight,
                    _ => Category::Premium,
                },
                special: i % 7 == 0,
            })
            .collect()
    }
}
