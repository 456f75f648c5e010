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

//! The paged remote-data cache.

use std::{fmt::Debug, ops::Range, sync::Arc, time::Duration};

use folio_common::{
    code::Item,
    deadline::{bound_by, Interrupt},
    strict_assert, strict_assert_eq,
};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{Mutex, MutexGuard},
    time::Instant,
};
use tokio_util::sync::CancellationToken;

use crate::{
    entry::Entry,
    error::{Error, Result},
    source::Source,
};

/// Paged cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageCacheConfig {
    /// Time budget of one remote operation, covering both the wait for the
    /// cache lock and the source call.
    pub request_timeout: Duration,
}

impl Default for PageCacheConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Builder for [`PageCache`].
pub struct PageCacheBuilder<T>
where
    T: Item,
{
    source: Arc<dyn Source<Item = T>>,
    config: PageCacheConfig,
}

impl<T> PageCacheBuilder<T>
where
    T: Item,
{
    /// Creates a builder over `source` with the default configuration.
    pub fn new<S>(source: S) -> Self
    where
        S: Source<Item = T>,
    {
        Self {
            source: Arc::new(source),
            config: PageCacheConfig::default(),
        }
    }

    /// Sets the time budget of one remote operation.
    ///
    /// Default: 5 s.
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.config.request_timeout = request_timeout;
        self
    }

    /// Builds the cache.
    ///
    /// The cache starts uninitialized; call [`PageCache::refresh_total`]
    /// before fetching pages.
    pub fn build(self) -> PageCache<T> {
        PageCache {
            inner: Arc::new(Inner {
                state: Mutex::new(CacheState {
                    source: self.source,
                    total: None,
                    slots: Vec::new(),
                }),
                config: self.config,
            }),
        }
    }
}

struct CacheState<T>
where
    T: Item,
{
    source: Arc<dyn Source<Item = T>>,
    /// Last known remote item count. `None` marks the uninitialized or
    /// invalidated state and is its only legal representation; the slot
    /// array is empty whenever the count is unknown.
    total: Option<usize>,
    slots: Vec<Option<Entry<T>>>,
}

impl<T> CacheState<T>
where
    T: Item,
{
    fn reset(&mut self) {
        self.total = None;
        self.slots = Vec::new();
    }

    fn contains(&self, range: &Range<usize>) -> bool {
        matches!(self.total, Some(total) if range.start <= range.end && range.end <= total)
    }

    /// Copies `range` out of the slot array.
    ///
    /// `None` unless the range is in bounds and every slot in it is valid.
    fn read(&self, range: Range<usize>) -> Option<Vec<Entry<T>>> {
        if !self.contains(&range) {
            return None;
        }
        let mut entries = Vec::with_capacity(range.len());
        for index in range {
            let entry = self.slots[index].as_ref()?;
            strict_assert_eq!(entry.index(), index);
            entries.push(entry.clone());
        }
        Some(entries)
    }

    /// Copies every currently valid entry in `range`, skipping invalid slots.
    fn read_valid(&self, range: Range<usize>) -> Vec<Entry<T>> {
        self.slots[range].iter().flatten().cloned().collect_vec()
    }

    fn merge(&mut self, start: usize, items: Vec<T>) {
        for (offset, item) in items.into_iter().enumerate() {
            let index = start + offset;
            strict_assert!(index < self.slots.len());
            self.slots[index] = Some(Entry::new(index, item));
        }
    }
}

struct Inner<T>
where
    T: Item,
{
    state: Mutex<CacheState<T>>,
    config: PageCacheConfig,
}

/// A paged cache over a remote item list.
///
/// The cache mirrors a logically unbounded, server-resident list as a flat
/// array of per-index slots. [`PageCache::refresh_total`] learns the list's
/// length and hard-resets the array; [`PageCache::fetch`] fills ranges of it
/// through the [`Source`]; [`PageCache::get`] serves previously fetched
/// ranges without remote traffic.
///
/// A single async lock serializes every operation, so no caller ever
/// observes a partially updated state; the cache is safe under arbitrary
/// concurrent callers. Racing callers are serialized in lock-acquisition
/// order, which is unspecified between them.
///
/// Every remote operation is bounded by the configured `request_timeout`
/// and by the caller's cancellation token; the budget covers the wait for
/// the lock and the source call together.
///
/// Handles are cheap to clone and share one cache.
pub struct PageCache<T>
where
    T: Item,
{
    inner: Arc<Inner<T>>,
}

impl<T> Clone for PageCache<T>
where
    T: Item,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Debug for PageCache<T>
where
    T: Item,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCache")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl<T> PageCache<T>
where
    T: Item,
{
    /// Creates a cache over `source` with the default configuration.
    pub fn new<S>(source: S) -> Self
    where
        S: Source<Item = T>,
    {
        PageCacheBuilder::new(source).build()
    }

    /// Last known remote item count.
    ///
    /// `None` until a successful [`PageCache::refresh_total`], and again
    /// after any invalidation.
    pub async fn total(&self) -> Option<usize> {
        self.inner.state.lock().await.total
    }

    /// Re-queries the remote item count and hard-resets the slot array to
    /// match, discarding all cached entries.
    ///
    /// Returns the fresh count on success. On any failure (source fault, a
    /// reported count of zero, timeout, cancellation) the cache is
    /// invalidated before the error is propagated; a stale count is never
    /// kept.
    pub async fn refresh_total(&self, token: &CancellationToken) -> Result<usize> {
        let res = self.refresh_total_inner(token).await;
        if let Err(e) = res.as_ref() {
            tracing::debug!("[page cache]: refresh failed, invalidating: {e}");
            self.invalidate().await;
        }
        res
    }

    async fn refresh_total_inner(&self, token: &CancellationToken) -> Result<usize> {
        let deadline = Instant::now() + self.inner.config.request_timeout;
        let mut state = self.lock(token, deadline).await?;

        let source = state.source.clone();
        let call = token.child_token();
        let total = match bound_by(source.total(call.clone()), token, deadline).await {
            Ok(res) => res?,
            Err(interrupt) => {
                // The call future is dropped; let work the source spawned
                // observe the abandonment.
                call.cancel();
                return Err(self.interrupt_error(interrupt));
            }
        };

        if total == 0 {
            return Err(Error::invalid_payload("source reported an empty list"));
        }

        state.total = Some(total);
        state.slots = vec![None; total];
        tracing::debug!("[page cache]: reset to {total} slots");
        Ok(total)
    }

    /// Fetches `range` from the source and merges the result into the cache.
    ///
    /// Slots covered by returned items are overwritten regardless of their
    /// previous validity, so repeated fetches refresh rather than skip. When
    /// the source returns fewer items than requested (the remote list ends
    /// inside `range`), the returned prefix is merged and the call still
    /// succeeds. The result holds copies of the entries of `range` that are
    /// valid afterwards, in order.
    ///
    /// Fails with [`Error::OutOfRange`] when `range` does not fit the last
    /// known count, and with [`Error::Source`] on an empty or over-long
    /// payload. No slot is modified on any failure.
    pub async fn fetch(
        &self,
        range: Range<usize>,
        token: &CancellationToken,
    ) -> Result<Vec<Entry<T>>> {
        let deadline = Instant::now() + self.inner.config.request_timeout;
        let mut state = self.lock(token, deadline).await?;

        if !state.contains(&range) {
            return Err(Error::OutOfRange {
                start: range.start,
                end: range.end,
                total: state.total,
            });
        }

        let source = state.source.clone();
        let call = token.child_token();
        let items = match bound_by(source.fetch(range.clone(), call.clone()), token, deadline).await
        {
            Ok(res) => res?,
            Err(interrupt) => {
                call.cancel();
                return Err(self.interrupt_error(interrupt));
            }
        };

        if items.is_empty() {
            return Err(Error::invalid_payload("source returned no items"));
        }
        if items.len() > range.len() {
            return Err(Error::invalid_payload("source returned more items than requested"));
        }

        tracing::trace!("[page cache]: merging {} items at {}", items.len(), range.start);
        state.merge(range.start, items);
        Ok(state.read_valid(range))
    }

    /// Reads `range` from the cache without touching the source.
    ///
    /// Returns copies of the entries iff every slot in `range` is currently
    /// valid; a single invalid slot makes the whole range a miss, as does an
    /// unknown count or an out-of-bounds range. A miss is an expected
    /// outcome, not an error: callers fall back to [`PageCache::fetch`]. A
    /// zero-length in-bounds range is a hit with an empty result.
    ///
    /// Only the cache lock is awaited; no deadline applies.
    pub async fn get(&self, range: Range<usize>) -> Option<Vec<Entry<T>>> {
        self.inner.state.lock().await.read(range)
    }

    /// Drops the known count and every cached entry.
    ///
    /// Idempotent, and safe to call concurrently with in-flight operations:
    /// those complete against the state they locked, after which the reset
    /// is observed by every following operation.
    pub async fn invalidate(&self) {
        self.inner.state.lock().await.reset();
        tracing::debug!("[page cache]: invalidated");
    }

    /// Replaces the data source.
    ///
    /// The cache is invalidated in the same critical section, so data
    /// fetched from the previous source never leaks past the swap.
    pub async fn swap_source<S>(&self, source: S)
    where
        S: Source<Item = T>,
    {
        let mut state = self.inner.state.lock().await;
        state.source = Arc::new(source);
        state.reset();
        tracing::debug!("[page cache]: source swapped");
    }

    async fn lock(
        &self,
        token: &CancellationToken,
        deadline: Instant,
    ) -> Result<MutexGuard<'_, CacheState<T>>> {
        bound_by(self.inner.state.lock(), token, deadline)
            .await
            .map_err(|interrupt| self.interrupt_error(interrupt))
    }

    fn interrupt_error(&self, interrupt: Interrupt) -> Error {
        match interrupt {
            Interrupt::Cancelled => Error::Cancelled,
            Interrupt::Elapsed => Error::Timeout {
                timeout: self.inner.config.request_timeout,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use futures::future::join_all;
    use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

    use super::*;
    use crate::test_utils::{PendingSource, Sample, StaticSource};

    const TOTAL: usize = 20;
    const PAGE: usize = 5;

    fn numbers() -> StaticSource<u64> {
        StaticSource::new((0..TOTAL as u64).collect_vec())
    }

    async fn refreshed() -> (PageCache<u64>, StaticSource<u64>, CancellationToken) {
        let source = numbers();
        let cache = PageCache::new(source.clone());
        let token = CancellationToken::new();
        cache.refresh_total(&token).await.unwrap();
        (cache, source, token)
    }

    #[test]
    fn test_default_config() {
        assert_eq!(
            PageCacheConfig::default().request_timeout,
            Duration::from_secs(5)
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_fresh_refresh_has_no_valid_slots() {
        let (cache, _source, _token) = refreshed().await;

        assert_eq!(cache.total().await, Some(TOTAL));
        assert!(cache.get(0..TOTAL).await.is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_get_without_known_total_misses() {
        let cache = PageCache::new(numbers());

        assert_eq!(cache.total().await, None);
        assert!(cache.get(0..1).await.is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_fetch_get_round_trip() {
        let (cache, _source, token) = refreshed().await;

        let fetched = cache.fetch(3..9, &token).await.unwrap();
        let cached = cache.get(3..9).await.unwrap();

        assert_eq!(fetched, cached);
        assert_eq!(
            cached.iter().map(Entry::index).collect_vec(),
            (3..9).collect_vec()
        );
        assert_eq!(
            cached.iter().map(|entry| *entry.item()).collect_vec(),
            (3..9).map(|index| index as u64).collect_vec()
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_single_invalid_slot_misses_whole_range() {
        let source = StaticSource::new((0..5u64).collect_vec());
        let cache = PageCache::new(source);
        let token = CancellationToken::new();
        cache.refresh_total(&token).await.unwrap();

        cache.fetch(2..3, &token).await.unwrap();

        assert!(cache.get(0..5).await.is_none());
        assert!(cache.get(2..3).await.is_some());
    }

    #[test_log::test(tokio::test)]
    async fn test_zero_length_get_is_a_hit() {
        let (cache, _source, _token) = refreshed().await;

        assert_eq!(cache.get(7..7).await, Some(vec![]));
        // Out of bounds, even when empty.
        assert!(cache.get(TOTAL + 1..TOTAL + 1).await.is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_failed_refresh_resets_to_sentinel() {
        let (cache, source, token) = refreshed().await;
        cache.fetch(0..PAGE, &token).await.unwrap();

        source.set_fail(true);
        let err = cache.refresh_total(&token).await.unwrap_err();

        assert!(matches!(err, Error::Source(_)));
        assert_eq!(cache.total().await, None);
        assert!(cache.get(0..PAGE).await.is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_zero_total_is_a_source_error() {
        let cache = PageCache::new(StaticSource::<u64>::new(vec![]));
        let token = CancellationToken::new();

        let err = cache.refresh_total(&token).await.unwrap_err();

        assert!(matches!(err, Error::Source(_)));
        assert_eq!(cache.total().await, None);
    }

    #[test_log::test(tokio::test)]
    async fn test_refresh_discards_previous_contents() {
        let (cache, source, token) = refreshed().await;
        cache.fetch(0..PAGE, &token).await.unwrap();

        source.set_items((0..7u64).collect_vec());
        assert_eq!(cache.refresh_total(&token).await.unwrap(), 7);

        assert_eq!(cache.total().await, Some(7));
        assert!(cache.get(0..PAGE).await.is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_failed_fetch_preserves_valid_slots() {
        let (cache, source, token) = refreshed().await;
        let before = cache.fetch(0..PAGE, &token).await.unwrap();

        source.set_fail(true);
        cache.fetch(PAGE..2 * PAGE, &token).await.unwrap_err();

        assert_eq!(cache.get(0..PAGE).await.unwrap(), before);
        assert!(cache.get(PAGE..2 * PAGE).await.is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_refetch_refreshes_payloads() {
        let (cache, source, token) = refreshed().await;
        cache.fetch(0..PAGE, &token).await.unwrap();

        source.set_items((100..100 + TOTAL as u64).collect_vec());
        let again = cache.fetch(0..PAGE, &token).await.unwrap();

        assert_eq!(
            again.iter().map(|entry| *entry.item()).collect_vec(),
            (100..100 + PAGE as u64).collect_vec()
        );
        assert_eq!(cache.get(0..PAGE).await.unwrap(), again);
    }

    #[test_log::test(tokio::test)]
    async fn test_partial_page_merges_returned_prefix() {
        let (cache, source, token) = refreshed().await;

        // The remote list shrank to 15 items; the cache is still sized 20.
        source.set_items((0..15u64).collect_vec());
        let entries = cache.fetch(12..18, &token).await.unwrap();

        assert_eq!(
            entries.iter().map(Entry::index).collect_vec(),
            (12..15).collect_vec()
        );
        assert!(cache.get(12..15).await.is_some());
        assert!(cache.get(12..18).await.is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_fetch_before_refresh_is_out_of_range() {
        let cache = PageCache::new(numbers());
        let token = CancellationToken::new();

        let err = cache.fetch(0..PAGE, &token).await.unwrap_err();

        assert!(matches!(err, Error::OutOfRange { total: None, .. }));
    }

    #[test_log::test(tokio::test)]
    async fn test_fetch_past_end_is_out_of_range() {
        let (cache, _source, token) = refreshed().await;

        let err = cache.fetch(TOTAL - 2..TOTAL + 2, &token).await.unwrap_err();

        assert!(matches!(
            err,
            Error::OutOfRange {
                start: 18,
                end: 22,
                total: Some(TOTAL),
            }
        ));
    }

    #[test_log::test(tokio::test)]
    async fn test_zero_length_fetch_is_a_source_error() {
        let (cache, _source, token) = refreshed().await;

        let err = cache.fetch(4..4, &token).await.unwrap_err();

        assert!(matches!(err, Error::Source(_)));
    }

    #[test_log::test(tokio::test)]
    async fn test_overlong_payload_is_rejected() {
        struct Overfull;

        #[async_trait]
        impl Source for Overfull {
            type Item = u64;

            async fn total(&self, _token: CancellationToken) -> anyhow::Result<usize> {
                Ok(10)
            }

            async fn fetch(
                &self,
                range: Range<usize>,
                _token: CancellationToken,
            ) -> anyhow::Result<Vec<u64>> {
                Ok(vec![0; range.len() + 1])
            }
        }

        let cache = PageCache::new(Overfull);
        let token = CancellationToken::new();
        cache.refresh_total(&token).await.unwrap();

        let err = cache.fetch(0..3, &token).await.unwrap_err();

        assert!(matches!(err, Error::Source(_)));
        assert!(cache.get(0..3).await.is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_concurrent_disjoint_fetches() {
        let (cache, _source, _token) = refreshed().await;

        let mut pages = (0..TOTAL / PAGE).collect_vec();
        pages.shuffle(&mut StdRng::seed_from_u64(42));

        let handles = pages
            .into_iter()
            .map(|page| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    let token = CancellationToken::new();
                    let start = page * PAGE;
                    cache.fetch(start..start + PAGE, &token).await.unwrap();
                })
            })
            .collect_vec();
        join_all(handles)
            .await
            .into_iter()
            .for_each(|res| res.unwrap());

        let entries = cache.get(0..TOTAL).await.unwrap();
        for (index, entry) in entries.iter().enumerate() {
            assert_eq!(entry.index(), index);
            assert_eq!(*entry.item(), index as u64);
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_invalidate_races_in_flight_fetch() {
        let source = numbers().with_latency(Duration::from_millis(10));
        let cache = PageCache::new(source);
        let token = CancellationToken::new();
        cache.refresh_total(&token).await.unwrap();

        let handle = tokio::spawn({
            let cache = cache.clone();
            let token = token.clone();
            async move { cache.fetch(0..PAGE, &token).await }
        });
        // Queues behind the in-flight fetch on the same lock.
        cache.invalidate().await;
        let _ = handle.await.unwrap();

        assert_eq!(cache.total().await, None);
        assert!(cache.get(0..PAGE).await.is_none());
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn test_timeout_on_unresponsive_source() {
        const TIMEOUT: Duration = Duration::from_millis(100);

        let cache = PageCacheBuilder::new(PendingSource::<u64>::default())
            .with_request_timeout(TIMEOUT)
            .build();
        let token = CancellationToken::new();

        let begin = Instant::now();
        let err = cache.refresh_total(&token).await.unwrap_err();

        let Error::Timeout { timeout } = err else {
            panic!("expected a timeout, got: {err}");
        };
        assert_eq!(timeout, TIMEOUT);
        // Bounded margin above the deadline, never a hang.
        assert!(begin.elapsed() >= TIMEOUT && begin.elapsed() < 2 * TIMEOUT);
        assert_eq!(cache.total().await, None);
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn test_fetch_timeout_leaves_cache_untouched() {
        let source = numbers();
        let cache = PageCacheBuilder::new(source.clone())
            .with_request_timeout(Duration::from_millis(100))
            .build();
        let token = CancellationToken::new();
        cache.refresh_total(&token).await.unwrap();
        let before = cache.fetch(0..PAGE, &token).await.unwrap();

        source.set_latency(Duration::from_millis(500));
        let err = cache.fetch(PAGE..2 * PAGE, &token).await.unwrap_err();

        assert!(matches!(err, Error::Timeout { .. }));
        assert_eq!(cache.get(0..PAGE).await.unwrap(), before);
        assert!(cache.get(PAGE..2 * PAGE).await.is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_cancelled_refresh_invalidates() {
        let (cache, _source, _token) = refreshed().await;

        let cancelled = CancellationToken::new();
        cancelled.cancel();
        let err = cache.refresh_total(&cancelled).await.unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(cache.total().await, None);
    }

    #[test_log::test(tokio::test)]
    async fn test_cancelled_fetch_leaves_cache_untouched() {
        let (cache, _source, token) = refreshed().await;
        let before = cache.fetch(0..PAGE, &token).await.unwrap();

        let cancelled = CancellationToken::new();
        cancelled.cancel();
        let err = cache.fetch(PAGE..2 * PAGE, &cancelled).await.unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(cache.get(0..PAGE).await.unwrap(), before);
    }

    #[test_log::test(tokio::test)]
    async fn test_cancel_mid_flight() {
        let source = numbers().with_latency(Duration::from_millis(50));
        let cache = PageCache::new(source);
        let token = CancellationToken::new();
        cache.refresh_total(&token).await.unwrap();

        let handle = tokio::spawn({
            let cache = cache.clone();
            let token = token.clone();
            async move { cache.fetch(0..PAGE, &token).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test_log::test(tokio::test)]
    async fn test_swap_source_invalidates() {
        let (cache, _source, token) = refreshed().await;
        cache.fetch(0..PAGE, &token).await.unwrap();

        cache
            .swap_source(StaticSource::new((0..5u64).collect_vec()))
            .await;

        assert_eq!(cache.total().await, None);
        assert!(cache.get(0..PAGE).await.is_none());
        assert_eq!(cache.refresh_total(&token).await.unwrap(), 5);
    }

    #[test_log::test(tokio::test)]
    async fn test_sample_records_round_trip() {
        let samples = Sample::generate(12);
        let cache = PageCache::new(StaticSource::new(samples.clone()));
        let token = CancellationToken::new();
        cache.refresh_total(&token).await.unwrap();

        let page = cache.fetch(6..12, &token).await.unwrap();

        assert_eq!(page[0].display_index(), 7);
        assert_eq!(
            page.iter().map(|entry| entry.item().clone()).collect_vec(),
            samples[6..12].to_vec()
        );
    }
}
