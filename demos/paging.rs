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

//! Pages through a mocked remote list, preferring cache hits over fetches.

use std::time::Duration;

use folio::{
    test_utils::{Sample, StaticSource},
    PageCacheBuilder,
};
use tokio_util::sync::CancellationToken;

const PAGE: usize = 4;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let source = StaticSource::new(Sample::generate(18)).with_latency(Duration::from_millis(100));
    let cache = PageCacheBuilder::new(source)
        .with_request_timeout(Duration::from_secs(2))
        .build();
    let token = CancellationToken::new();

    let total = cache.refresh_total(&token).await?;
    tracing::info!("remote list holds {total} items");

    for start in (0..total).step_by(PAGE) {
        let range = start..(start + PAGE).min(total);
        let page = match cache.get(range.clone()).await {
            Some(page) => {
                tracing::info!("page [{}, {}) served from cache", range.start, range.end);
                page
            }
            None => cache.fetch(range, &token).await?,
        };
        for entry in &page {
            tracing::info!(
                "#{:<2} {}{}",
                entry.display_index(),
                entry.item().description,
                if entry.item().special { " *" } else { "" },
            );
        }
    }

    // Revisiting a page is a pure cache hit now.
    let revisited = cache.get(0..PAGE).await.expect("first page stays cached");
    tracing::info!("revisited page starts at #{}", revisited[0].display_index());

    cache.invalidate().await;
    assert!(cache.get(0..PAGE).await.is_none());

    Ok(())
}
