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

//! Deadline- and cancellation-bounded future execution.

use std::future::Future;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a deadline-bound future was interrupted before completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The caller's cancellation token fired.
    Cancelled,
    /// The deadline passed.
    Elapsed,
}

/// Drives `future` until it completes, `token` is cancelled, or `deadline`
/// passes, whichever happens first.
///
/// When both interruptions are ready at once, cancellation is reported. The
/// future is dropped on either interruption; callers that handed it a child
/// token cancel that token themselves to reach work the future spawned.
pub async fn bound_by<F>(
    future: F,
    token: &CancellationToken,
    deadline: Instant,
) -> Result<F::Output, Interrupt>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Interrupt::Cancelled),
        res = tokio::time::timeout_at(deadline, future) => res.map_err(|_| Interrupt::Elapsed),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_completes_before_deadline() {
        let token = CancellationToken::new();
        let deadline = Instant::now() + Duration::from_secs(1);

        let res = bound_by(async { 7 }, &token, deadline).await;

        assert_eq!(res, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_elapses() {
        let token = CancellationToken::new();
        let deadline = Instant::now() + Duration::from_millis(10);

        let res = bound_by(std::future::pending::<()>(), &token, deadline).await;

        assert_eq!(res, Err(Interrupt::Elapsed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_wins_over_deadline() {
        let token = CancellationToken::new();
        token.cancel();
        // Deadline already passed, yet cancellation must be reported.
        let deadline = Instant::now();

        let res = bound_by(std::future::pending::<()>(), &token, deadline).await;

        assert_eq!(res, Err(Interrupt::Cancelled));
    }
}
