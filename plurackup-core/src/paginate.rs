//! Pagination driver: walks the owner's timeline backwards until an empty page.
//!
//! Each non-empty page fans out one reply fetch per plurk (see [`crate::replies`]);
//! the driver only joins them once the timeline is exhausted.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::aggregate::Aggregator;
use crate::contract::PlurkApi;
use crate::error::BackupError;
use crate::replies::{ReplyFetches, RetryPolicy};

/// Server and client clocks can disagree by up to 26 hours across time zones;
/// starting one day ahead keeps the newest plurks inside the first page.
pub fn initial_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Fetching(DateTime<Utc>),
    Done,
}

/// Fetches the full history into `aggregator`, starting below `first_cutoff`.
///
/// Returns the number of pages that contained plurks. Every spawned reply fetch
/// has finished, and its replies are attached, before this returns `Ok`. On
/// `Err` every outstanding reply fetch has been aborted.
pub async fn collect(
    api: Arc<dyn PlurkApi>,
    aggregator: &mut Aggregator,
    page_size: u32,
    policy: RetryPolicy,
    first_cutoff: DateTime<Utc>,
) -> Result<usize, BackupError> {
    let directory = aggregator.directory();
    let mut fetches = ReplyFetches::new();
    let mut pages = 0;
    let mut state = State::Fetching(first_cutoff);

    while let State::Fetching(cutoff) = state {
        debug!(cutoff = %cutoff, page_size, "Requesting timeline page");
        let page = api.fetch_own_posts(cutoff, page_size).await?;

        let Some(oldest) = page.posts.last().map(|p| p.posted) else {
            state = State::Done;
            continue;
        };
        pages += 1;
        info!(page = pages, plurks = page.posts.len(), oldest = %oldest, "Fetched timeline page");

        aggregator.merge_identities(page.identities);
        fetches.spawn_for(&api, &page.posts, &directory, policy);

        let mut batch = page.posts;
        batch.reverse();
        aggregator.append_posts(batch);

        state = State::Fetching(oldest);
    }

    info!(outstanding = fetches.len(), "Waiting for outstanding response fetches");
    // Posts were fetched newest first and are held oldest first, all in front of
    // anything the aggregator held before.
    let fetched = fetches.len();
    let replies = fetches.join().await?;
    aggregator.attach_replies(
        replies
            .into_iter()
            .map(|(sequence, replies)| (fetched - 1 - sequence, replies)),
    );
    Ok(pages)
}
