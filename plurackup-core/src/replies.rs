//! Reply fetch coordinator: one task per plurk, identity merges under the shared lock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::aggregate::SharedDirectory;
use crate::contract::{PlurkApi, RepliesOutcome};
use crate::error::BackupError;
use crate::model::{format_server_time, Post, Reply};

/// How a malformed response listing is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    /// `None`: retry immediately and forever. A stuck plurk then stalls the run.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub fn forever() -> Self {
        Self { max_attempts: None }
    }

    pub fn limited(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
        }
    }
}

/// Replies of one plurk, tagged with the fetch sequence number of the post they belong to.
pub type FetchedReplies = (usize, Vec<Reply>);

/// Fetches every response of `plurk_id`, retrying malformed listings per `policy`.
///
/// Identities go into `directory`; the replies are returned rather than written
/// to the post, so each post's list has exactly one writer.
pub async fn fetch_replies_for(
    api: &dyn PlurkApi,
    plurk_id: i64,
    posted: &DateTime<Utc>,
    directory: &SharedDirectory,
    policy: RetryPolicy,
) -> Result<Vec<Reply>, BackupError> {
    let mut attempts: u32 = 0;
    let page = loop {
        attempts += 1;
        match api.fetch_replies(plurk_id, 0).await? {
            RepliesOutcome::Replies(page) => break page,
            RepliesOutcome::Malformed(reason) => {
                if policy.max_attempts.is_some_and(|max| attempts >= max) {
                    error!(plurk_id, attempts, reason = %reason, "Giving up on responses");
                    return Err(BackupError::RepliesExhausted {
                        plurk_id,
                        attempts,
                        reason,
                    });
                }
                warn!(plurk_id, attempts, reason = %reason, "Malformed responses, retrying");
                // Lets an abort land even when the API answers without suspending.
                tokio::task::yield_now().await;
            }
        }
    };

    directory.merge(page.identities);
    info!(
        plurk_id,
        posted = %format_server_time(posted),
        responses = page.replies.len(),
        "Consumed plurk"
    );
    Ok(page.replies)
}

/// The in-flight reply fetches of one run, in the order their posts were fetched.
///
/// Anything still running when this is dropped is aborted, so an early return
/// from the pipeline leaves no task calling the API.
#[derive(Default)]
pub struct ReplyFetches {
    handles: Vec<JoinHandle<Result<FetchedReplies, BackupError>>>,
}

impl ReplyFetches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Launches one task per post. Nothing caps the number in flight.
    ///
    /// Each task is tagged with its sequence number: 0 for the first post ever
    /// spawned, counting up across calls.
    pub fn spawn_for(
        &mut self,
        api: &Arc<dyn PlurkApi>,
        posts: &[Post],
        directory: &SharedDirectory,
        policy: RetryPolicy,
    ) {
        for post in posts {
            let sequence = self.handles.len();
            let api = Arc::clone(api);
            let directory = directory.clone();
            let (plurk_id, posted) = (post.id, post.posted);
            self.handles.push(tokio::spawn(async move {
                let replies =
                    fetch_replies_for(api.as_ref(), plurk_id, &posted, &directory, policy).await?;
                Ok((sequence, replies))
            }));
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for every task. The first failure is returned at once and the rest are aborted.
    pub async fn join(mut self) -> Result<Vec<FetchedReplies>, BackupError> {
        try_join_all(self.handles.iter_mut().map(|handle| async move { handle.await? })).await
    }
}

impl Drop for ReplyFetches {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}
