//! In-memory backup state: plurks oldest first plus the shared identity directory.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::contract::Renderer;
use crate::error::RenderError;
use crate::model::{IdentityDirectory, Post, Reply};

/// Cloneable handle to the identity directory. Reply tasks each hold one.
///
/// The lock is taken only for the duration of a merge or a snapshot.
#[derive(Debug, Clone, Default)]
pub struct SharedDirectory {
    inner: Arc<Mutex<IdentityDirectory>>,
}

impl SharedDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last-write-wins union.
    pub fn merge(&self, identities: IdentityDirectory) {
        if identities.is_empty() {
            return;
        }
        self.lock().merge(identities);
    }

    pub fn snapshot(&self) -> IdentityDirectory {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn take(&self) -> IdentityDirectory {
        std::mem::take(&mut *self.lock())
    }

    // A panic in another merge cannot leave the map half-updated, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, IdentityDirectory> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Accumulates one backup run. Posts are appended by the pagination driver only.
#[derive(Debug, Default)]
pub struct Aggregator {
    posts: Vec<Post>,
    directory: SharedDirectory,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for concurrent identity merges.
    pub fn directory(&self) -> SharedDirectory {
        self.directory.clone()
    }

    pub fn merge_identities(&self, identities: IdentityDirectory) {
        self.directory.merge(identities);
    }

    /// Puts an oldest-first `batch` in front of everything accumulated so far.
    ///
    /// Batches therefore arrive newest batch first.
    pub fn append_posts(&mut self, batch: Vec<Post>) {
        debug!(batch = batch.len(), held = self.posts.len(), "Prepending plurk batch");
        let mut posts = batch;
        posts.append(&mut self.posts);
        self.posts = posts;
    }

    /// Assigns fetched replies by position in [`Aggregator::posts`].
    ///
    /// Positions rather than ids, so a plurk returned on two pages gets its list on both copies.
    /// Out-of-range positions are logged and dropped.
    pub fn attach_replies(&mut self, replies: impl IntoIterator<Item = (usize, Vec<Reply>)>) {
        for (position, found) in replies {
            match self.posts.get_mut(position) {
                Some(post) => post.replies = found,
                None => warn!(
                    position,
                    held = self.posts.len(),
                    "Fetched responses for a plurk that is not held"
                ),
            }
        }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn reply_count(&self) -> usize {
        self.posts.iter().map(|p| p.replies.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty() && self.directory.is_empty()
    }

    /// Hands the current dataset to `renderer`, then empties the aggregator.
    ///
    /// The state is cleared even when the renderer fails.
    pub fn flush(&mut self, renderer: &mut dyn Renderer) -> Result<(), RenderError> {
        let posts = std::mem::take(&mut self.posts);
        let identities = self.directory.take();
        renderer.write_posts(&posts, &identities)
    }
}
