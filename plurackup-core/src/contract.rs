//! # contract: seams between the pipeline and its collaborators
//!
//! Two traits live here:
//! - [`PlurkApi`]: the handful of remote calls the backup needs. Implemented by
//!   [`crate::client::PlurkClient`] and, in tests, by the generated `MockPlurkApi`.
//! - [`Renderer`]: the prepare / write / postpare lifecycle every output format follows.
//!
//! The types exchanged across [`PlurkApi`] are already decoded into domain
//! values; wire formats stay inside the client.
//!
//! ## Mocking
//! `PlurkApi` is annotated for `mockall` and exported under the
//! `test-export-mocks` feature so integration tests can script server behaviour.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::{ClientError, RenderError};
use crate::model::{Identity, IdentityDirectory, Post, Reply};

/// Result of a login attempt. A rejection is a normal response, not a transport error.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    /// Session established; carries the owner's profile.
    Authenticated(Identity),
    /// Server answered with an `error_text` (bad credentials, too many logins...).
    Rejected(String),
}

/// One page of the owner's timeline, newest first as the server returns it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostsPage {
    pub posts: Vec<Post>,
    pub identities: IdentityDirectory,
}

/// A decoded response listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepliesPage {
    pub replies: Vec<Reply>,
    pub identities: IdentityDirectory,
}

/// Response listings come back malformed intermittently; callers decide whether to retry.
#[derive(Debug, Clone, PartialEq)]
pub enum RepliesOutcome {
    Replies(RepliesPage),
    /// Missing `responses`, an `error_text`, or otherwise undecodable. Carries a reason for logs.
    Malformed(String),
}

/// The remote calls used by a backup run. Session state is owned by the implementor.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PlurkApi: Send + Sync {
    /// Log in over the secured transport and keep the session for later calls.
    async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, ClientError>;

    /// End the session.
    async fn logout(&self) -> Result<(), ClientError>;

    /// Fetch up to `limit` of the owner's plurks posted before `before`.
    async fn fetch_own_posts(
        &self,
        before: DateTime<Utc>,
        limit: u32,
    ) -> Result<PostsPage, ClientError>;

    /// Fetch the responses of `plurk_id`, starting at response offset `from_response`.
    async fn fetch_replies(
        &self,
        plurk_id: i64,
        from_response: u32,
    ) -> Result<RepliesOutcome, ClientError>;
}

/// Output format lifecycle: `prepare` → `write_posts` → `postpare`.
pub trait Renderer: Send {
    /// Open the destination and write any preamble.
    fn prepare(&mut self) -> Result<(), RenderError>;

    /// Serialize the whole dataset. `posts` are oldest first.
    fn write_posts(
        &mut self,
        posts: &[Post],
        identities: &IdentityDirectory,
    ) -> Result<(), RenderError>;

    /// Write the trailer and close the destination.
    fn postpare(&mut self) -> Result<(), RenderError>;
}
