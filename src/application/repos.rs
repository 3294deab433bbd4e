//! Repository traits describing the host storage the controller reads and writes.

use thiserror::Error;

use crate::application::context::RequestContext;
use crate::domain::entities::PostRecord;
use crate::domain::types::PostId;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct UpdatePostBody {
    pub id: PostId,
    pub body: String,
}

pub trait PostsRepo: Send + Sync {
    fn find_by_id(&self, id: PostId) -> Result<Option<PostRecord>, RepoError>;

    /// Persist a new body. Hosts with a save pipeline run it from here, under
    /// the same request context, so implementations may re-enter save hooks.
    fn update_post(
        &self,
        ctx: &RequestContext,
        params: UpdatePostBody,
    ) -> Result<PostRecord, RepoError>;
}

pub trait PostMetaRepo: Send + Sync {
    fn get_meta(&self, id: PostId, key: &str) -> Result<Option<String>, RepoError>;

    fn set_meta(&self, id: PostId, key: &str, value: &str) -> Result<(), RepoError>;
}

/// Transient store for rendered output. Entries carry no expiry of their own;
/// implementations may evict.
pub trait RenderCacheRepo: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, RepoError>;

    fn set(&self, key: &str, value: String) -> Result<(), RepoError>;

    fn delete(&self, key: &str) -> Result<(), RepoError>;
}
