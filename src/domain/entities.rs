//! Domain entities mirrored from the host post store.

use serde::Serialize;
use time::OffsetDateTime;

use super::types::{PostId, PostStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: PostId,
    pub title: String,
    pub body: String,
    pub status: PostStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
