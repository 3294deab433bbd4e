//! In-memory post and metadata stores backing the bundled host.
//!
//! Saving a post runs the save pipeline of the attached hook registry, the
//! way a CMS fires its save hooks from inside its own update routine. Body
//! rewrites issued by a save hook therefore re-enter the pipeline.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, Weak};

use once_cell::sync::OnceCell;
use time::OffsetDateTime;
use tracing::debug;

use crate::application::{
    context::RequestContext,
    hooks::HookRegistry,
    repos::{PostMetaRepo, PostsRepo, RepoError, UpdatePostBody},
};
use crate::domain::{entities::PostRecord, types::PostId};

use super::lock::{rw_read, rw_write};

const POSTS_SOURCE: &str = "infra::memory::posts";
const META_SOURCE: &str = "infra::memory::meta";

/// Title and body submitted from the editor form.
#[derive(Debug, Clone)]
pub struct SavePostCommand {
    pub id: PostId,
    pub title: String,
    pub body: String,
}

#[derive(Default)]
pub struct MemoryPosts {
    posts: RwLock<BTreeMap<PostId, PostRecord>>,
    pipeline: OnceCell<Weak<HookRegistry>>,
}

impl MemoryPosts {
    pub fn new(records: impl IntoIterator<Item = PostRecord>) -> Self {
        Self {
            posts: RwLock::new(records.into_iter().map(|post| (post.id, post)).collect()),
            pipeline: OnceCell::new(),
        }
    }

    /// Route saves through `registry`. Only the first attachment sticks.
    pub fn attach_pipeline(&self, registry: &Arc<HookRegistry>) -> bool {
        self.pipeline.set(Arc::downgrade(registry)).is_ok()
    }

    pub fn list(&self) -> Vec<PostRecord> {
        rw_read(&self.posts, POSTS_SOURCE, "list")
            .values()
            .cloned()
            .collect()
    }

    /// Editor form save: store title and body, then run the save pipeline.
    pub fn save_post(
        &self,
        ctx: &RequestContext,
        command: SavePostCommand,
    ) -> Result<PostRecord, RepoError> {
        let record = self.write(command.id, |post| {
            post.title = command.title;
            post.body = command.body;
        })?;
        self.run_pipeline(ctx, &record)?;
        self.find_by_id(record.id)?.ok_or(RepoError::NotFound)
    }

    fn write(
        &self,
        id: PostId,
        apply: impl FnOnce(&mut PostRecord),
    ) -> Result<PostRecord, RepoError> {
        let mut posts = rw_write(&self.posts, POSTS_SOURCE, "write");
        let post = posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        apply(post);
        post.updated_at = OffsetDateTime::now_utc();
        Ok(post.clone())
    }

    fn run_pipeline(&self, ctx: &RequestContext, record: &PostRecord) -> Result<(), RepoError> {
        let Some(registry) = self.pipeline.get().and_then(Weak::upgrade) else {
            return Ok(());
        };
        debug!(
            target = "mdtoggle::memory",
            post_id = %record.id,
            "running save pipeline"
        );
        registry
            .save_post(ctx, record.id, record)
            .map_err(|err| RepoError::from_persistence(format!("save pipeline failed: {err}")))
    }
}

impl PostsRepo for MemoryPosts {
    fn find_by_id(&self, id: PostId) -> Result<Option<PostRecord>, RepoError> {
        Ok(rw_read(&self.posts, POSTS_SOURCE, "find_by_id")
            .get(&id)
            .cloned())
    }

    fn update_post(
        &self,
        ctx: &RequestContext,
        params: UpdatePostBody,
    ) -> Result<PostRecord, RepoError> {
        let record = self.write(params.id, |post| post.body = params.body)?;
        self.run_pipeline(ctx, &record)?;
        Ok(record)
    }
}

#[derive(Debug, Default)]
pub struct MemoryMeta {
    entries: RwLock<HashMap<(PostId, String), String>>,
}

impl MemoryMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (PostId, K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(id, key, value)| ((id, key.into()), value.into()))
                    .collect(),
            ),
        }
    }
}

impl PostMetaRepo for MemoryMeta {
    fn get_meta(&self, id: PostId, key: &str) -> Result<Option<String>, RepoError> {
        Ok(rw_read(&self.entries, META_SOURCE, "get_meta")
            .get(&(id, key.to_string()))
            .cloned())
    }

    fn set_meta(&self, id: PostId, key: &str, value: &str) -> Result<(), RepoError> {
        rw_write(&self.entries, META_SOURCE, "set_meta")
            .insert((id, key.to_string()), value.to_string());
        Ok(())
    }
}
