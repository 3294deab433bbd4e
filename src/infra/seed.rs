//! TOML fixture the bundled host loads its posts and metadata from.
//!
//! ```toml
//! [[posts]]
//! id = 1
//! title = "Hello"
//! status = "published"
//! markdown = true
//! body = """
//! # Hello
//! """
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use time::OffsetDateTime;

use crate::domain::{
    entities::PostRecord,
    error::DomainError,
    flag::{META_KEY, MarkdownFlag},
    types::{PostId, PostStatus},
};

use super::error::InfraError;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SeedFile {
    posts: Vec<SeedPost>,
}

#[derive(Debug, Deserialize)]
struct SeedPost {
    id: PostId,
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    status: PostStatus,
    /// Shorthand for the Markdown flag.
    markdown: Option<bool>,
    #[serde(default)]
    meta: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
pub struct SeedContent {
    pub posts: Vec<PostRecord>,
    pub meta: Vec<(PostId, String, String)>,
}

pub async fn load_seed_file(path: &Path) -> Result<SeedContent, InfraError> {
    let text = tokio::fs::read_to_string(path).await?;
    parse_seed(&text).map_err(|err| InfraError::seed(path.display().to_string(), err.to_string()))
}

pub fn parse_seed(text: &str) -> Result<SeedContent, DomainError> {
    let file: SeedFile = toml::from_str(text)
        .map_err(|err| DomainError::validation(format!("malformed seed: {err}")))?;

    let now = OffsetDateTime::now_utc();
    let mut seen = HashSet::new();
    let mut content = SeedContent::default();

    for post in file.posts {
        if !seen.insert(post.id) {
            return Err(DomainError::invariant(format!(
                "post id {} appears more than once",
                post.id
            )));
        }

        for (key, value) in post.meta {
            content.meta.push((post.id, key, value));
        }
        if let Some(value) = post
            .markdown
            .and_then(|enabled| MarkdownFlag::from_submission(enabled).as_meta_value())
        {
            content
                .meta
                .retain(|(id, key, _)| *id != post.id || key != META_KEY);
            content
                .meta
                .push((post.id, META_KEY.to_string(), value.to_string()));
        }

        content.posts.push(PostRecord {
            id: post.id,
            title: post.title,
            body: post.body,
            status: post.status,
            created_at: now,
            updated_at: now,
        });
    }

    Ok(content)
}
