//! The Markdown toggle controller.
//!
//! One controller instance decides, per post, whether the body is Markdown,
//! converts the body when an editor flips the flag, filters the display
//! output through a render cache, and adjusts the editing screen.

mod control;
mod controller;
mod display;
mod editor;
mod policy;
mod save;

pub use controller::{MarkdownToggle, ToggleDeps};
pub use editor::{
    CODE_EDITOR_HANDLE, CodeEditorHost, EditorConfig, EditorInstall, EditorSettings,
    MARKDOWN_MIME,
};
pub use policy::DefaultPolicy;
pub use save::{ConversionDirection, SaveOutcome, SkipReason};

use thiserror::Error;

use crate::application::{convert::ConvertError, repos::RepoError};
use crate::domain::{flag::META_KEY, types::PostId};

/// Form field carrying the submitted flag.
pub const TOGGLE_FIELD: &str = META_KEY;

/// Form field carrying the save nonce.
pub const NONCE_FIELD: &str = "_mdtoggle_nonce";

#[derive(Debug, Error)]
pub enum ToggleError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error("toggle control rendering failed: {0}")]
    Template(#[from] askama::Error),
}

/// Render cache key for a post. `None` maps to the id `0`, which the
/// controller never serves or populates.
pub fn cache_key(post_id: Option<PostId>) -> String {
    format!("{META_KEY}_{}", post_id.map_or(0, PostId::get))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_keys_embed_the_post_id() {
        let id = PostId::new(42).expect("non-zero id");
        assert_eq!(cache_key(Some(id)), "mdtoggle_use_markdown_42");
        assert_eq!(cache_key(None), "mdtoggle_use_markdown_0");
    }
}
