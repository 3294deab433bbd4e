use std::sync::Arc;

use crate::application::{
    context::{RequestContext, resolve_current_post},
    convert::{HtmlToMarkdown, MarkdownRenderer},
    repos::{PostMetaRepo, PostsRepo, RenderCacheRepo},
    security::{NonceService, PostPermissions},
};
use crate::domain::{
    entities::PostRecord,
    flag::{META_KEY, MarkdownFlag},
};

use super::{DefaultPolicy, EditorConfig, ToggleError};

/// Collaborators the controller is built from.
#[derive(Clone)]
pub struct ToggleDeps {
    pub posts: Arc<dyn PostsRepo>,
    pub meta: Arc<dyn PostMetaRepo>,
    pub cache: Arc<dyn RenderCacheRepo>,
    pub renderer: Arc<dyn MarkdownRenderer>,
    pub html_converter: Arc<dyn HtmlToMarkdown>,
    pub nonces: Arc<dyn NonceService>,
    pub permissions: Arc<dyn PostPermissions>,
    pub default_policy: DefaultPolicy,
    pub editor: EditorConfig,
}

pub struct MarkdownToggle {
    pub(super) deps: ToggleDeps,
}

impl MarkdownToggle {
    pub fn new(deps: ToggleDeps) -> Self {
        Self { deps }
    }

    /// Whether `post` (or, when absent, the current post of `ctx`) is
    /// authored in Markdown. An unresolvable post falls back to the default
    /// policy.
    pub fn is_markdown_enabled(
        &self,
        ctx: &RequestContext,
        post: Option<&PostRecord>,
    ) -> Result<bool, ToggleError> {
        match post {
            Some(post) => self.enabled_for(Some(post)),
            None => {
                let resolved = resolve_current_post(ctx, self.deps.posts.as_ref())?;
                self.enabled_for(resolved.as_ref())
            }
        }
    }

    pub(super) fn enabled_for(&self, post: Option<&PostRecord>) -> Result<bool, ToggleError> {
        let flag = self.flag_for(post)?;
        Ok(match flag {
            MarkdownFlag::Unset => self.deps.default_policy.evaluate(post),
            explicit => explicit.resolve(false),
        })
    }

    pub(super) fn flag_for(&self, post: Option<&PostRecord>) -> Result<MarkdownFlag, ToggleError> {
        let Some(post) = post else {
            return Ok(MarkdownFlag::Unset);
        };
        let raw = self.deps.meta.get_meta(post.id, META_KEY)?;
        Ok(MarkdownFlag::from_meta(raw.as_deref()))
    }
}
