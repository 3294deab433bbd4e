//! Request-scoped context handed to every hook.
//!
//! Hosts usually keep this state in ambient globals (the post being edited or
//! displayed, the acting user, the submitted form). Here it travels explicitly.

use tracing::debug;

use crate::application::repos::{PostsRepo, RepoError};
use crate::domain::entities::PostRecord;
use crate::domain::types::PostId;

/// Acting user. An empty name is the anonymous visitor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal(String);

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn is_anonymous(&self) -> bool {
        self.0.is_empty()
    }
}

/// Form state submitted alongside a post save.
#[derive(Debug, Clone, Default)]
pub struct SaveForm {
    /// Raw value of the hidden toggle field.
    pub use_markdown: Option<String>,
    /// Raw value of the nonce field.
    pub nonce: Option<String>,
}

impl SaveForm {
    /// A submission is truthy unless it is missing, empty, or `"0"`.
    pub fn wants_markdown(&self) -> bool {
        self.use_markdown
            .as_deref()
            .is_some_and(|value| !value.is_empty() && value != "0")
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Admin screen being rendered, if any.
    pub screen: Option<String>,
    /// Post the host considers current for this request.
    pub current_post: Option<PostId>,
    /// Older ambient identifier consulted when the current post cannot be loaded.
    pub legacy_post_id: Option<PostId>,
    pub principal: Principal,
    pub autosave: bool,
    pub form: Option<SaveForm>,
    /// Set while this request is rewriting a post body. Saves that re-enter
    /// under it store the flag without converting again.
    pub converting: bool,
}

impl RequestContext {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            ..Self::default()
        }
    }

    pub fn on_screen(mut self, screen: impl Into<String>) -> Self {
        self.screen = Some(screen.into());
        self
    }

    pub fn with_current_post(mut self, id: PostId) -> Self {
        self.current_post = Some(id);
        self
    }

    pub fn with_legacy_post_id(mut self, id: PostId) -> Self {
        self.legacy_post_id = Some(id);
        self
    }

    pub fn with_form(mut self, form: SaveForm) -> Self {
        self.form = Some(form);
        self
    }

    pub fn with_autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }

    /// Copy of this context for hooks run by a body rewrite.
    pub fn within_conversion(&self) -> Self {
        Self {
            converting: true,
            ..self.clone()
        }
    }

    pub fn screen(&self) -> Option<&str> {
        self.screen.as_deref()
    }
}

/// Resolve the current post: the primary identifier first, then the legacy
/// ambient identifier. Returns `None` when neither resolves.
pub fn resolve_current_post(
    ctx: &RequestContext,
    posts: &dyn PostsRepo,
) -> Result<Option<PostRecord>, RepoError> {
    if let Some(id) = ctx.current_post
        && let Some(post) = posts.find_by_id(id)?
    {
        return Ok(Some(post));
    }

    match ctx.legacy_post_id {
        Some(id) => {
            debug!(
                target = "mdtoggle::context",
                post_id = %id,
                "resolving current post via legacy identifier"
            );
            posts.find_by_id(id)
        }
        None => Ok(None),
    }
}
