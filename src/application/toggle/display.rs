use tracing::debug;

use crate::application::context::{RequestContext, resolve_current_post};

use super::{MarkdownToggle, ToggleError, cache_key};

const TARGET: &str = "mdtoggle::toggle::display";

impl MarkdownToggle {
    /// Display filter for the current post's body.
    ///
    /// Markdown off: the cache entry is dropped and `content` comes back
    /// untouched. Markdown on: a non-empty cached render is served, otherwise
    /// `content` is rendered and cached. An unresolved post (id `0`) is never
    /// served from or written to the cache.
    pub fn render_display_content(
        &self,
        ctx: &RequestContext,
        content: &str,
    ) -> Result<String, ToggleError> {
        let post = resolve_current_post(ctx, self.deps.posts.as_ref())?;
        let post_id = post.as_ref().map(|post| post.id);
        let key = cache_key(post_id);

        if !self.enabled_for(post.as_ref())? {
            self.deps.cache.delete(&key)?;
            return Ok(content.to_string());
        }

        if post_id.is_some()
            && let Some(cached) = self.deps.cache.get(&key)?
            && !cached.is_empty()
        {
            debug!(target = TARGET, key = %key, "serving cached render");
            return Ok(cached);
        }

        let rendered = self.deps.renderer.to_html(content)?;
        if post_id.is_some() {
            self.deps.cache.set(&key, rendered.clone())?;
        }
        debug!(
            target = TARGET,
            key = %key,
            cached = post_id.is_some(),
            "rendered markdown body"
        );
        Ok(rendered)
    }
}
