use tracing::{debug, info};

use crate::application::{
    context::RequestContext,
    convert::autop,
    repos::UpdatePostBody,
    security::post_nonce_action,
};
use crate::domain::{
    entities::PostRecord,
    flag::{META_KEY, MarkdownFlag},
    types::PostId,
};

use super::{MarkdownToggle, ToggleError, cache_key};

const TARGET: &str = "mdtoggle::toggle::save";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Autosave,
    MissingNonce,
    InvalidNonce,
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionDirection {
    ToMarkdown,
    ToHtml,
}

impl ConversionDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            ConversionDirection::ToMarkdown => "to_markdown",
            ConversionDirection::ToHtml => "to_html",
        }
    }
}

/// What a save did to the post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing was touched.
    Skipped(SkipReason),
    /// Cache invalidated; the stored flag already matched the submission.
    Unchanged,
    /// Body rewritten in the given direction and the new flag stored.
    Converted(ConversionDirection),
    /// New flag stored; the effective state did not change.
    FlagOnly,
    /// Save re-entered from an outer conversion; only the flag was stored.
    Nested,
}

impl MarkdownToggle {
    /// Save-pipeline handler. Authorization failures skip silently;
    /// conversion and storage failures propagate.
    pub fn on_save(
        &self,
        ctx: &RequestContext,
        post_id: PostId,
        post: &PostRecord,
    ) -> Result<SaveOutcome, ToggleError> {
        if let Some(reason) = self.authorize_save(ctx, post_id) {
            debug!(
                target = TARGET,
                post_id = %post_id,
                reason = ?reason,
                "skipping markdown toggle save"
            );
            return Ok(SaveOutcome::Skipped(reason));
        }

        self.deps.cache.delete(&cache_key(Some(post_id)))?;

        let old_raw = self.deps.meta.get_meta(post_id, META_KEY)?;
        let wants_markdown = ctx.form.as_ref().is_some_and(|form| form.wants_markdown());
        let new_flag = MarkdownFlag::from_submission(wants_markdown);
        let new_raw = new_flag.as_meta_value().unwrap_or("0");

        if old_raw.as_deref() == Some(new_raw) {
            return Ok(SaveOutcome::Unchanged);
        }

        if ctx.converting {
            self.deps.meta.set_meta(post_id, META_KEY, new_raw)?;
            debug!(
                target = TARGET,
                post_id = %post_id,
                flag = new_raw,
                "nested save stored flag without conversion"
            );
            return Ok(SaveOutcome::Nested);
        }

        let was_enabled = match MarkdownFlag::from_meta(old_raw.as_deref()) {
            MarkdownFlag::Unset => self.deps.default_policy.evaluate(Some(post)),
            explicit => explicit.resolve(false),
        };
        let now_enabled = new_flag.resolve(false);

        let direction = match (was_enabled, now_enabled) {
            (false, true) => Some(ConversionDirection::ToMarkdown),
            (true, false) => Some(ConversionDirection::ToHtml),
            _ => None,
        };

        if let Some(direction) = direction {
            let body = match direction {
                ConversionDirection::ToMarkdown => self
                    .deps
                    .html_converter
                    .to_markdown(&autop(&post.body))?,
                ConversionDirection::ToHtml => self.deps.renderer.to_html(&post.body)?,
            };

            self.deps
                .posts
                .update_post(
                    &ctx.within_conversion(),
                    UpdatePostBody { id: post_id, body },
                )?;

            info!(
                target = TARGET,
                post_id = %post_id,
                direction = direction.as_str(),
                "converted post body"
            );
        }

        self.deps.meta.set_meta(post_id, META_KEY, new_raw)?;

        Ok(direction.map_or(SaveOutcome::FlagOnly, SaveOutcome::Converted))
    }

    fn authorize_save(&self, ctx: &RequestContext, post_id: PostId) -> Option<SkipReason> {
        if ctx.autosave {
            return Some(SkipReason::Autosave);
        }

        let Some(token) = ctx
            .form
            .as_ref()
            .and_then(|form| form.nonce.as_deref())
            .filter(|token| !token.is_empty())
        else {
            return Some(SkipReason::MissingNonce);
        };

        if !self
            .deps
            .nonces
            .verify(token, &post_nonce_action(post_id), &ctx.principal)
        {
            return Some(SkipReason::InvalidNonce);
        }

        if !self.deps.permissions.can_edit_post(&ctx.principal, post_id) {
            return Some(SkipReason::Forbidden);
        }

        None
    }
}
