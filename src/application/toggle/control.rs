use askama::Template;

use crate::application::{context::RequestContext, security::post_nonce_action};
use crate::domain::entities::PostRecord;
use crate::presentation::views::{ToggleControlTemplate, ToggleControlView};

use super::{MarkdownToggle, NONCE_FIELD, TOGGLE_FIELD, ToggleError};

impl MarkdownToggle {
    /// Submit-box fragment: current state, the hidden flag field, a nonce
    /// bound to the post, and a button that flips the flag and submits.
    pub fn render_toggle_control(
        &self,
        ctx: &RequestContext,
        post: &PostRecord,
    ) -> Result<String, ToggleError> {
        let enabled = self.is_markdown_enabled(ctx, Some(post))?;
        let nonce = self
            .deps
            .nonces
            .issue(&post_nonce_action(post.id), &ctx.principal);

        let view = ToggleControlView {
            post_id: post.id.get(),
            enabled,
            field_name: TOGGLE_FIELD,
            current_value: if enabled { "1" } else { "0" },
            next_value: if enabled { "0" } else { "1" },
            nonce_field: NONCE_FIELD,
            nonce,
            action_label: if enabled {
                "Disable Markdown"
            } else {
                "Enable Markdown"
            },
        };

        Ok(ToggleControlTemplate { view }.render()?)
    }
}
