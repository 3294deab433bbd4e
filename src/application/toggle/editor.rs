use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::application::context::RequestContext;

use super::{MarkdownToggle, ToggleError};

const TARGET: &str = "mdtoggle::toggle::editor";

pub const MARKDOWN_MIME: &str = "text/x-markdown";

/// Script handle the code editor assets are enqueued under.
pub const CODE_EDITOR_HANDLE: &str = "code-editor";

/// Settings the host uses to build the body editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditorSettings {
    pub autop: bool,
    pub media_buttons: bool,
    pub tinymce: bool,
    pub quicktags: bool,
    pub textarea_rows: u16,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            autop: true,
            media_buttons: true,
            tinymce: true,
            quicktags: true,
            textarea_rows: 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// Admin screens that edit a single post.
    pub supported_screens: Vec<String>,
    /// DOM id of the body textarea the code editor attaches to.
    pub textarea_id: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            supported_screens: vec!["post-edit".to_string(), "post-new".to_string()],
            textarea_id: "content".to_string(),
        }
    }
}

/// Host asset pipeline for the syntax-highlighting editor.
pub trait CodeEditorHost {
    /// Enqueue the code editor for `mime`. `None` when the host cannot
    /// provide one (feature off, user preference, ...).
    fn enqueue_code_editor(&mut self, mime: &str) -> Option<Value>;

    fn add_inline_script(&mut self, handle: &str, script: String);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorInstall {
    /// Not an editing screen, or the post is not Markdown.
    NotApplicable,
    /// The host has no code editor to offer.
    Unavailable,
    Installed,
}

impl MarkdownToggle {
    pub fn adjust_editor_settings(
        &self,
        ctx: &RequestContext,
        settings: EditorSettings,
    ) -> Result<EditorSettings, ToggleError> {
        if !self.markdown_screen(ctx)? {
            return Ok(settings);
        }

        Ok(EditorSettings {
            autop: false,
            media_buttons: false,
            tinymce: false,
            quicktags: false,
            ..settings
        })
    }

    pub fn install_markdown_editor(
        &self,
        ctx: &RequestContext,
        host: &mut dyn CodeEditorHost,
    ) -> Result<EditorInstall, ToggleError> {
        if !self.markdown_screen(ctx)? {
            return Ok(EditorInstall::NotApplicable);
        }

        let Some(settings) = host.enqueue_code_editor(MARKDOWN_MIME) else {
            debug!(target = TARGET, "code editor unavailable");
            return Ok(EditorInstall::Unavailable);
        };

        let textarea = Value::String(self.deps.editor.textarea_id.clone());
        host.add_inline_script(
            CODE_EDITOR_HANDLE,
            format!("window.mdtoggleCodeEditor.initialize({textarea}, {settings});"),
        );
        Ok(EditorInstall::Installed)
    }

    fn markdown_screen(&self, ctx: &RequestContext) -> Result<bool, ToggleError> {
        let supported = ctx.screen().is_some_and(|screen| {
            self.deps
                .editor
                .supported_screens
                .iter()
                .any(|candidate| candidate == screen)
        });
        if !supported {
            return Ok(false);
        }
        self.is_markdown_enabled(ctx, None)
    }
}
