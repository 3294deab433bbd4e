//! Named extension points of the host request lifecycle.
//!
//! Handlers subscribe per extension point with a priority; lower priorities
//! run first and equal priorities run in registration order. Filters thread
//! their value through every subscriber in turn.

use std::sync::{Arc, RwLock};

use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::application::{
    context::RequestContext,
    convert::autop,
    toggle::{CodeEditorHost, EditorSettings, MarkdownToggle, ToggleError},
};
use crate::domain::{entities::PostRecord, types::PostId};
use crate::infra::lock::{rw_read, rw_write};

const SOURCE: &str = "application::hooks";

/// Priority hosts give their own filters.
pub const DEFAULT_PRIORITY: i32 = 10;

/// The controller renders Markdown just ahead of the host's `autop` filter.
pub const CONTENT_FILTER_PRIORITY: i32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionPoint {
    SubmitBoxActions,
    SavePost,
    EditorSettings,
    AdminEnqueueScripts,
    ContentFilter,
}

pub trait PostHooks: Send + Sync {
    /// Registration key. Registering a second handler under the same name is
    /// a no-op.
    fn name(&self) -> &'static str;

    /// Priority at `point`, or `None` when the handler does not subscribe.
    fn priority(&self, point: ExtensionPoint) -> Option<i32>;

    fn submit_box_actions(
        &self,
        _ctx: &RequestContext,
        _post: &PostRecord,
    ) -> Result<Option<String>, ToggleError> {
        Ok(None)
    }

    fn save_post(
        &self,
        _ctx: &RequestContext,
        _post_id: PostId,
        _post: &PostRecord,
    ) -> Result<(), ToggleError> {
        Ok(())
    }

    fn editor_settings(
        &self,
        _ctx: &RequestContext,
        settings: EditorSettings,
    ) -> Result<EditorSettings, ToggleError> {
        Ok(settings)
    }

    fn enqueue_admin_scripts(
        &self,
        _ctx: &RequestContext,
        _host: &mut dyn CodeEditorHost,
    ) -> Result<(), ToggleError> {
        Ok(())
    }

    fn filter_content(&self, _ctx: &RequestContext, content: String) -> Result<String, ToggleError> {
        Ok(content)
    }
}

#[derive(Default)]
pub struct HookRegistry {
    handlers: RwLock<Vec<Arc<dyn PostHooks>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when a handler with the same name is already present.
    pub fn register(&self, handler: Arc<dyn PostHooks>) -> bool {
        let mut handlers = rw_write(&self.handlers, SOURCE, "register");
        if handlers
            .iter()
            .any(|existing| existing.name() == handler.name())
        {
            debug!(
                target = "mdtoggle::hooks",
                handler = handler.name(),
                "handler already registered"
            );
            return false;
        }
        handlers.push(handler);
        true
    }

    pub fn is_registered(&self, name: &str) -> bool {
        rw_read(&self.handlers, SOURCE, "is_registered")
            .iter()
            .any(|handler| handler.name() == name)
    }

    /// Handler names subscribed to `point`, in firing order.
    pub fn subscribers(&self, point: ExtensionPoint) -> Vec<&'static str> {
        self.ordered(point)
            .iter()
            .map(|handler| handler.name())
            .collect()
    }

    pub fn submit_box_actions(
        &self,
        ctx: &RequestContext,
        post: &PostRecord,
    ) -> Result<Vec<String>, ToggleError> {
        let mut fragments = Vec::new();
        for handler in self.ordered(ExtensionPoint::SubmitBoxActions) {
            if let Some(fragment) = handler.submit_box_actions(ctx, post)? {
                fragments.push(fragment);
            }
        }
        Ok(fragments)
    }

    pub fn save_post(
        &self,
        ctx: &RequestContext,
        post_id: PostId,
        post: &PostRecord,
    ) -> Result<(), ToggleError> {
        for handler in self.ordered(ExtensionPoint::SavePost) {
            handler.save_post(ctx, post_id, post)?;
        }
        Ok(())
    }

    pub fn editor_settings(
        &self,
        ctx: &RequestContext,
        settings: EditorSettings,
    ) -> Result<EditorSettings, ToggleError> {
        self.ordered(ExtensionPoint::EditorSettings)
            .iter()
            .try_fold(settings, |settings, handler| {
                handler.editor_settings(ctx, settings)
            })
    }

    pub fn enqueue_admin_scripts(
        &self,
        ctx: &RequestContext,
        host: &mut dyn CodeEditorHost,
    ) -> Result<(), ToggleError> {
        for handler in self.ordered(ExtensionPoint::AdminEnqueueScripts) {
            handler.enqueue_admin_scripts(ctx, host)?;
        }
        Ok(())
    }

    pub fn filter_content(
        &self,
        ctx: &RequestContext,
        content: String,
    ) -> Result<String, ToggleError> {
        self.ordered(ExtensionPoint::ContentFilter)
            .iter()
            .try_fold(content, |content, handler| {
                handler.filter_content(ctx, content)
            })
    }

    /// Snapshot of the subscribers, so handlers may fire hooks re-entrantly.
    fn ordered(&self, point: ExtensionPoint) -> Vec<Arc<dyn PostHooks>> {
        let handlers = rw_read(&self.handlers, SOURCE, "ordered");
        let mut subscribed: Vec<(i32, Arc<dyn PostHooks>)> = handlers
            .iter()
            .filter_map(|handler| {
                handler
                    .priority(point)
                    .map(|priority| (priority, Arc::clone(handler)))
            })
            .collect();
        drop(handlers);

        subscribed.sort_by_key(|(priority, _)| *priority);
        subscribed.into_iter().map(|(_, handler)| handler).collect()
    }
}

impl PostHooks for MarkdownToggle {
    fn name(&self) -> &'static str {
        "mdtoggle"
    }

    fn priority(&self, point: ExtensionPoint) -> Option<i32> {
        Some(match point {
            ExtensionPoint::ContentFilter => CONTENT_FILTER_PRIORITY,
            _ => DEFAULT_PRIORITY,
        })
    }

    fn submit_box_actions(
        &self,
        ctx: &RequestContext,
        post: &PostRecord,
    ) -> Result<Option<String>, ToggleError> {
        self.render_toggle_control(ctx, post).map(Some)
    }

    fn save_post(
        &self,
        ctx: &RequestContext,
        post_id: PostId,
        post: &PostRecord,
    ) -> Result<(), ToggleError> {
        let outcome = self.on_save(ctx, post_id, post)?;
        debug!(
            target = "mdtoggle::hooks",
            post_id = %post_id,
            outcome = ?outcome,
            "save_post handled"
        );
        Ok(())
    }

    fn editor_settings(
        &self,
        ctx: &RequestContext,
        settings: EditorSettings,
    ) -> Result<EditorSettings, ToggleError> {
        self.adjust_editor_settings(ctx, settings)
    }

    fn enqueue_admin_scripts(
        &self,
        ctx: &RequestContext,
        host: &mut dyn CodeEditorHost,
    ) -> Result<(), ToggleError> {
        self.install_markdown_editor(ctx, host).map(|_| ())
    }

    fn filter_content(&self, ctx: &RequestContext, content: String) -> Result<String, ToggleError> {
        self.render_display_content(ctx, &content)
    }
}

/// The host's own paragraph filter on displayed content.
#[derive(Debug, Default)]
pub struct AutopFilter;

impl PostHooks for AutopFilter {
    fn name(&self) -> &'static str {
        "autop"
    }

    fn priority(&self, point: ExtensionPoint) -> Option<i32> {
        (point == ExtensionPoint::ContentFilter).then_some(DEFAULT_PRIORITY)
    }

    fn filter_content(&self, _ctx: &RequestContext, content: String) -> Result<String, ToggleError> {
        Ok(autop(&content))
    }
}

/// Holds the one controller of a host. Installing constructs the controller
/// and registers its hooks on the first call only.
#[derive(Default)]
pub struct PluginSlot {
    controller: OnceCell<Arc<MarkdownToggle>>,
}

impl PluginSlot {
    pub const fn new() -> Self {
        Self {
            controller: OnceCell::new(),
        }
    }

    pub fn get_or_install<F>(&self, registry: &HookRegistry, build: F) -> Arc<MarkdownToggle>
    where
        F: FnOnce() -> MarkdownToggle,
    {
        Arc::clone(self.controller.get_or_init(|| {
            let controller = Arc::new(build());
            let handler: Arc<dyn PostHooks> = controller.clone();
            registry.register(handler);
            info!(
                target = "mdtoggle::hooks",
                handler = controller.name(),
                "markdown toggle installed"
            );
            controller
        }))
    }

    pub fn get(&self) -> Option<&Arc<MarkdownToggle>> {
        self.controller.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str, Option<i32>);

    impl PostHooks for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn priority(&self, _point: ExtensionPoint) -> Option<i32> {
            self.1
        }

        fn filter_content(
            &self,
            _ctx: &RequestContext,
            content: String,
        ) -> Result<String, ToggleError> {
            Ok(format!("{content}[{}]", self.0))
        }
    }

    #[test]
    fn registration_is_idempotent_by_name() {
        let registry = HookRegistry::new();
        assert!(registry.register(Arc::new(Named("a", Some(10)))));
        assert!(!registry.register(Arc::new(Named("a", Some(1)))));
        assert_eq!(registry.subscribers(ExtensionPoint::ContentFilter), ["a"]);
    }

    #[test]
    fn filters_run_by_priority_then_registration_order() {
        let registry = HookRegistry::new();
        registry.register(Arc::new(Named("late", Some(20))));
        registry.register(Arc::new(Named("first", Some(5))));
        registry.register(Arc::new(Named("second", Some(5))));
        registry.register(Arc::new(Named("silent", None)));

        let out = registry
            .filter_content(&RequestContext::default(), String::new())
            .expect("filters succeed");
        assert_eq!(out, "[first][second][late]");
    }

    #[test]
    fn autop_filter_only_subscribes_to_content() {
        let filter = AutopFilter;
        assert_eq!(filter.priority(ExtensionPoint::ContentFilter), Some(10));
        assert_eq!(filter.priority(ExtensionPoint::SavePost), None);
    }
}
