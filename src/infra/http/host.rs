use std::sync::Arc;

use axum::http::HeaderMap;
use serde_json::{Value, json};

use crate::application::{
    context::Principal,
    convert::{ComrakMarkdown, Html5everMarkdown, MarkdownRenderer},
    hooks::{AutopFilter, HookRegistry, PluginSlot},
    security::{EditorRoster, HashNonce},
    toggle::{CodeEditorHost, DefaultPolicy, EditorConfig, MarkdownToggle, ToggleDeps},
};
use crate::config::Settings;
use crate::infra::{
    cache::RenderCache,
    memory::{MemoryMeta, MemoryPosts},
    seed::SeedContent,
};

/// Header a fronting proxy uses to name the acting user.
pub const REMOTE_USER_HEADER: &str = "x-remote-user";

/// Everything the admin and public routers share.
#[derive(Clone)]
pub struct HostState {
    pub posts: Arc<MemoryPosts>,
    pub cache: Arc<RenderCache>,
    pub hooks: Arc<HookRegistry>,
    pub plugin: Arc<PluginSlot>,
    pub default_principal: Principal,
    pub code_editor_enabled: bool,
    pub textarea_id: String,
}

impl HostState {
    pub fn build(settings: &Settings, seed: SeedContent) -> Self {
        let posts = Arc::new(MemoryPosts::new(seed.posts));
        let meta = Arc::new(MemoryMeta::with_entries(seed.meta));
        let cache = Arc::new(RenderCache::new(settings.cache.render_limit));
        let hooks = Arc::new(HookRegistry::new());
        posts.attach_pipeline(&hooks);

        let plugin = Arc::new(PluginSlot::new());
        plugin.get_or_install(&hooks, || {
            let renderer: Arc<dyn MarkdownRenderer> = if settings.markdown.sanitize {
                Arc::new(ComrakMarkdown::sanitized())
            } else {
                Arc::new(ComrakMarkdown::new())
            };
            let lifetime = time::Duration::try_from(settings.security.nonce_lifetime)
                .unwrap_or(time::Duration::DAY);

            MarkdownToggle::new(ToggleDeps {
                posts: posts.clone(),
                meta: meta.clone(),
                cache: cache.clone(),
                renderer,
                html_converter: Arc::new(Html5everMarkdown::new(settings.markdown.heading_style)),
                nonces: Arc::new(HashNonce::new(
                    settings.security.nonce_secret.clone(),
                    lifetime,
                )),
                permissions: Arc::new(EditorRoster::new(settings.admin.editors.clone())),
                default_policy: DefaultPolicy::fixed(settings.markdown.auto_enable),
                editor: EditorConfig {
                    supported_screens: settings.editor.supported_screens.clone(),
                    textarea_id: settings.editor.textarea_id.clone(),
                },
            })
        });
        hooks.register(Arc::new(AutopFilter));

        Self {
            posts,
            cache,
            hooks,
            plugin,
            default_principal: Principal::new(settings.admin.default_principal.clone()),
            code_editor_enabled: settings.editor.code_editor_enabled,
            textarea_id: settings.editor.textarea_id.clone(),
        }
    }

    pub fn principal(&self, headers: &HeaderMap) -> Principal {
        headers
            .get(REMOTE_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(Principal::new)
            .unwrap_or_else(|| self.default_principal.clone())
    }
}

/// Scripts and editor assets requested while composing one admin page.
#[derive(Debug, Default)]
pub struct EditorAssets {
    code_editor_enabled: bool,
    pub code_editor: Option<String>,
    pub inline_scripts: Vec<(String, String)>,
}

impl EditorAssets {
    pub fn new(code_editor_enabled: bool) -> Self {
        Self {
            code_editor_enabled,
            ..Self::default()
        }
    }
}

impl CodeEditorHost for EditorAssets {
    fn enqueue_code_editor(&mut self, mime: &str) -> Option<Value> {
        if !self.code_editor_enabled {
            return None;
        }
        self.code_editor = Some(mime.to_string());
        Some(json!({
            "codemirror": {
                "mode": mime,
                "lineNumbers": true,
                "lineWrapping": true,
                "indentUnit": 4,
            }
        }))
    }

    fn add_inline_script(&mut self, handle: &str, script: String) {
        self.inline_scripts.push((handle.to_string(), script));
    }
}
