//! Post editor screen: the admin surface the toggle plugs into.

use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    application::{
        context::{RequestContext, SaveForm},
        error::HttpError,
        repos::PostsRepo,
        toggle::EditorSettings,
    },
    domain::types::PostId,
    infra::memory::SavePostCommand,
    presentation::views::{
        AdminPostEditTemplate, AdminPostEditView, InlineScriptView, render_not_found_response,
        render_template_response,
    },
};

use super::{
    EditorAssets, HostState, health_response,
    middleware::{log_responses, set_request_context},
    repo_error_to_http,
};

const EDIT_SCREEN: &str = "post-edit";

pub fn build_admin_router(state: HostState) -> Router {
    Router::new()
        .route(
            "/admin/posts/{id}/edit",
            get(admin_post_edit).post(admin_post_update),
        )
        .route("/health", get(health_response))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EditQuery {
    saved: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdminPostForm {
    title: String,
    #[serde(default)]
    body: String,
    #[serde(rename = "mdtoggle_use_markdown", default)]
    use_markdown: Option<String>,
    #[serde(rename = "_mdtoggle_nonce", default)]
    nonce: Option<String>,
    #[serde(default)]
    autosave: Option<String>,
}

async fn admin_post_edit(
    State(state): State<HostState>,
    Path(id): Path<PostId>,
    Query(query): Query<EditQuery>,
    headers: HeaderMap,
) -> Response {
    const SOURCE: &str = "infra::http::admin_post_edit";

    let post = match state.posts.find_by_id(id) {
        Ok(Some(post)) => post,
        Ok(None) => return render_not_found_response(format!("post `{id}` could not be found")),
        Err(err) => return repo_error_to_http(SOURCE, err).into_response(),
    };

    let ctx = RequestContext::new(state.principal(&headers))
        .on_screen(EDIT_SCREEN)
        .with_current_post(id);

    let submit_box = match state.hooks.submit_box_actions(&ctx, &post) {
        Ok(fragments) => fragments,
        Err(err) => return HttpError::from(err).into_response(),
    };
    let settings = match state.hooks.editor_settings(&ctx, EditorSettings::default()) {
        Ok(settings) => settings,
        Err(err) => return HttpError::from(err).into_response(),
    };
    let mut assets = EditorAssets::new(state.code_editor_enabled);
    if let Err(err) = state.hooks.enqueue_admin_scripts(&ctx, &mut assets) {
        return HttpError::from(err).into_response();
    }

    let view = AdminPostEditView {
        post_id: post.id.get(),
        title: post.title,
        body: post.body,
        status: post.status.as_str(),
        form_action: format!("/admin/posts/{id}/edit"),
        textarea_id: state.textarea_id.clone(),
        submit_box,
        settings,
        code_editor: assets.code_editor,
        inline_scripts: assets
            .inline_scripts
            .into_iter()
            .map(|(handle, script)| InlineScriptView { handle, script })
            .collect(),
        saved: query.saved.as_deref() == Some("1"),
    };

    render_template_response(AdminPostEditTemplate { view }, StatusCode::OK)
}

async fn admin_post_update(
    State(state): State<HostState>,
    Path(id): Path<PostId>,
    headers: HeaderMap,
    Form(form): Form<AdminPostForm>,
) -> Response {
    const SOURCE: &str = "infra::http::admin_post_update";

    let save_form = SaveForm {
        use_markdown: form.use_markdown,
        nonce: form.nonce,
    };
    let autosave = form
        .autosave
        .as_deref()
        .is_some_and(|value| !value.is_empty() && value != "0");

    let ctx = RequestContext::new(state.principal(&headers))
        .on_screen(EDIT_SCREEN)
        .with_current_post(id)
        .with_form(save_form)
        .with_autosave(autosave);

    let command = SavePostCommand {
        id,
        title: form.title.trim().to_string(),
        body: form.body,
    };

    match state.posts.save_post(&ctx, command) {
        Ok(post) => {
            info!(
                target = "mdtoggle::http::admin",
                post_id = %post.id,
                principal = ctx.principal.name(),
                "post saved"
            );
            Redirect::to(&format!("/admin/posts/{id}/edit?saved=1")).into_response()
        }
        Err(err) => repo_error_to_http(SOURCE, err).into_response(),
    }
}
