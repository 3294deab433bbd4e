use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use time::{format_description::well_known::Rfc3339, macros::format_description};

use crate::{
    application::{
        context::{Principal, RequestContext},
        error::HttpError,
        repos::PostsRepo,
    },
    domain::types::PostId,
    presentation::views::{
        PostTemplate, PostView, render_not_found_response, render_template_response,
    },
};

use super::{
    HostState, health_response,
    middleware::{log_responses, set_request_context},
    repo_error_to_http,
};

pub fn build_router(state: HostState) -> Router {
    Router::new()
        .route("/posts/{id}", get(post_detail))
        .route("/health", get(health_response))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn post_detail(State(state): State<HostState>, Path(id): Path<PostId>) -> Response {
    const SOURCE: &str = "infra::http::post_detail";

    let post = match state.posts.find_by_id(id) {
        Ok(Some(post)) if post.status.is_public() => post,
        Ok(_) => return render_not_found_response(format!("post `{id}` is not published")),
        Err(err) => return repo_error_to_http(SOURCE, err).into_response(),
    };

    let ctx = RequestContext::new(Principal::anonymous()).with_current_post(id);
    let body_html = match state.hooks.filter_content(&ctx, post.body) {
        Ok(html) => html,
        Err(err) => return HttpError::from(err).into_response(),
    };

    let view = PostView {
        title: post.title,
        body_html,
        published: post
            .updated_at
            .format(format_description!("[month repr:long] [day padding:none], [year]"))
            .unwrap_or_default(),
        iso_date: post.updated_at.format(&Rfc3339).unwrap_or_default(),
    };

    render_template_response(PostTemplate { view }, StatusCode::OK)
}
