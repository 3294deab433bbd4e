use crate::application::error::{ErrorReport, HttpError};
use crate::application::toggle::EditorSettings;
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(detail: impl Into<String>) -> Response {
    let view = ErrorPageView {
        title: "Not found".to_string(),
        message: "The requested post does not exist.".to_string(),
    };
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        detail,
    )
    .attach(&mut response);
    response
}

/// Submit-box fragment switching a post between Markdown and HTML.
pub struct ToggleControlView {
    pub post_id: u64,
    pub enabled: bool,
    pub field_name: &'static str,
    pub current_value: &'static str,
    pub next_value: &'static str,
    pub nonce_field: &'static str,
    pub nonce: String,
    pub action_label: &'static str,
}

#[derive(Template)]
#[template(path = "toggle_control.html")]
pub struct ToggleControlTemplate {
    pub view: ToggleControlView,
}

pub struct InlineScriptView {
    pub handle: String,
    pub script: String,
}

pub struct AdminPostEditView {
    pub post_id: u64,
    pub title: String,
    pub body: String,
    pub status: &'static str,
    pub form_action: String,
    pub textarea_id: String,
    /// Pre-rendered fragments contributed by submit-box hooks.
    pub submit_box: Vec<String>,
    pub settings: EditorSettings,
    pub code_editor: Option<String>,
    pub inline_scripts: Vec<InlineScriptView>,
    pub saved: bool,
}

#[derive(Template)]
#[template(path = "admin/post_edit.html")]
pub struct AdminPostEditTemplate {
    pub view: AdminPostEditView,
}

pub struct PostView {
    pub title: String,
    pub body_html: String,
    pub published: String,
    pub iso_date: String,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: PostView,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: ErrorPageView,
}
