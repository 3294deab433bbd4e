use askama::Template;
use mdtoggle::presentation::views::{
    ErrorPageView, ErrorTemplate, ToggleControlTemplate, ToggleControlView,
};

fn toggle_control(enabled: bool) -> String {
    let view = ToggleControlView {
        post_id: 2,
        enabled,
        field_name: "mdtoggle_use_markdown",
        current_value: if enabled { "1" } else { "0" },
        next_value: if enabled { "0" } else { "1" },
        nonce_field: "_mdtoggle_nonce",
        nonce: "0123456789abcdef0123".to_string(),
        action_label: if enabled {
            "Disable Markdown"
        } else {
            "Enable Markdown"
        },
    };
    ToggleControlTemplate { view }
        .render()
        .expect("toggle control renders")
}

#[test]
fn toggle_control_disabled() {
    let html = toggle_control(false);
    insta::assert_snapshot!("toggle_control_disabled", html);
}

#[test]
fn toggle_control_enabled() {
    let html = toggle_control(true);
    insta::assert_snapshot!("toggle_control_enabled", html);
}

#[test]
fn error_page_escapes_message() {
    let view = ErrorPageView {
        title: "Not found".to_string(),
        message: "<b>post</b> missing".to_string(),
    };
    let html = ErrorTemplate { view }.render().expect("error page renders");

    assert!(!html.contains("<b>post</b>"));
    assert!(html.contains("missing"));
}
