use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use clap::Parser;
use http_body_util::BodyExt;
use mdtoggle::application::repos::PostsRepo;
use mdtoggle::config::{self, CliArgs};
use mdtoggle::domain::{flag::META_KEY, types::PostId};
use mdtoggle::infra::{
    http::{self, HostState, REMOTE_USER_HEADER},
    seed::parse_seed,
};
use tower::ServiceExt;

const SEED: &str = include_str!("../content/posts.toml");

fn host() -> HostState {
    let args = CliArgs::parse_from(["mdtoggle", "serve"]);
    let settings = config::load(&args).expect("settings load");
    let seed = parse_seed(SEED).expect("bundled seed parses");
    HostState::build(&settings, seed)
}

fn post_id(id: u64) -> PostId {
    PostId::new(id).expect("non-zero id")
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build")
}

fn post_form(uri: &str, fields: &[(&str, &str)], user: Option<&str>) -> Request<Body> {
    let body = fields
        .iter()
        .map(|(key, value)| format!("{}={}", form_encode(key), form_encode(value)))
        .collect::<Vec<_>>()
        .join("&");

    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(user) = user {
        builder = builder.header(REMOTE_USER_HEADER, user);
    }
    builder.body(Body::from(body)).expect("request should build")
}

fn form_encode(value: &str) -> String {
    value
        .bytes()
        .map(|byte| match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => {
                (byte as char).to_string()
            }
            _ => format!("%{byte:02X}"),
        })
        .collect()
}

async fn body_text(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

fn extract_nonce(page: &str) -> String {
    let marker = "name=\"_mdtoggle_nonce\" value=\"";
    let start = page.find(marker).expect("nonce field present") + marker.len();
    let end = page[start..].find('"').expect("nonce value terminated");
    page[start..start + end].to_string()
}

#[tokio::test]
async fn health_endpoints_return_no_content() {
    let state = host();
    let public = http::build_router(state.clone());
    let admin = http::build_admin_router(state);

    assert_eq!(
        send(&public, get("/health")).await.status(),
        StatusCode::NO_CONTENT
    );
    assert_eq!(
        send(&admin, get("/health")).await.status(),
        StatusCode::NO_CONTENT
    );
}

#[tokio::test]
async fn markdown_post_is_rendered_and_cached() {
    let state = host();
    let public = http::build_router(state.clone());

    let response = send(&public, get("/posts/1")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("<strong>Markdown</strong>"));
    assert!(!page.contains("# Hello, Markdown"));
    assert_eq!(state.cache.len(), 1);
}

#[tokio::test]
async fn html_post_passes_through() {
    let public = http::build_router(host());

    let page = body_text(send(&public, get("/posts/2")).await).await;
    assert!(page.contains("<h2>Classic HTML</h2>"));
    assert!(page.contains("<em>native</em>"));
}

#[tokio::test]
async fn drafts_and_unknown_posts_are_not_found() {
    let public = http::build_router(host());

    assert_eq!(
        send(&public, get("/posts/3")).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        send(&public, get("/posts/404")).await.status(),
        StatusCode::NOT_FOUND
    );
    assert!(
        send(&public, get("/posts/0"))
            .await
            .status()
            .is_client_error()
    );
}

#[tokio::test]
async fn edit_screen_switches_to_code_editor_for_markdown_posts() {
    let admin = http::build_admin_router(host());

    let markdown = body_text(send(&admin, get("/admin/posts/1/edit")).await).await;
    assert!(markdown.contains("Disable Markdown"));
    assert!(markdown.contains("data-code-editor=\"text/x-markdown\""));
    assert!(markdown.contains("mdtoggleCodeEditor.initialize"));
    assert!(!markdown.contains("Add Media"));

    let html = body_text(send(&admin, get("/admin/posts/2/edit")).await).await;
    assert!(html.contains("Enable Markdown"));
    assert!(html.contains("Add Media"));
    assert!(!html.contains("data-code-editor"));
}

#[tokio::test]
async fn enabling_markdown_from_the_editor_converts_the_body() {
    let state = host();
    let admin = http::build_admin_router(state.clone());

    let page = body_text(send(&admin, get("/admin/posts/2/edit")).await).await;
    let nonce = extract_nonce(&page);
    let original = state
        .posts
        .find_by_id(post_id(2))
        .expect("lookup")
        .expect("post exists");

    let response = send(
        &admin,
        post_form(
            "/admin/posts/2/edit",
            &[
                ("title", "Classic HTML"),
                ("body", &original.body),
                (META_KEY, "1"),
                ("_mdtoggle_nonce", &nonce),
            ],
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok()),
        Some("/admin/posts/2/edit?saved=1")
    );

    let converted = state
        .posts
        .find_by_id(post_id(2))
        .expect("lookup")
        .expect("post exists");
    assert!(converted.body.contains("## Classic HTML"));
    assert!(!converted.body.contains("<h2>"));
}

#[tokio::test]
async fn nonce_for_another_user_is_ignored() {
    let state = host();
    let admin = http::build_admin_router(state.clone());

    let page = body_text(send(&admin, get("/admin/posts/2/edit")).await).await;
    let nonce = extract_nonce(&page);

    let response = send(
        &admin,
        post_form(
            "/admin/posts/2/edit",
            &[
                ("title", "Classic HTML"),
                ("body", "<p>edited</p>"),
                (META_KEY, "1"),
                ("_mdtoggle_nonce", &nonce),
            ],
            Some("mallory"),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let post = state
        .posts
        .find_by_id(post_id(2))
        .expect("lookup")
        .expect("post exists");
    assert_eq!(post.body, "<p>edited</p>");

    let plugin = state.plugin.get().expect("plugin installed");
    assert!(
        !plugin
            .is_markdown_enabled(&Default::default(), Some(&post))
            .expect("flag lookup")
    );
}

#[tokio::test]
async fn saving_unknown_post_is_not_found() {
    let admin = http::build_admin_router(host());

    let response = send(
        &admin,
        post_form("/admin/posts/77/edit", &[("title", "Missing")], None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn autosave_leaves_flag_alone() {
    let state = host();
    let admin = http::build_admin_router(state.clone());
    let page = body_text(send(&admin, get("/admin/posts/1/edit")).await).await;
    let nonce = extract_nonce(&page);

    send(
        &admin,
        post_form(
            "/admin/posts/1/edit",
            &[
                ("title", "Hello, Markdown"),
                ("body", "# Draft edit"),
                (META_KEY, "0"),
                ("_mdtoggle_nonce", &nonce),
                ("autosave", "1"),
            ],
            None,
        ),
    )
    .await;

    let post = state
        .posts
        .find_by_id(post_id(1))
        .expect("lookup")
        .expect("post exists");
    assert_eq!(post.body, "# Draft edit");

    let plugin = state.plugin.get().expect("plugin installed");
    assert!(
        plugin
            .is_markdown_enabled(&Default::default(), Some(&post))
            .expect("flag lookup")
    );
}
