use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use mdtoggle::application::{
    context::{Principal, RequestContext},
    convert::{ComrakMarkdown, Html5everMarkdown},
    repos::RenderCacheRepo,
    security::{EditorRoster, HashNonce},
    toggle::{DefaultPolicy, EditorConfig, MarkdownToggle, ToggleDeps, cache_key},
};
use mdtoggle::domain::{
    entities::PostRecord,
    flag::META_KEY,
    types::{PostId, PostStatus},
};
use mdtoggle::infra::{
    cache::{
        METRIC_RENDER_CACHE_EVICT, METRIC_RENDER_CACHE_HIT, METRIC_RENDER_CACHE_MISS, RenderCache,
    },
    memory::{MemoryMeta, MemoryPosts},
};
use serial_test::serial;
use time::OffsetDateTime;

fn sample_post(id: u64) -> PostRecord {
    PostRecord {
        id: PostId::new(id).expect("non-zero id"),
        title: format!("Metrics post {id}"),
        body: format!("# Post {id}"),
        status: PostStatus::Published,
        created_at: OffsetDateTime::now_utc(),
        updated_at: OffsetDateTime::now_utc(),
    }
}

#[test]
#[serial]
fn display_path_emits_render_cache_metrics() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let posts = Arc::new(MemoryPosts::new([sample_post(1), sample_post(2)]));
    let meta = Arc::new(MemoryMeta::with_entries(
        [1, 2].map(|id| (PostId::new(id).expect("non-zero id"), META_KEY, "1")),
    ));
    let cache = Arc::new(RenderCache::new(
        NonZeroUsize::new(1).expect("non-zero limit"),
    ));

    let controller = MarkdownToggle::new(ToggleDeps {
        posts: posts.clone(),
        meta,
        cache: cache.clone(),
        renderer: Arc::new(ComrakMarkdown::new()),
        html_converter: Arc::new(Html5everMarkdown::default()),
        nonces: Arc::new(HashNonce::new("metrics-test-secret", time::Duration::DAY)),
        permissions: Arc::new(EditorRoster::new(["admin"])),
        default_policy: DefaultPolicy::default(),
        editor: EditorConfig::default(),
    });

    // miss + populate, hit, then a second post evicts the first
    for id in [1, 1, 2] {
        let ctx = RequestContext::new(Principal::anonymous())
            .with_current_post(PostId::new(id).expect("non-zero id"));
        controller
            .render_display_content(&ctx, &format!("# Post {id}"))
            .expect("display succeeds");
    }
    assert_eq!(cache.len(), 1);
    assert!(
        cache
            .get(&cache_key(PostId::new(2)))
            .expect("cache lookup")
            .is_some()
    );

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter(|(_, _, _, value)| matches!(value, DebugValue::Counter(count) if *count > 0))
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    for metric in [
        METRIC_RENDER_CACHE_HIT,
        METRIC_RENDER_CACHE_MISS,
        METRIC_RENDER_CACHE_EVICT,
    ] {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
