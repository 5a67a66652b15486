//! Integration tests for the pipeline
//!
//! These tests use wiremock to serve a small tracker site and drive the full
//! crawl, build and write cycle through the HTTP page executor.

use std::fs;
use std::path::Path;
use tracker_atlas::config::load_config_with_hash;
use tracker_atlas::progress::{NullSink, ProgressEvent};
use tracker_atlas::storage::{open_storage, RunStatus, Storage};
use tracker_atlas::{
    AtlasError, Config, FailureStage, HttpPageExecutor, Pipeline, PipelineMode,
};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOME_PAGE: &str = r#"<html><head>
<script>window.ajaxHeaders = {"X-CSRF-TOKEN": "tok-123"};</script>
</head><body>Home</body></html>"#;

const BRAKES_PAGE: &str = r#"<html><head>
<script src="/static/app.js"></script>
<script>
var tree = {};
tree.config = {};
tree.config.data = {"children": [
    {"id": "100", "title": "ABS", "text": "Detailed", "children": true},
    {"id": "101", "title": "ESP", "text": "Detailed", "children": false}
]};
</script>
</head><body></body></html>"#;

fn issue_page(body: &str) -> String {
    format!(
        "<html><body><div id=\"issue-body\">{}</div></body></html>",
        body
    )
}

/// Writes a configuration pointing at the mock server and loads it
fn write_config(dir: &Path, host: &str) -> (Config, String) {
    let toml = format!(
        r##"
[site]
host = "{host}"
project-id = "119"
root-tracker-name = "Software Requirements"
tracker-home-tree-url = "/cb/ajax/getTrackerHomePageTree.spr?proj_id={{project}}"
tracker-page-url = "/cb/tracker/{{id}}"
tree-ajax-url = "/cb/trackers/ajax/tree.spr"
issue-page-url = "/cb/issue/{{id}}"

[page]
issue-content-selector = "#issue-body"
wait-timeout = 2
poll-interval = 50

[session]
csrf = true
csrf-token-expression = 'window.ajaxHeaders["X-CSRF-TOKEN"]'

[crawler]
throttle-delay = 0

[output]
directory = '{dir}/out'
database-path = '{dir}/atlas.db'
summary-path = '{dir}/summary.md'
"##,
        host = host,
        dir = dir.display()
    );
    let path = dir.join("atlas.toml");
    fs::write(&path, toml).unwrap();
    load_config_with_hash(&path).unwrap()
}

async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(HOME_PAGE))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/cb/ajax/getTrackerHomePageTree.spr"))
        .and(query_param("proj_id", "119"))
        .and(header("x-csrf-token", "tok-123"))
        .and(header("X-Requested-With", "XMLHttpRequest"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[
                {"id": "2", "text": "Design Documents", "children": []},
                {"id": "1", "text": "Software Requirements", "children": [
                    {"id": "10", "trackerId": 4410, "text": "Brakes"},
                    {"id": "11", "trackerId": 4411, "text": "Archived"}
                ]}
            ]"#,
        ))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/cb/tracker/10"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BRAKES_PAGE))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/cb/tracker/11"))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/cb/trackers/ajax/tree.spr"))
        .and(body_string_contains("nodeId=100&"))
        .and(body_string_contains("tracker_id=4410"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[{"id": "102", "title": "Pedal", "text": "see ISSUE:101 and [ISSUE:999]", "children": false}]"#,
        ))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/cb/issue/100"))
        .respond_with(ResponseTemplate::new(200).set_body_string(issue_page("<p>ABS body</p>")))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/cb/issue/101"))
        .respond_with(ResponseTemplate::new(200).set_body_string(issue_page("<p>ESP body</p>")))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/cb/issue/102"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_pipeline_against_mock_site() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let (config, hash) = write_config(dir.path(), &server.uri());
    let executor = HttpPageExecutor::new(&config.session).unwrap();

    let mut percents = Vec::new();
    let mut sink = |event: &ProgressEvent| percents.push(event.percent);
    let output = Pipeline::new(config.clone(), hash, PipelineMode::Crawl)
        .run(&executor, &mut sink)
        .await
        .unwrap();

    // Root keeps both trackers, only the filled one is valid
    assert_eq!(output.root.info.id, "1");
    assert_eq!(output.root.children.len(), 2);
    assert_eq!(output.trackers.len(), 1);

    let brakes = &output.trackers[0];
    assert_eq!(brakes.children.len(), 2);
    assert!(brakes.children[0].has_children);
    assert_eq!(brakes.children[0].real_children[0].id, "102");
    assert_eq!(brakes.children[0].content.as_deref(), Some("<p>ABS body</p>"));
    assert!(brakes.children[1].real_children.is_empty());
    assert_eq!(brakes.children[0].real_children[0].content, None);

    let stages: Vec<FailureStage> = output.failures.iter().map(|f| f.stage).collect();
    assert_eq!(stages, vec![FailureStage::Tracker, FailureStage::Content]);
    assert_eq!(output.failures[1].issue_id.as_deref(), Some("102"));

    // Two mentions below issue 100, one of them pointing at a node
    assert_eq!(output.build.complexity["100"], 2);
    assert_eq!(output.build.complexity["101"], 0);
    let graph: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output.graph_path).unwrap()).unwrap();
    let references: Vec<&serde_json::Value> = graph["edges"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|edge| edge["kind"] == "reference")
        .collect();
    assert_eq!(references.len(), 1);
    assert_eq!(references[0]["from"], "100");
    assert_eq!(references[0]["to"], "101");

    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(percents.last().copied(), Some(100.0));

    let summary = fs::read_to_string(&output.summary_path).unwrap();
    assert!(summary.contains("| 10 | 4410 | Brakes | 3 | yes |"));
    assert!(summary.contains("| 11 | 4411 | Archived | 0 | no |"));

    let storage = open_storage(Path::new(&config.output.database_path)).unwrap();
    let run = storage.get_run(output.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.totals.trackers_total, 2);
    assert_eq!(run.totals.issues_total, 3);
    assert_eq!(storage.failures_for_run(output.run_id).unwrap().len(), 2);
}

#[tokio::test]
async fn test_resume_rebuilds_identical_outputs() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let (config, hash) = write_config(dir.path(), &server.uri());
    let executor = HttpPageExecutor::new(&config.session).unwrap();

    let fresh = Pipeline::new(config.clone(), hash.clone(), PipelineMode::Crawl)
        .run(&executor, &mut NullSink)
        .await
        .unwrap();
    let graph = fs::read_to_string(&fresh.graph_path).unwrap();
    let complexity = fs::read_to_string(&fresh.complexity_path).unwrap();

    let resumed = Pipeline::new(config, hash, PipelineMode::Resume)
        .run(&executor, &mut NullSink)
        .await
        .unwrap();

    assert_eq!(resumed.build, fresh.build);
    assert_eq!(fs::read_to_string(&resumed.graph_path).unwrap(), graph);
    assert_eq!(
        fs::read_to_string(&resumed.complexity_path).unwrap(),
        complexity
    );
    assert!(resumed.failures.is_empty());
}

#[tokio::test]
async fn test_unknown_root_is_fatal() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let (mut config, hash) = write_config(dir.path(), &server.uri());
    config.site.root_tracker_name = "System Requirements".to_string();
    let executor = HttpPageExecutor::new(&config.session).unwrap();

    let result = Pipeline::new(config.clone(), hash, PipelineMode::Crawl)
        .run(&executor, &mut NullSink)
        .await;

    assert!(matches!(result, Err(AtlasError::RootNotFound { .. })));
    assert!(!config.output.graph_path().exists());
    let storage = open_storage(Path::new(&config.output.database_path)).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);

    // The tree endpoint expectation does not apply to this run
    server.reset().await;
}
