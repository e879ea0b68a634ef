#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use tunegrab_api::config::ServerConfig;
use tunegrab_api::router::build_app_router;
use tunegrab_api::state::AppState;
use tunegrab_core::dependencies::{ToolCommand, Toolchain};

/// Converter body that reports progress and writes `<id>.mp3`.
pub const SUCCESSFUL_CONVERTER: &str = r#"
echo "[download]  10.0% of 3.00MiB"
echo "[download]  75.5% of 3.00MiB"
echo "[ExtractAudio] Extracting audio to $base.mp3"
printf 'ID3fake-audio' > "$base.mp3"
"#;

/// Converter body that fails with a message on stderr.
pub const FAILING_CONVERTER: &str = r#"
echo "ERROR: Video unavailable" >&2
exit 1
"#;

const PRELUDE: &str = r#"
if [ "$1" = "--version" ]; then echo "fake 1.0"; exit 0; fi
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; shift; fi
  shift
done
base=$(printf '%s' "$out" | sed 's/\.%(ext)s$//')
"#;

/// A router over a scratch downloads directory and a scripted converter.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    dir: tempfile::TempDir,
    _script: Option<tempfile::NamedTempFile>,
}

impl TestApp {
    pub fn downloads_dir(&self) -> PathBuf {
        self.dir.path().join("downloads")
    }

    pub fn static_dir(&self) -> PathBuf {
        self.dir.path().join("public")
    }

    /// A fresh router sharing this app's state; `oneshot` consumes routers.
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

/// Build a test `ServerConfig` rooted at `root`, with the given toolchain.
pub fn test_config(root: &Path, toolchain: Toolchain) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        downloads_dir: root.join("downloads"),
        static_dir: root.join("public"),
        toolchain,
        job_expiry_secs: 3600,
        sweep_interval_secs: 600,
    }
}

fn build(toolchain: Toolchain, dir: tempfile::TempDir, script: Option<tempfile::NamedTempFile>) -> TestApp {
    std::fs::create_dir_all(dir.path().join("downloads")).expect("create downloads dir");
    std::fs::create_dir_all(dir.path().join("public")).expect("create static dir");
    std::fs::write(
        dir.path().join("public").join("index.html"),
        "<!doctype html><title>tunegrab</title>",
    )
    .expect("write index.html");

    let state = AppState::from_config(test_config(dir.path(), toolchain));
    TestApp {
        router: build_app_router(state.clone()),
        state,
        dir,
        _script: script,
    }
}

/// App whose converter runs `body` after the shared argument prelude, with
/// `true` standing in for ffmpeg.
pub fn build_test_app(body: &str) -> TestApp {
    let mut script = tempfile::Builder::new()
        .suffix(".sh")
        .tempfile()
        .expect("create temp file");
    writeln!(script, "#!/bin/bash").expect("write shebang");
    write!(script, "{PRELUDE}{body}").expect("write body");
    script.flush().expect("flush script");

    let toolchain = Toolchain {
        converter: ToolCommand::with_args("bash", [script.path().to_string_lossy().into_owned()]),
        ffmpeg: ToolCommand::new("true"),
    };
    build(toolchain, tempfile::tempdir().expect("create temp dir"), Some(script))
}

/// App with an explicit toolchain (e.g. missing tools).
pub fn build_test_app_with_toolchain(toolchain: Toolchain) -> TestApp {
    build(toolchain, tempfile::tempdir().expect("create temp dir"), None)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    post_raw(app, uri, body.to_string()).await
}

pub async fn post_raw(app: Router, uri: &str, body: impl Into<Body>) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Submit a conversion and return its job id.
pub async fn submit(app: &TestApp, url: &str) -> String {
    let response = post_json(
        app.app(),
        "/api/convert",
        serde_json::json!({ "url": url, "rightsConfirmed": true }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    json["jobId"].as_str().expect("jobId").to_string()
}

/// Poll `/api/status/{id}` until the job is terminal.
pub async fn wait_for_terminal(app: &TestApp, id: &str) -> serde_json::Value {
    for _ in 0..250 {
        let response = get(app.app(), &format!("/api/status/{id}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        if json["status"] == "finished" || json["status"] == "failed" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("job {id} did not reach a terminal state");
}
