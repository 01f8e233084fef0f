//! Shared fixtures for the integration tests: on-disk git checkouts and a
//! one-shot HTTP responder standing in for GitHub and Google Chat.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub const SHA: &str = "0123456789abcdef0123456789abcdef01234567";
pub const OWNER: &str = "the-owner";
pub const REPO: &str = "the-repo";

/// Create `<root>/<name>/.git` with an `origin` remote and HEAD on `main`.
/// The branch ref is written as a loose file.
pub fn write_repo(root: &Path, name: &str, url: &str) {
    let git = write_git_skeleton(root, name, url);
    fs::write(git.join("HEAD"), "ref: refs/heads/main\n").unwrap();
    fs::write(git.join("refs/heads/main"), format!("{SHA}\n")).unwrap();
}

/// Like [`write_repo`], with the branch ref only in `packed-refs`.
pub fn write_packed_repo(root: &Path, name: &str, url: &str, branch: &str) {
    let git = write_git_skeleton(root, name, url);
    fs::write(git.join("HEAD"), format!("ref: refs/heads/{branch}\n")).unwrap();
    fs::write(
        git.join("packed-refs"),
        format!(
            "# pack-refs with: peeled fully-peeled sorted \n\
             {SHA} refs/heads/{branch}\n\
             ffffffffffffffffffffffffffffffffffffffff refs/tags/v1\n\
             ^eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee\n"
        ),
    )
    .unwrap();
}

/// Like [`write_repo`], with a detached HEAD.
pub fn write_detached_repo(root: &Path, name: &str, url: &str) {
    let git = write_git_skeleton(root, name, url);
    fs::write(git.join("HEAD"), format!("{SHA}\n")).unwrap();
}

fn write_git_skeleton(root: &Path, name: &str, url: &str) -> std::path::PathBuf {
    let git = root.join(name).join(".git");
    fs::create_dir_all(git.join("refs/heads")).unwrap();
    fs::write(
        git.join("config"),
        format!(
            "[core]\n\
             \trepositoryformatversion = 0\n\
             \tbare = false\n\
             [remote \"origin\"]\n\
             \turl = {url}\n\
             \tfetch = +refs/heads/*:refs/remotes/origin/*\n\
             [branch \"main\"]\n\
             \tremote = origin\n\
             \tmerge = refs/heads/main\n"
        ),
    )
    .unwrap();
    git
}

pub fn github_url() -> String {
    format!("https://github.com/{OWNER}/{REPO}.git")
}

/// A client that never goes through a proxy from the environment.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// One HTTP request as received by the responder.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: Method,
    /// Path and query, e.g. `/repos/o/r/statuses/abc`.
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

#[derive(Clone)]
struct Responder {
    status: StatusCode,
    body: String,
    captured: Arc<Mutex<Option<oneshot::Sender<CapturedRequest>>>>,
}

async fn capture(
    State(responder): State<Responder>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let request = CapturedRequest {
        method,
        uri: uri.to_string(),
        headers,
        body,
    };
    if let Some(tx) = responder.captured.lock().unwrap().take() {
        tx.send(request).ok();
    }
    (
        responder.status,
        [(header::CONTENT_TYPE, "application/json")],
        responder.body,
    )
}

/// Serve every path, answering with `status` and `body`. Returns the base
/// URL and a receiver for the first request.
pub async fn respond_once(
    status: u16,
    body: &str,
) -> (String, oneshot::Receiver<CapturedRequest>) {
    let (tx, rx) = oneshot::channel();
    let responder = Responder {
        status: StatusCode::from_u16(status).unwrap(),
        body: body.to_string(),
        captured: Arc::new(Mutex::new(Some(tx))),
    };
    let app = Router::new().fallback(capture).with_state(responder);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    (base, rx)
}

/// A base URL nothing listens on.
pub async fn closed_port() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    base
}
