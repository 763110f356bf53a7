#![allow(dead_code)]

use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tblock_lib::game::installer::config::InstallerConfig;
use tblock_lib::ProgressReporter;
use wiremock::{Request, Respond, ResponseTemplate};

pub fn sha1_hex(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Route `log` output through the test harness; `RUST_LOG=debug` to see it
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Config rooted at `game_dir` with every remote pointed at the mock server
pub fn mock_config(server_uri: &str, game_dir: &Path) -> InstallerConfig {
    init_logging();
    let mut config = InstallerConfig::new(game_dir);
    config.manifest_url = format!("{}/mc/game/version_manifest_v2.json", server_uri);
    config.resources_url = format!("{}/objects", server_uri);
    config.runtime.base_url = format!("{}/jdk", server_uri);
    config.fabric.meta_url = format!("{}/fabric", server_uri);
    config.fabric.maven_url = format!("{}/maven/", server_uri);
    config.concurrency = 4;
    config
}

pub fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Serves fixed bodies by request path; anything else (or anything listed in
/// `failing`) gets an error status.
#[derive(Clone, Default)]
pub struct StaticFiles {
    pub files: Arc<HashMap<String, Vec<u8>>>,
    pub failing: Arc<Vec<String>>,
}

impl StaticFiles {
    pub fn new(files: HashMap<String, Vec<u8>>) -> Self {
        Self {
            files: Arc::new(files),
            failing: Arc::new(Vec::new()),
        }
    }

    pub fn failing(mut self, paths: Vec<String>) -> Self {
        self.failing = Arc::new(paths);
        self
    }
}

impl Respond for StaticFiles {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let path = request.url.path();
        if self.failing.iter().any(|p| p == path) {
            return ResponseTemplate::new(500);
        }
        match self.files.get(path) {
            Some(body) => ResponseTemplate::new(200).set_body_bytes(body.clone()),
            None => ResponseTemplate::new(404),
        }
    }
}

/// Synthetic asset set: (index json, served objects keyed by URL path, name → body)
pub struct AssetFixture {
    pub index_json: Vec<u8>,
    pub objects: HashMap<String, Vec<u8>>,
    pub bodies: Vec<(String, Vec<u8>)>,
}

impl AssetFixture {
    pub fn new(count: usize) -> Self {
        let bodies: Vec<(String, Vec<u8>)> = (0..count)
            .map(|i| {
                (
                    format!("minecraft/textures/block_{}.png", i),
                    format!("asset body number {}", i).into_bytes(),
                )
            })
            .collect();
        Self::from_bodies(bodies)
    }

    pub fn from_bodies(bodies: Vec<(String, Vec<u8>)>) -> Self {
        let mut objects_json = serde_json::Map::new();
        let mut objects = HashMap::new();
        for (name, body) in &bodies {
            let hash = sha1_hex(body);
            objects_json.insert(
                name.clone(),
                serde_json::json!({"hash": hash, "size": body.len()}),
            );
            objects.insert(format!("/objects/{}/{}", &hash[..2], hash), body.clone());
        }
        let index_json =
            serde_json::to_vec(&serde_json::json!({ "objects": objects_json })).unwrap();

        Self {
            index_json,
            objects,
            bodies,
        }
    }

    pub fn object_path(&self, game_dir: &Path, body: &[u8]) -> PathBuf {
        let hash = sha1_hex(body);
        game_dir
            .join("assets/objects")
            .join(&hash[..2])
            .join(hash)
    }
}

/// Records every callback so tests can assert on progress
#[derive(Default)]
pub struct RecordingReporter {
    pub steps: Mutex<Vec<String>>,
    pub bytes: Mutex<Vec<(u64, Option<u64>)>>,
    pub percents: Mutex<Vec<i32>>,
    pub messages: Mutex<Vec<String>>,
    pub counts: Mutex<Vec<(u32, Option<u32>)>>,
    pub done: Mutex<Option<bool>>,
}

impl ProgressReporter for RecordingReporter {
    fn start_step(&self, name: &str, _total_steps: Option<u32>) {
        self.steps.lock().unwrap().push(name.to_string());
    }
    fn update_bytes(&self, transferred: u64, total: Option<u64>) {
        self.bytes.lock().unwrap().push((transferred, total));
    }
    fn set_percent(&self, percent: i32) {
        self.percents.lock().unwrap().push(percent);
    }
    fn set_message(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
    fn set_step_count(&self, current: u32, total: Option<u32>) {
        self.counts.lock().unwrap().push((current, total));
    }
    fn done(&self, success: bool, _message: Option<&str>) {
        *self.done.lock().unwrap() = Some(success);
    }
}
