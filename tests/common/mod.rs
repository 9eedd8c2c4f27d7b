//! In-memory stand-ins for the external services.

#![allow(dead_code)]

use async_trait::async_trait;
use sql_translator::bigquery::QueryPlanner;
use sql_translator::batch::Translator;
use sql_translator::config::Config;
use sql_translator::corpus::{CorpusHandle, CorpusPlatform};
use sql_translator::error::TranslateError;
use sql_translator::models::GcsPath;
use sql_translator::storage::ObjectStore;
use sql_translator::translate::GenerativeModel;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Source comment that makes [`FakeModel`] fail.
pub const FAIL_MODEL: &str = "-- fail-model";
/// Source comment that makes [`FakeModel`] answer without a fence.
pub const NO_FENCE: &str = "-- no-fence";
/// Source comment that makes [`FakeModel`] stall before answering.
pub const SLOW: &str = "-- slow";

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, String>>,
    unreadable: HashSet<String>,
    pub fail_writes: bool,
    pub writes: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn with_objects(objects: &[(&str, &str)]) -> Self {
        let store = Self::default();
        {
            let mut map = store.objects.lock().unwrap();
            for (path, body) in objects {
                map.insert(path.to_string(), body.to_string());
            }
        }
        store
    }

    pub fn unreadable(mut self, path: &str) -> Self {
        self.unreadable.insert(path.to_string());
        self
    }

    pub fn get(&self, path: &str) -> Option<String> {
        self.objects.lock().unwrap().get(path).cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn read_text(&self, path: &GcsPath) -> Result<String, TranslateError> {
        let key = path.to_string();
        if self.unreadable.contains(&key) {
            return Err(TranslateError::Io(format!("403 Forbidden for {}", key)));
        }
        self.objects
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or(TranslateError::NotFound(key))
    }

    async fn write_text(
        &self,
        path: &GcsPath,
        body: &str,
        _content_type: &str,
    ) -> Result<(), TranslateError> {
        if self.fail_writes {
            return Err(TranslateError::Io("bucket is read-only".into()));
        }
        let key = path.to_string();
        self.writes.lock().unwrap().push(key.clone());
        self.objects.lock().unwrap().insert(key, body.to_string());
        Ok(())
    }
}

/// Echoes the source SQL back inside a fence, prefixed with `-- bigquery`.
#[derive(Default)]
pub struct FakeModel {
    pub calls: AtomicUsize,
    pub corpora_seen: Mutex<Vec<String>>,
}

#[async_trait]
impl GenerativeModel for FakeModel {
    fn model_name(&self) -> &str {
        "fake-model"
    }

    async fn generate(&self, prompt: &str, corpus: &CorpusHandle) -> Result<String, TranslateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.corpora_seen.lock().unwrap().push(corpus.name.clone());

        let source = prompt
            .rsplit("to translate:\n")
            .next()
            .unwrap_or_default()
            .trim();
        if source.contains(FAIL_MODEL) {
            return Err(TranslateError::ModelInvocation("503 Service Unavailable".into()));
        }
        if source.contains(SLOW) {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        if source.contains(NO_FENCE) {
            return Ok("I am unable to translate this query.".into());
        }
        Ok(format!("Sure.\n```sql\n-- bigquery\n{}\n```\nDone.", source))
    }
}

#[derive(Default)]
pub struct FakeCorpora {
    pub fail: bool,
    pub creates: AtomicUsize,
    pub lists: AtomicUsize,
}

#[async_trait]
impl CorpusPlatform for FakeCorpora {
    async fn list_corpora(&self) -> Result<Vec<CorpusHandle>, TranslateError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TranslateError::CorpusProvisioning("403 aiplatform.ragCorpora.list denied".into()));
        }
        Ok(vec![])
    }

    async fn create_corpus(&self, display_name: &str) -> Result<CorpusHandle, TranslateError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(CorpusHandle {
            name: "projects/p/locations/us-central1/ragCorpora/42".into(),
            display_name: display_name.to_string(),
        })
    }

    async fn import_file(&self, _corpus: &CorpusHandle, _reference: &str) -> Result<(), TranslateError> {
        Ok(())
    }
}

/// Accepts any SQL except statements containing `SELEC ` (a typo).
#[derive(Default)]
pub struct FakePlanner {
    pub calls: AtomicUsize,
}

#[async_trait]
impl QueryPlanner for FakePlanner {
    async fn dry_run(&self, sql: &str) -> Result<u64, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if sql.contains("SELEC ") {
            return Err("Syntax error: Unexpected identifier \"SELEC\" at [2:1]".into());
        }
        Ok(sql.len() as u64 * 10)
    }
}

pub fn test_config(extra: &str) -> Config {
    let content = format!(
        r#"
[gcp]
project_id = "test-project"

[corpus]
display_name = "test_rag_corpus"
context_files = ["gs://docs/migration.pdf"]

[output]
bucket = "out"

[server]
bind = "127.0.0.1:0"
{}
"#,
        extra
    );
    toml::from_str(&content).unwrap()
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub model: Arc<FakeModel>,
    pub corpora: Arc<FakeCorpora>,
    pub planner: Arc<FakePlanner>,
    pub translator: Arc<Translator>,
}

pub fn harness(config: Config, store: MemoryStore, corpora: FakeCorpora) -> Harness {
    let store = Arc::new(store);
    let model = Arc::new(FakeModel::default());
    let corpora = Arc::new(corpora);
    let planner = Arc::new(FakePlanner::default());
    let translator = Arc::new(Translator::new(
        Arc::new(config),
        store.clone(),
        model.clone(),
        corpora.clone(),
        planner.clone(),
    ));
    Harness {
        store,
        model,
        corpora,
        planner,
        translator,
    }
}
