// src/model_package.rs
//
// Model package loading:
//   source (cache file or URL) → archive bytes → {model, metadata} members
//   → parsed ModelConfig → inference session → installed model.
//
// A new model replaces the installed one only after its session is built.
// Any failure leaves the previous model (if any) in place and the loader
// in `Failed`; the next load starts over.

use crate::error::LoadError;
use crate::gestures::{ActiveFieldMask, Slot};
use crate::inference::{InferenceBackend, InferenceSession};
use crate::sequence::FlatTensor;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, warn};

pub const DEFAULT_MODEL_EXTENSION: &str = ".onnx";
const METADATA_EXTENSION: &str = ".json";

/// Upper bound on one decompressed archive member.
pub const DEFAULT_MAX_MEMBER_BYTES: u64 = 512 * 1024 * 1024;
/// Upper bound on a model's temporal window.
pub const MAX_MEMORY_FRAME: usize = 4096;

// ============================================================================
// METADATA
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub labels: Vec<String>,
    #[serde(default)]
    pub label_explicit: Vec<String>,
    pub memory_frame: usize,
    pub active_gestures: ActiveFieldMask,
    #[serde(default)]
    pub label_map: HashMap<String, i64>,
    #[serde(default)]
    pub one_side: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub d_model: usize,
    #[serde(default)]
    pub num_heads: usize,
    #[serde(default)]
    pub num_layers: usize,
    #[serde(default)]
    pub ff_dim: usize,
}

impl ModelConfig {
    pub fn from_json(bytes: &[u8]) -> Result<Self, LoadError> {
        let config: Self = serde_json::from_slice(bytes)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        if self.memory_frame == 0 || self.memory_frame > MAX_MEMORY_FRAME {
            return Err(LoadError::InvalidMetadata(format!(
                "memory_frame must be in 1..={}, got {}",
                MAX_MEMORY_FRAME, self.memory_frame
            )));
        }
        Ok(())
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }
}

// ============================================================================
// CAPABILITIES
// ============================================================================

/// Local storage used to read a cached package.
#[async_trait]
pub trait PackageStore: Send + Sync {
    async fn exists(&self, path: &Path) -> bool;
    async fn read(&self, path: &Path) -> std::io::Result<Vec<u8>>;
}

/// Remote source used when no readable cached package exists.
#[async_trait]
pub trait PackageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>>;
}

pub struct LocalStore;

#[async_trait]
impl PackageStore for LocalStore {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PackageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}

// ============================================================================
// LOADER
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageSource {
    pub cache_path: Option<PathBuf>,
    pub url: Option<String>,
}

impl PackageSource {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            cache_path: None,
            url: Some(url.into()),
        }
    }

    pub fn from_cache(path: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: Some(path.into()),
            url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoaderState {
    Unloaded,
    Fetching,
    Extracting,
    Initializing,
    Ready,
    Failed,
}

pub struct LoadedModel {
    pub config: ModelConfig,
    pub active_slots: Vec<Slot>,
    session: tokio::sync::Mutex<Box<dyn InferenceSession>>,
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("name", &self.config.name)
            .field("memory_frame", &self.config.memory_frame)
            .field("active_slots", &self.active_slots.len())
            .finish_non_exhaustive()
    }
}

impl LoadedModel {
    pub fn new(config: ModelConfig, session: Box<dyn InferenceSession>) -> Self {
        let active_slots = config.active_gestures.active_slots();
        Self {
            config,
            active_slots,
            session: tokio::sync::Mutex::new(session),
        }
    }

    /// Raw per-label scores for one input window.
    pub async fn infer(&self, input: &FlatTensor) -> anyhow::Result<Vec<f32>> {
        let mut session = self.session.lock().await;
        session.run(input).await
    }
}

struct Members {
    model: Vec<u8>,
    metadata: Vec<u8>,
}

pub struct ModelPackageLoader {
    backend: Arc<dyn InferenceBackend>,
    store: Arc<dyn PackageStore>,
    fetcher: Arc<dyn PackageFetcher>,
    model_extension: String,
    max_member_bytes: u64,
    state: Mutex<LoaderState>,
    load_lock: tokio::sync::Mutex<()>,
    current: RwLock<Option<Arc<LoadedModel>>>,
}

impl ModelPackageLoader {
    pub fn new(
        backend: Arc<dyn InferenceBackend>,
        store: Arc<dyn PackageStore>,
        fetcher: Arc<dyn PackageFetcher>,
    ) -> Self {
        Self {
            backend,
            store,
            fetcher,
            model_extension: DEFAULT_MODEL_EXTENSION.to_string(),
            max_member_bytes: DEFAULT_MAX_MEMBER_BYTES,
            state: Mutex::new(LoaderState::Unloaded),
            load_lock: tokio::sync::Mutex::new(()),
            current: RwLock::new(None),
        }
    }

    pub fn with_model_extension(mut self, extension: impl Into<String>) -> Self {
        self.model_extension = extension.into();
        self
    }

    pub fn with_max_member_bytes(mut self, limit: u64) -> Self {
        self.max_member_bytes = limit;
        self
    }

    pub fn state(&self) -> LoaderState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Installed model, if any.
    pub fn current(&self) -> Option<Arc<LoadedModel>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_ready(&self) -> bool {
        self.current().is_some()
    }

    /// Concurrent calls are serialized.
    pub async fn load(&self, source: &PackageSource) -> Result<Arc<LoadedModel>, LoadError> {
        let _guard = self.load_lock.lock().await;

        match self.try_load(source).await {
            Ok(model) => {
                *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(model.clone());
                self.set_state(LoaderState::Ready);
                info!(
                    "✓ Model '{}' ready ({} labels, {} frames, {} active slots)",
                    model.config.name,
                    model.config.labels.len(),
                    model.config.memory_frame,
                    model.active_slots.len()
                );
                Ok(model)
            }
            Err(e) => {
                self.set_state(LoaderState::Failed);
                warn!("Model package load failed: {}", e);
                Err(e)
            }
        }
    }

    async fn try_load(&self, source: &PackageSource) -> Result<Arc<LoadedModel>, LoadError> {
        self.set_state(LoaderState::Fetching);
        let archive = self.obtain(source).await?;

        self.set_state(LoaderState::Extracting);
        let members = extract_members(&archive, &self.model_extension, self.max_member_bytes)?;
        let config = ModelConfig::from_json(&members.metadata)?;
        debug!(
            "Extracted model ({} bytes) and metadata for '{}'",
            members.model.len(),
            config.name
        );

        self.set_state(LoaderState::Initializing);
        let backend = self.backend.clone();
        let init_config = config.clone();
        let session = tokio::task::spawn_blocking(move || {
            backend.initialize(&members.model, &init_config)
        })
        .await
        .map_err(anyhow::Error::from)
        .and_then(|r| r)
        .map_err(|source| LoadError::Initialize {
            name: config.name.clone(),
            source,
        })?;

        Ok(Arc::new(LoadedModel::new(config, session)))
    }

    /// Cached copy first; network on absence or read failure.
    async fn obtain(&self, source: &PackageSource) -> Result<Vec<u8>, LoadError> {
        let mut cache_error = None;

        if let Some(path) = &source.cache_path {
            if self.store.exists(path).await {
                match self.store.read(path).await {
                    Ok(bytes) => {
                        info!("Loading model package from cache {}", path.display());
                        return Ok(bytes);
                    }
                    Err(e) => {
                        warn!("Cached package {} unreadable: {}", path.display(), e);
                        cache_error = Some((path, e));
                    }
                }
            } else {
                debug!("No cached package at {}", path.display());
            }
        }

        match (&source.url, cache_error) {
            (Some(url), _) => {
                info!("Fetching model package from {}", url);
                self.fetcher
                    .fetch(url)
                    .await
                    .map_err(|source| LoadError::Fetch {
                        url: url.clone(),
                        source,
                    })
            }
            (None, Some((path, source))) => Err(LoadError::Cache {
                path: path.display().to_string(),
                source,
            }),
            (None, None) => Err(LoadError::NoSource),
        }
    }

    fn set_state(&self, state: LoaderState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }
}

fn extract_members(
    archive: &[u8],
    model_extension: &str,
    max_member_bytes: u64,
) -> Result<Members, LoadError> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))?;

    let mut model: Option<(String, Vec<u8>)> = None;
    let mut metadata: Option<(String, Vec<u8>)> = None;

    for i in 0..zip.len() {
        let mut file = zip.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();

        let (slot, extension) = if name.ends_with(model_extension) {
            (&mut model, model_extension)
        } else if name.ends_with(METADATA_EXTENSION) {
            (&mut metadata, METADATA_EXTENSION)
        } else {
            continue;
        };

        if let Some((first, _)) = slot.as_ref() {
            return Err(LoadError::DuplicateMember {
                extension: extension.to_string(),
                first: first.clone(),
                second: name,
            });
        }

        // header-declared size is checked before reading
        let too_large = |name: String| LoadError::MemberTooLarge {
            name,
            limit: max_member_bytes,
        };
        if file.size() > max_member_bytes {
            return Err(too_large(name));
        }

        let mut bytes = Vec::new();
        file.by_ref()
            .take(max_member_bytes + 1)
            .read_to_end(&mut bytes)
            .map_err(|source| LoadError::Member {
                name: name.clone(),
                source,
            })?;
        if bytes.len() as u64 > max_member_bytes {
            return Err(too_large(name));
        }
        *slot = Some((name, bytes));
    }

    let (_, model) = model.ok_or_else(|| LoadError::MissingMember {
        extension: model_extension.to_string(),
    })?;
    let (_, metadata) = metadata.ok_or_else(|| LoadError::MissingMember {
        extension: METADATA_EXTENSION.to_string(),
    })?;

    Ok(Members { model, metadata })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn loader(
        backend: Arc<FakeBackend>,
        store: MemoryStore,
        fetcher: FakeFetcher,
    ) -> ModelPackageLoader {
        ModelPackageLoader::new(backend, Arc::new(store), Arc::new(fetcher))
    }

    #[tokio::test]
    async fn test_load_from_url() {
        let backend = Arc::new(FakeBackend::new(vec![0.0, 1.0]));
        let fetcher = FakeFetcher::with("https://models/a.zip", package("alpha", &["a", "b"]));
        let loader = loader(backend.clone(), MemoryStore::default(), fetcher);

        assert_eq!(loader.state(), LoaderState::Unloaded);
        let model = loader
            .load(&PackageSource::from_url("https://models/a.zip"))
            .await
            .unwrap();

        assert_eq!(loader.state(), LoaderState::Ready);
        assert_eq!(model.config.name, "alpha");
        assert_eq!(model.config.labels, vec!["a", "b"]);
        assert_eq!(model.active_slots, vec![Slot::RHandPosition]);
        assert_eq!(backend.initialized(), vec![MODEL_BYTES.to_vec()]);
        assert!(loader.is_ready());
    }

    #[tokio::test]
    async fn test_cache_preferred_over_network() {
        let backend = Arc::new(FakeBackend::new(vec![1.0]));
        let store = MemoryStore::with("/cache/a.zip", package("cached", &["x"]));
        let fetcher = FakeFetcher::with("https://models/a.zip", package("remote", &["x"]));
        let loader = loader(backend, store, fetcher);

        let source = PackageSource {
            cache_path: Some("/cache/a.zip".into()),
            url: Some("https://models/a.zip".into()),
        };
        let model = loader.load(&source).await.unwrap();
        assert_eq!(model.config.name, "cached");
    }

    #[tokio::test]
    async fn test_unreadable_cache_falls_back_to_network() {
        let backend = Arc::new(FakeBackend::new(vec![1.0]));
        let store = MemoryStore::unreadable("/cache/a.zip");
        let fetcher = FakeFetcher::with("https://models/a.zip", package("remote", &["x"]));
        let loader = loader(backend, store, fetcher);

        let source = PackageSource {
            cache_path: Some("/cache/a.zip".into()),
            url: Some("https://models/a.zip".into()),
        };
        let model = loader.load(&source).await.unwrap();
        assert_eq!(model.config.name, "remote");
    }

    #[tokio::test]
    async fn test_unreadable_cache_without_url() {
        let backend = Arc::new(FakeBackend::new(vec![1.0]));
        let store = MemoryStore::unreadable("/cache/a.zip");
        let loader = loader(backend, store, FakeFetcher::default());

        let err = loader
            .load(&PackageSource::from_cache("/cache/a.zip"))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Cache { .. }));
        assert!(matches!(
            loader.load(&PackageSource::default()).await,
            Err(LoadError::NoSource)
        ));
    }

    #[tokio::test]
    async fn test_missing_json_fails_then_recovers() {
        let backend = Arc::new(FakeBackend::new(vec![1.0]));
        let mut fetcher =
            FakeFetcher::with("https://models/bad.zip", zip_of(&[("model.onnx", MODEL_BYTES)]));
        fetcher.insert("https://models/good.zip", package("good", &["x"]));
        let loader = loader(backend, MemoryStore::default(), fetcher);

        let err = loader
            .load(&PackageSource::from_url("https://models/bad.zip"))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::MissingMember { ref extension } if extension == ".json"));
        assert_eq!(loader.state(), LoaderState::Failed);
        assert!(loader.current().is_none());

        loader
            .load(&PackageSource::from_url("https://models/good.zip"))
            .await
            .unwrap();
        assert_eq!(loader.state(), LoaderState::Ready);
    }

    #[tokio::test]
    async fn test_missing_model_member() {
        let backend = Arc::new(FakeBackend::new(vec![1.0]));
        let fetcher = FakeFetcher::with(
            "u",
            zip_of(&[("meta.json", metadata_json("x", &["a"]).as_bytes())]),
        );
        let loader = loader(backend, MemoryStore::default(), fetcher);
        let err = loader.load(&PackageSource::from_url("u")).await.unwrap_err();
        assert!(matches!(err, LoadError::MissingMember { ref extension } if extension == ".onnx"));
    }

    #[tokio::test]
    async fn test_duplicate_members_rejected() {
        let backend = Arc::new(FakeBackend::new(vec![1.0]));
        let meta = metadata_json("x", &["a"]);
        let archive = zip_of(&[
            ("a.onnx", MODEL_BYTES),
            ("b.onnx", MODEL_BYTES),
            ("meta.json", meta.as_bytes()),
        ]);
        let loader = loader(backend, MemoryStore::default(), FakeFetcher::with("u", archive));
        let err = loader.load(&PackageSource::from_url("u")).await.unwrap_err();
        assert!(matches!(err, LoadError::DuplicateMember { .. }));
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_model() {
        let backend = Arc::new(FakeBackend::new(vec![1.0]));
        let mut fetcher = FakeFetcher::with("good", package("first", &["x"]));
        fetcher.insert("garbage", b"not a zip".to_vec());
        let loader = loader(backend.clone(), MemoryStore::default(), fetcher);

        loader.load(&PackageSource::from_url("good")).await.unwrap();
        let err = loader.load(&PackageSource::from_url("garbage")).await.unwrap_err();
        assert!(matches!(err, LoadError::Archive(_)));

        assert_eq!(loader.state(), LoaderState::Failed);
        assert_eq!(loader.current().unwrap().config.name, "first");

        backend.fail_next();
        let err = loader.load(&PackageSource::from_url("good")).await.unwrap_err();
        assert!(matches!(err, LoadError::Initialize { .. }));
        assert_eq!(loader.current().unwrap().config.name, "first");
    }

    #[tokio::test]
    async fn test_bad_metadata_and_fetch_errors() {
        let backend = Arc::new(FakeBackend::new(vec![1.0]));
        let archive = zip_of(&[("m.onnx", MODEL_BYTES), ("meta.json", &b"{\"labels\": 3}"[..])]);
        let loader = loader(backend, MemoryStore::default(), FakeFetcher::with("u", archive));

        assert!(matches!(
            loader.load(&PackageSource::from_url("u")).await,
            Err(LoadError::Metadata(_))
        ));
        assert!(matches!(
            loader.load(&PackageSource::from_url("missing")).await,
            Err(LoadError::Fetch { .. })
        ));
    }

    #[tokio::test]
    async fn test_directories_and_custom_extension() {
        let backend = Arc::new(FakeBackend::new(vec![1.0]));
        let meta = metadata_json("ort", &["a"]);
        let archive = zip_of(&[
            ("pkg/model.ort", MODEL_BYTES),
            ("pkg/meta.json", meta.as_bytes()),
            ("pkg/README.txt", &b"ignored"[..]),
        ]);
        let loader = loader(backend, MemoryStore::default(), FakeFetcher::with("u", archive))
            .with_model_extension(".ort");
        let model = loader.load(&PackageSource::from_url("u")).await.unwrap();
        assert_eq!(model.config.name, "ort");
    }

    #[tokio::test]
    async fn test_oversized_header_size_is_a_load_error() {
        let backend = Arc::new(FakeBackend::new(vec![1.0]));
        let mut archive = package("huge", &["x"]);
        // first central directory entry is model.onnx; uncompressed size at +24
        let cd = archive.windows(4).position(|w| w == b"PK\x01\x02").unwrap();
        archive[cd + 24..cd + 28].copy_from_slice(&0xFFFF_FFFEu32.to_le_bytes());

        let loader = loader(backend, MemoryStore::default(), FakeFetcher::with("u", archive));
        let err = loader.load(&PackageSource::from_url("u")).await.unwrap_err();
        assert!(
            matches!(err, LoadError::MemberTooLarge { .. } | LoadError::Archive(_)),
            "{:?}",
            err
        );
        assert_eq!(loader.state(), LoaderState::Failed);
        assert!(loader.current().is_none());
    }

    #[tokio::test]
    async fn test_member_over_limit_rejected() {
        let backend = Arc::new(FakeBackend::new(vec![1.0]));
        let loader = loader(
            backend,
            MemoryStore::default(),
            FakeFetcher::with("u", package("big", &["x"])),
        )
        .with_max_member_bytes(4);

        let err = loader.load(&PackageSource::from_url("u")).await.unwrap_err();
        assert!(matches!(err, LoadError::MemberTooLarge { limit: 4, .. }));
    }

    #[test]
    fn test_memory_frame_bounds() {
        for frames in ["0", "4097", "1000000000000"] {
            let json = format!(
                r#"{{"labels": ["a"], "memory_frame": {}, "active_gestures": {{}}}}"#,
                frames
            );
            let err = ModelConfig::from_json(json.as_bytes()).unwrap_err();
            assert!(matches!(err, LoadError::InvalidMetadata(_)), "{}", frames);
        }
        let ok = br#"{"labels": ["a"], "memory_frame": 4096, "active_gestures": {}}"#;
        assert!(ModelConfig::from_json(ok).is_ok());
    }

    #[tokio::test]
    async fn test_zero_memory_frame_package_not_installed() {
        let backend = Arc::new(FakeBackend::new(vec![1.0]));
        let mut meta: serde_json::Value =
            serde_json::from_str(&metadata_json("empty", &["a"])).unwrap();
        meta["memory_frame"] = serde_json::json!(0);
        let meta = meta.to_string();
        let archive = zip_of(&[("m.onnx", MODEL_BYTES), ("m.json", meta.as_bytes())]);

        let fetcher = FakeFetcher::with("u", archive);
        let loader = loader(backend.clone(), MemoryStore::default(), fetcher);
        let err = loader.load(&PackageSource::from_url("u")).await.unwrap_err();
        assert!(matches!(err, LoadError::InvalidMetadata(_)));
        assert!(backend.initialized().is_empty());
    }

    #[test]
    fn test_metadata_defaults() {
        let config = ModelConfig::from_json(
            br#"{"labels": ["hello"], "memory_frame": 15, "active_gestures": {"l_wrist": true}}"#,
        )
        .unwrap();
        assert_eq!(config.memory_frame, 15);
        assert!(!config.one_side);
        assert_eq!(config.active_gestures.active_slots(), vec![Slot::LWrist]);
        assert_eq!(config.label(0), Some("hello"));
        assert_eq!(config.label(1), None);
    }
}
