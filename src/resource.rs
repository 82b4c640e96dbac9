use std::future::Future;
use std::path::{Component, Path, PathBuf};

use rustc_hash::FxHashMap;

/// Byte source for served resources, keyed by resource name
/// (e.g. `index.html`, `css/style.css`).
pub trait ResourceSource: Send + Sync + 'static {
    /// `None` covers every failure: missing, unreadable, or not a file.
    fn load(&self, name: &str) -> impl Future<Output = Option<Vec<u8>>> + Send;
}

/// Resources read from a directory on every request.
#[derive(Debug, Clone)]
pub struct StaticDir {
    root: PathBuf,
}

impl StaticDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join `name` onto the root, accepting only plain path components.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        let mut resolved = self.root.clone();
        let mut depth = 0;

        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                }
                _ => return None,
            }
        }

        (depth > 0).then_some(resolved)
    }
}

impl ResourceSource for StaticDir {
    async fn load(&self, name: &str) -> Option<Vec<u8>> {
        let path = self.resolve(name)?;
        let metadata = tokio::fs::metadata(&path).await.ok()?;
        if !metadata.is_file() {
            return None;
        }
        tokio::fs::read(&path).await.ok()
    }
}

/// Resources held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: FxHashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(name, bytes);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(name.into(), bytes.into());
    }
}

impl ResourceSource for MemorySource {
    async fn load(&self, name: &str) -> Option<Vec<u8>> {
        self.files.get(name).cloned()
    }
}
