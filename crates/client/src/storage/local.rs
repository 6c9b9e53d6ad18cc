use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use civic_core::{Error, ObjectSource};

/// Reads objects from a directory mirroring the bucket layout.
#[derive(Debug, Clone)]
pub struct LocalObjectSource {
    root: PathBuf,
}

impl LocalObjectSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path for `key`, or `None` if the key would leave the root.
    fn resolve(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key.trim_start_matches('/'));
        let contained = relative.components().all(|c| matches!(c, Component::Normal(_)));
        (contained && relative.components().next().is_some()).then(|| self.root.join(relative))
    }
}

#[async_trait]
impl ObjectSource for LocalObjectSource {
    async fn open_object(&self, key: &str) -> Result<Bytes, Error> {
        let Some(path) = self.resolve(key) else {
            tracing::warn!(key, "rejected object key outside the local root");
            return Err(Error::NotFound(key.to_string()));
        };

        match tokio::fs::read(&path).await {
            Ok(body) => Ok(Bytes::from(body)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::NotFound(key.to_string())),
            Err(e) => Err(Error::Transport(format!("{}: {e}", path.display()))),
        }
    }

    fn describe(&self) -> String {
        format!("file://{}", self.root.display())
    }
}
