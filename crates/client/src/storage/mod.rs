//! Object sources for the JSON snapshot files.
//!
//! In production the files live in a storage bucket served over HTTP. For
//! local development the same tree can be read from disk.

pub mod http;
pub mod local;

pub use http::{HttpObjectSource, StorageConfig};
pub use local::LocalObjectSource;

use std::sync::Arc;

use civic_core::config::AppConfig;
use civic_core::{Error, ObjectSource};

/// Build the object source selected by `config`: the local tree when
/// `dev_file_path` is set, the bucket otherwise.
pub fn object_source(config: &AppConfig) -> Result<Arc<dyn ObjectSource>, Error> {
    if let Some(root) = &config.dev_file_path {
        return Ok(Arc::new(LocalObjectSource::new(root)));
    }
    Ok(Arc::new(HttpObjectSource::new(StorageConfig::from_app(config))?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_source_selection() {
        let config = AppConfig::default();
        assert_eq!(object_source(&config).unwrap().describe(), "https://storage.googleapis.com/intronyc");

        let config = AppConfig { dev_file_path: Some("/srv/intronyc".into()), ..Default::default() };
        assert_eq!(object_source(&config).unwrap().describe(), "file:///srv/intronyc");
    }
}
