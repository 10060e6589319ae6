//! Publication sinks: where snapshots and boards end up.
//!
//! Every publish replaces the whole document at its key; there is no merge.

use crate::config::StoreConfig;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("document store rejected '{key}' with HTTP {status}")]
    Status { key: String, status: u16 },
    #[error("sink config error: {0}")]
    Config(String),
}

pub trait PublicationSink {
    fn name(&self) -> &str;
    fn publish(&self, key: &str, document: &Value) -> Result<(), PublishError>;
}

/// `{dir}/{key}.json`, written to a temp file and renamed into place.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key.replace(['/', '\\'], "_")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl PublicationSink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn publish(&self, key: &str, document: &Value) -> Result<(), PublishError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| PublishError::Io { path, source }
        };

        std::fs::create_dir_all(&self.dir).map_err(io_err(&self.dir))?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(document)?;
        std::fs::write(&tmp, body).map_err(io_err(&tmp))?;
        std::fs::rename(&tmp, &path).map_err(io_err(&path))?;

        info!(path = %path.display(), "document written");
        Ok(())
    }
}

/// HTTP document store: `PUT {base_url}/{collection}/{key}` with a JSON body.
pub struct DocumentStore {
    client: reqwest::blocking::Client,
    base_url: String,
    collection: String,
    token: Option<String>,
}

impl DocumentStore {
    /// Build the store handle. A configured but unset token variable is an error.
    pub fn connect(config: &StoreConfig) -> Result<Self, PublishError> {
        let token = match &config.token_env {
            Some(var) => Some(std::env::var(var).map_err(|_| {
                PublishError::Config(format!("environment variable {var} is not set"))
            })?),
            None => None,
        };
        if config.base_url.trim().is_empty() {
            return Err(PublishError::Config("store base_url is empty".into()));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
            token,
        })
    }

    pub fn document_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.collection, key)
    }
}

impl PublicationSink for DocumentStore {
    fn name(&self) -> &str {
        "document_store"
    }

    fn publish(&self, key: &str, document: &Value) -> Result<(), PublishError> {
        let url = self.document_url(key);
        let mut request = self.client.put(&url).json(document);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let resp = request.send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PublishError::Status {
                key: key.to_string(),
                status: status.as_u16(),
            });
        }
        info!(%url, "document published");
        Ok(())
    }
}

/// Publish to a primary sink, then mirror to a local file.
///
/// The mirror is written even when the primary fails; the primary's error is
/// the one reported.
pub struct MirroredSink<P> {
    primary: P,
    mirror: FileSink,
}

impl<P: PublicationSink> MirroredSink<P> {
    pub fn new(primary: P, mirror: FileSink) -> Self {
        Self { primary, mirror }
    }
}

impl<P: PublicationSink> PublicationSink for MirroredSink<P> {
    fn name(&self) -> &str {
        self.primary.name()
    }

    fn publish(&self, key: &str, document: &Value) -> Result<(), PublishError> {
        let primary = self.primary.publish(key, document);
        let mirror = self.mirror.publish(key, document);
        if let Err(e) = &mirror {
            debug!(error = %e, "mirror write failed");
        }
        primary.and(mirror)
    }
}

impl PublicationSink for Box<dyn PublicationSink> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn publish(&self, key: &str, document: &Value) -> Result<(), PublishError> {
        (**self).publish(key, document)
    }
}
