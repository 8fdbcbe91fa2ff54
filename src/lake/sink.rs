//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Tessera.
//! The Tessera project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Object Sinks
//!
//! [`TeObjectSink`] is the narrow interface the lake writes through. Any
//! object store can sit behind it; the pipeline only needs three calls.
//!
//! Sinks are append-only: `put` on a key that already exists must fail
//! rather than replace the object.
//!
//! - [`TeMemoryObjectSink`]: in-process map, for tests and embedding
//! - [`TeLocalObjectSink`]: directory tree on the local filesystem

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::errors::{Result, TeError};

#[async_trait]
pub trait TeObjectSink: fmt::Debug + Send + Sync {
    /// Stores a new object. Fails if `key` already exists.
    async fn put(&self, key: &str, payload: Vec<u8>) -> Result<()>;

    /// Reads an object back by the key it was stored under.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Lists every key under the `prefix` directory, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

fn dir_prefix(prefix: &str) -> String {
    format!("{}/", prefix.trim_end_matches('/'))
}

/// Object sink backed by an in-memory ordered map.
#[derive(Debug, Default)]
pub struct TeMemoryObjectSink {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl TeMemoryObjectSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn objects(&self) -> MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.objects.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn len(&self) -> usize {
        self.objects().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects().is_empty()
    }

    /// Every stored key, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.objects().keys().cloned().collect()
    }

    /// Number of objects under a prefix directory.
    pub fn count_under(&self, prefix: &str) -> usize {
        let prefix = dir_prefix(prefix);
        self.objects()
            .keys()
            .filter(|key| key.starts_with(&prefix))
            .count()
    }
}

#[async_trait]
impl TeObjectSink for TeMemoryObjectSink {
    async fn put(&self, key: &str, payload: Vec<u8>) -> Result<()> {
        let mut objects = self.objects();
        if objects.contains_key(key) {
            return Err(TeError::Io(format!("object '{key}' already exists")));
        }
        objects.insert(key.to_string(), payload);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.objects()
            .get(key)
            .cloned()
            .ok_or_else(|| TeError::Io(format!("object '{key}' not found")))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = dir_prefix(prefix);
        Ok(self
            .objects()
            .keys()
            .filter(|key| key.starts_with(&prefix))
            .cloned()
            .collect())
    }
}

/// Object sink that maps keys onto files below a root directory.
///
/// A URL scheme such as `s3://` is stripped from keys, so lake roots
/// configured for an object store can be replayed onto local disk. Objects
/// are written to a hidden temporary file and then hard-linked into place,
/// which fails if the final name is taken.
#[derive(Debug, Clone)]
pub struct TeLocalObjectSink {
    root: PathBuf,
}

impl TeLocalObjectSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        TeLocalObjectSink { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = key
            .split_once("://")
            .map_or(key, |(_, rest)| rest)
            .trim_start_matches('/');
        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(TeError::configuration(format!(
                "object key '{key}' must be a plain relative path"
            )));
        }
        Ok(self.root.join(relative))
    }

    fn temp_path(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{name}.tmp"))
    }
}

#[async_trait]
impl TeObjectSink for TeLocalObjectSink {
    async fn put(&self, key: &str, payload: Vec<u8>) -> Result<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp = Self::temp_path(&path);
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp)
            .await?;
        let written = async {
            file.write_all(&payload).await?;
            file.sync_all().await
        }
        .await;
        drop(file);
        if let Err(err) = written {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(err.into());
        }

        let linked = tokio::fs::hard_link(&temp, &path).await;
        tokio::fs::remove_file(&temp).await?;
        linked.map_err(|err| {
            if err.kind() == std::io::ErrorKind::AlreadyExists {
                TeError::Io(format!("object '{key}' already exists"))
            } else {
                err.into()
            }
        })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key)?;
        Ok(tokio::fs::read(&path).await?)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let base = self.resolve(prefix.trim_end_matches('/'))?;
        let prefix = prefix.trim_end_matches('/');
        let mut keys = Vec::new();
        let mut pending = vec![(base, prefix.to_string())];

        while let Some((dir, key_prefix)) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.starts_with('.') {
                    continue;
                }
                let key = format!("{key_prefix}/{name}");
                if entry.file_type().await?.is_dir() {
                    pending.push((entry.path(), key));
                } else {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}
