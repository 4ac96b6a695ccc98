//! In-memory gateway.
//!
//! Holds a virtual filesystem in a `BTreeMap` and records every call, so
//! tests can assert exactly which physical operations an engine operation
//! performed.  Individual paths can be rigged to fail.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{FileGateway, GatewayResult, ScanResult};
use crate::core::entity::{Entity, EntityKind};
use crate::core::path;
use crate::error::GatewayError;

/// One recorded gateway invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    CreateFile(String),
    CreateFolder(String),
    Move { from: String, to: String },
    Copy { from: String, to: String },
    DeleteFile(String),
    DeleteFolder(String),
    Scan(String),
    Read(String),
    Write(String),
}

impl GatewayCall {
    /// Calls that change the filesystem.
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            GatewayCall::Scan(_) | GatewayCall::Read(_) | GatewayCall::Write(_)
        )
    }
}

#[derive(Debug, Clone)]
struct Node {
    kind: EntityKind,
    content: String,
    modified: u64,
}

#[derive(Debug, Default)]
struct Inner {
    nodes: BTreeMap<String, Node>,
    failures: HashMap<String, GatewayError>,
    calls: Vec<GatewayCall>,
    clock: u64,
}

impl Inner {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn entity(&self, path: &str) -> Option<Entity> {
        let node = self.nodes.get(path)?;
        let mut entity = Entity::new(path, node.kind);
        if node.kind == EntityKind::File {
            entity.size = Some(node.content.len() as u64);
        }
        entity.last_modified = Some(node.modified);
        Some(entity)
    }

    fn injected(&self, path: &str) -> GatewayResult<()> {
        match self.failures.get(path) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn require_folder(&self, path: &str) -> GatewayResult<()> {
        match self.nodes.get(path) {
            Some(node) if node.kind.is_folder() => Ok(()),
            Some(_) => Err(GatewayError::Io(format!("{path} is not a directory"))),
            None => Err(GatewayError::NotFound(path.to_string())),
        }
    }

    fn require_absent(&self, path: &str) -> GatewayResult<()> {
        if self.nodes.contains_key(path) {
            return Err(GatewayError::AlreadyExists(path.to_string()));
        }
        Ok(())
    }

    fn subtree(&self, root: &str) -> Vec<String> {
        self.nodes
            .keys()
            .filter(|p| path::is_same_or_descendant(p, root))
            .cloned()
            .collect()
    }

    fn insert(&mut self, path: &str, kind: EntityKind, content: String) {
        let modified = self.tick();
        self.nodes.insert(
            path.to_string(),
            Node {
                kind,
                content,
                modified,
            },
        );
    }

    /// Create every missing ancestor of `path` as a folder.
    fn ensure_ancestors(&mut self, path: &str) {
        let parent = path::dirname(path);
        if parent == path || self.nodes.contains_key(&parent) {
            return;
        }
        self.ensure_ancestors(&parent);
        self.insert(&parent, EntityKind::Folder, String::new());
    }
}

/// Clones share one tree, so a test can keep a handle while a workspace
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a folder (and its ancestors).
    pub fn add_folder(&self, raw: &str) {
        let p = path::normalize(raw);
        let mut inner = self.lock();
        inner.ensure_ancestors(&p);
        inner.insert(&p, EntityKind::Folder, String::new());
    }

    /// Seed a file (and its ancestor folders).
    pub fn add_file(&self, raw: &str, content: &str) {
        let p = path::normalize(raw);
        let mut inner = self.lock();
        inner.ensure_ancestors(&p);
        inner.insert(&p, EntityKind::File, content.to_string());
    }

    pub fn with_folder(self, path: &str) -> Self {
        self.add_folder(path);
        self
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.add_file(path, content);
        self
    }

    /// Make every operation whose primary path is `path` fail.
    pub fn fail_on(&self, path: &str, err: GatewayError) {
        self.lock().failures.insert(path.to_string(), err);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Remove a path behind the engine's back (simulates an external delete).
    pub fn remove_external(&self, path: &str) {
        let mut inner = self.lock();
        for p in inner.subtree(path) {
            inner.nodes.remove(&p);
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        self.lock().nodes.contains_key(path)
    }

    pub fn content(&self, path: &str) -> Option<String> {
        self.lock().nodes.get(path).map(|n| n.content.clone())
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.lock().calls.clone()
    }

    pub fn structural_calls(&self) -> Vec<GatewayCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.is_structural())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }
}

#[async_trait]
impl FileGateway for MemoryGateway {
    async fn create_file(&self, path: &str, content: Option<&str>) -> GatewayResult<Entity> {
        let mut inner = self.lock();
        inner.calls.push(GatewayCall::CreateFile(path.to_string()));
        inner.injected(path)?;
        inner.require_absent(path)?;
        inner.require_folder(&path::dirname(path))?;
        inner.insert(path, EntityKind::File, content.unwrap_or_default().to_string());
        inner
            .entity(path)
            .ok_or_else(|| GatewayError::NotFound(path.to_string()))
    }

    async fn create_folder(&self, path: &str) -> GatewayResult<Entity> {
        let mut inner = self.lock();
        inner.calls.push(GatewayCall::CreateFolder(path.to_string()));
        inner.injected(path)?;
        inner.require_absent(path)?;
        inner.require_folder(&path::dirname(path))?;
        inner.insert(path, EntityKind::Folder, String::new());
        inner
            .entity(path)
            .ok_or_else(|| GatewayError::NotFound(path.to_string()))
    }

    async fn move_item(&self, old_path: &str, new_path: &str, _is_dir: bool) -> GatewayResult<()> {
        let mut inner = self.lock();
        inner.calls.push(GatewayCall::Move {
            from: old_path.to_string(),
            to: new_path.to_string(),
        });
        inner.injected(old_path)?;
        if !inner.nodes.contains_key(old_path) {
            return Err(GatewayError::NotFound(old_path.to_string()));
        }
        if path::is_descendant(new_path, old_path) {
            return Err(GatewayError::Io(format!(
                "cannot move {old_path} into its own subtree"
            )));
        }
        inner.require_absent(new_path)?;
        inner.require_folder(&path::dirname(new_path))?;

        for old in inner.subtree(old_path) {
            if let (Some(node), Some(new)) =
                (inner.nodes.remove(&old), path::rebase(&old, old_path, new_path))
            {
                inner.nodes.insert(new, node);
            }
        }
        Ok(())
    }

    async fn copy_item(&self, source: &str, dest: &str, _is_dir: bool) -> GatewayResult<Entity> {
        let mut inner = self.lock();
        inner.calls.push(GatewayCall::Copy {
            from: source.to_string(),
            to: dest.to_string(),
        });
        inner.injected(source)?;
        if !inner.nodes.contains_key(source) {
            return Err(GatewayError::NotFound(source.to_string()));
        }
        if path::is_descendant(dest, source) {
            return Err(GatewayError::Io(format!("cannot copy {source} into itself")));
        }
        inner.require_absent(dest)?;
        inner.require_folder(&path::dirname(dest))?;

        for old in inner.subtree(source) {
            let Some(new) = path::rebase(&old, source, dest) else {
                continue;
            };
            if let Some(node) = inner.nodes.get(&old).cloned() {
                inner.insert(&new, node.kind, node.content);
            }
        }
        inner
            .entity(dest)
            .ok_or_else(|| GatewayError::NotFound(dest.to_string()))
    }

    async fn delete_file(&self, path: &str) -> GatewayResult<()> {
        let mut inner = self.lock();
        inner.calls.push(GatewayCall::DeleteFile(path.to_string()));
        inner.injected(path)?;
        match inner.nodes.get(path) {
            Some(node) if !node.kind.is_folder() => {
                inner.nodes.remove(path);
                Ok(())
            }
            Some(_) => Err(GatewayError::Io(format!("{path} is a directory"))),
            None => Err(GatewayError::NotFound(path.to_string())),
        }
    }

    async fn delete_folder(&self, path: &str) -> GatewayResult<()> {
        let mut inner = self.lock();
        inner.calls.push(GatewayCall::DeleteFolder(path.to_string()));
        inner.injected(path)?;
        inner.require_folder(path)?;
        for p in inner.subtree(path) {
            inner.nodes.remove(&p);
        }
        Ok(())
    }

    async fn scan_directory(&self, root: &str) -> GatewayResult<ScanResult> {
        let mut inner = self.lock();
        inner.calls.push(GatewayCall::Scan(root.to_string()));
        inner.injected(root)?;
        inner.require_folder(root)?;

        let mut result = ScanResult::default();
        for p in inner.subtree(root) {
            if let Some(entity) = inner.entity(&p) {
                if entity.is_folder() {
                    result.folders.push(entity);
                } else {
                    result.files.push(entity);
                }
            }
        }
        Ok(result)
    }

    async fn read_file(&self, path: &str) -> GatewayResult<String> {
        let mut inner = self.lock();
        inner.calls.push(GatewayCall::Read(path.to_string()));
        inner.injected(path)?;
        match inner.nodes.get(path) {
            Some(node) if !node.kind.is_folder() => Ok(node.content.clone()),
            Some(_) => Err(GatewayError::Io(format!("{path} is a directory"))),
            None => Err(GatewayError::NotFound(path.to_string())),
        }
    }

    async fn write_file(&self, path: &str, content: &str) -> GatewayResult<()> {
        let mut inner = self.lock();
        inner.calls.push(GatewayCall::Write(path.to_string()));
        inner.injected(path)?;
        inner.require_folder(&path::dirname(path))?;
        if inner.nodes.get(path).is_some_and(|n| n.kind.is_folder()) {
            return Err(GatewayError::Io(format!("{path} is a directory")));
        }
        inner.insert(path, EntityKind::File, content.to_string());
        Ok(())
    }
}
