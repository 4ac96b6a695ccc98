//! File-operations gateway.
//!
//! The workspace engine never touches the disk itself.  Every physical
//! operation goes through a [`FileGateway`], which may fail; the engine
//! turns those failures into per-item report entries or whole-operation
//! errors.
//!
//! Two implementations ship with the crate: [`local::LocalGateway`] (tokio
//! filesystem calls) and [`memory::MemoryGateway`] (an in-memory tree with
//! fault injection, used by tests and the demo mode).

pub mod local;
pub mod memory;

use async_trait::async_trait;

use crate::core::entity::{Entity, FlatStore};
use crate::error::GatewayError;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Result of a recursive directory scan.  Includes the scanned root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub files: Vec<Entity>,
    pub folders: Vec<Entity>,
}

impl ScanResult {
    pub fn len(&self) -> usize {
        self.files.len() + self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.folders.is_empty()
    }

    /// Merge into `store`, skipping paths it already holds.  Returns the
    /// number of new entities.
    pub fn merge_into(self, store: &mut FlatStore) -> usize {
        store.extend(self.folders.into_iter().chain(self.files))
    }
}

#[async_trait]
pub trait FileGateway: Send + Sync {
    async fn create_file(&self, path: &str, content: Option<&str>) -> GatewayResult<Entity>;

    async fn create_folder(&self, path: &str) -> GatewayResult<Entity>;

    /// Rename or move `old_path` to `new_path`.  Fails if `new_path` exists.
    async fn move_item(&self, old_path: &str, new_path: &str, is_dir: bool) -> GatewayResult<()>;

    /// Copy `source` to `dest` (recursively for folders).  Returns the new
    /// top-level entity.
    async fn copy_item(&self, source: &str, dest: &str, is_dir: bool) -> GatewayResult<Entity>;

    async fn delete_file(&self, path: &str) -> GatewayResult<()>;

    async fn delete_folder(&self, path: &str) -> GatewayResult<()>;

    /// Recursive listing of `root`, including `root` itself.
    async fn scan_directory(&self, root: &str) -> GatewayResult<ScanResult>;

    async fn read_file(&self, path: &str) -> GatewayResult<String>;

    async fn write_file(&self, path: &str, content: &str) -> GatewayResult<()>;
}
