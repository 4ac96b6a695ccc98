//! Disk-backed gateway built on `tokio::fs`.
//!
//! Directory scans use the [`ignore`] walker (so `.gitignore` and hidden-file
//! rules apply) on the blocking pool; recursive folder copies use
//! [`walkdir`].

use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use ignore::WalkBuilder;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use walkdir::WalkDir;

use super::{FileGateway, GatewayResult, ScanResult};
use crate::core::entity::{Entity, EntityKind};
use crate::core::path;
use crate::error::GatewayError;

/// Traversal knobs for [`LocalGateway::scan_directory`].
#[derive(Debug, Clone)]
pub struct WalkConfig {
    /// Respect `.gitignore` files.
    pub respect_gitignore: bool,
    /// Show hidden (dot-prefixed) entries.
    pub show_hidden: bool,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            respect_gitignore: true,
            show_hidden: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LocalGateway {
    walk: WalkConfig,
}

impl LocalGateway {
    pub fn new(walk: WalkConfig) -> Self {
        Self { walk }
    }

    pub fn walk_config(&self) -> &WalkConfig {
        &self.walk
    }
}

fn os_path(path: &str) -> PathBuf {
    PathBuf::from(path)
}

/// Stat `path` into an [`Entity`].
fn entity_from_path(path: &Path) -> io::Result<Entity> {
    let meta = std::fs::metadata(path)?;
    let kind = if meta.is_dir() {
        EntityKind::Folder
    } else {
        EntityKind::File
    };
    let mut entity = Entity::new(&path::from_os(path), kind);
    if !meta.is_dir() {
        entity.size = Some(meta.len());
    }
    entity.last_modified = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64);
    Ok(entity)
}

async fn stat(path: PathBuf) -> GatewayResult<Entity> {
    blocking(move || entity_from_path(&path)).await
}

/// Run blocking filesystem work off the async threads.
async fn blocking<T, F>(f: F) -> GatewayResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> io::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| GatewayError::Io(e.to_string()))?
        .map_err(GatewayError::from)
}

async fn ensure_absent(path: &Path) -> GatewayResult<()> {
    if tokio::fs::try_exists(path).await? {
        return Err(GatewayError::AlreadyExists(path.display().to_string()));
    }
    Ok(())
}

fn scan(root: &Path, walk: &WalkConfig) -> io::Result<ScanResult> {
    let root_entity = entity_from_path(root)?;
    if !root_entity.is_folder() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a directory", root.display()),
        ));
    }

    let walker = WalkBuilder::new(root)
        .hidden(!walk.show_hidden)
        .git_ignore(walk.respect_gitignore)
        .git_exclude(walk.respect_gitignore)
        .parents(walk.respect_gitignore)
        .follow_links(false)
        .build();

    let mut result = ScanResult::default();
    result.folders.push(root_entity);
    for entry in walker.flatten() {
        // The walker yields the root itself first.
        if entry.depth() == 0 {
            continue;
        }
        match entity_from_path(entry.path()) {
            Ok(entity) if entity.is_folder() => result.folders.push(entity),
            Ok(entity) => result.files.push(entity),
            Err(err) => debug!(path = %entry.path().display(), %err, "skipping unreadable entry"),
        }
    }
    Ok(result)
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> io::Result<()> {
    if dest.starts_with(src) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("cannot copy {} into itself", src.display()),
        ));
    }
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[async_trait]
impl FileGateway for LocalGateway {
    async fn create_file(&self, path: &str, content: Option<&str>) -> GatewayResult<Entity> {
        let target = os_path(path);
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await?;
        if let Some(content) = content {
            file.write_all(content.as_bytes()).await?;
        }
        file.flush().await?;
        debug!(path, "created file");
        stat(target).await
    }

    async fn create_folder(&self, path: &str) -> GatewayResult<Entity> {
        let target = os_path(path);
        tokio::fs::create_dir(&target).await?;
        debug!(path, "created folder");
        stat(target).await
    }

    async fn move_item(&self, old_path: &str, new_path: &str, _is_dir: bool) -> GatewayResult<()> {
        let to = os_path(new_path);
        ensure_absent(&to).await?;
        tokio::fs::rename(os_path(old_path), &to).await?;
        debug!(from = old_path, to = new_path, "moved");
        Ok(())
    }

    async fn copy_item(&self, source: &str, dest: &str, is_dir: bool) -> GatewayResult<Entity> {
        let from = os_path(source);
        let to = os_path(dest);
        ensure_absent(&to).await?;
        if is_dir {
            let (src, dst) = (from.clone(), to.clone());
            blocking(move || copy_dir_recursive(&src, &dst)).await?;
        } else {
            tokio::fs::copy(&from, &to).await?;
        }
        debug!(from = source, to = dest, "copied");
        stat(to).await
    }

    async fn delete_file(&self, path: &str) -> GatewayResult<()> {
        tokio::fs::remove_file(os_path(path)).await?;
        debug!(path, "deleted file");
        Ok(())
    }

    async fn delete_folder(&self, path: &str) -> GatewayResult<()> {
        tokio::fs::remove_dir_all(os_path(path)).await?;
        debug!(path, "deleted folder");
        Ok(())
    }

    async fn scan_directory(&self, root: &str) -> GatewayResult<ScanResult> {
        let dir = os_path(root);
        let walk = self.walk.clone();
        let result = blocking(move || scan(&dir, &walk)).await?;
        debug!(root, entries = result.len(), "scanned");
        Ok(result)
    }

    async fn read_file(&self, path: &str) -> GatewayResult<String> {
        Ok(tokio::fs::read_to_string(os_path(path)).await?)
    }

    async fn write_file(&self, path: &str, content: &str) -> GatewayResult<()> {
        tokio::fs::write(os_path(path), content).await?;
        Ok(())
    }
}
