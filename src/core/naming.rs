//! Collision-free child names.

use std::collections::HashSet;

use super::entity::EntityKind;
use super::path;

pub const UNTITLED_FILE: &str = "Untitled.md";
pub const NEW_FOLDER: &str = "New Folder";

/// Default name for a freshly created entity of `kind`.
pub fn default_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::File => UNTITLED_FILE,
        EntityKind::Folder => NEW_FOLDER,
    }
}

/// `desired` if no sibling uses it, otherwise the first free
/// `stem (n).ext` (files) or `name (n)` (folders), counting from 1.
pub fn unique_name(desired: &str, kind: EntityKind, taken: &HashSet<String>) -> String {
    if !taken.contains(desired) {
        return desired.to_string();
    }
    let (stem, ext) = match kind {
        EntityKind::File => path::split_extension(desired),
        EntityKind::Folder => (desired, ""),
    };
    (1u64..)
        .map(|n| format!("{stem} ({n}){ext}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| desired.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taken(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn free_name_is_kept() {
        assert_eq!(unique_name("Untitled.md", EntityKind::File, &taken(&[])), "Untitled.md");
    }

    #[test]
    fn file_suffix_goes_before_extension() {
        let names = taken(&["Untitled.md", "Untitled (1).md"]);
        assert_eq!(unique_name("Untitled.md", EntityKind::File, &names), "Untitled (2).md");
    }

    #[test]
    fn folder_suffix_goes_at_the_end() {
        let names = taken(&["New Folder", "v1.2"]);
        assert_eq!(unique_name("New Folder", EntityKind::Folder, &names), "New Folder (1)");
        assert_eq!(unique_name("v1.2", EntityKind::Folder, &names), "v1.2 (1)");
    }
}
