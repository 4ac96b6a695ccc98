//! Virtual path helpers.
//!
//! Every path the workspace model handles is a forward-slash, absolute string
//! (`/home/me/notes/todo.md`, or `C:/notes/todo.md` on Windows hosts).  These
//! helpers never touch the filesystem; they only manipulate strings, so the
//! engine behaves identically whatever the backing gateway is.

/// Normalise a path: trim, convert `\` to `/`, collapse duplicate slashes,
/// resolve `.`/`..`, drop any trailing slash and ensure a leading `/`
/// (unless the path starts with a drive letter).
pub fn normalize(path: &str) -> String {
    let trimmed = path.trim().replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    let mut drive: Option<&str> = None;

    for (i, segment) in trimmed.split('/').enumerate() {
        if i == 0 && is_drive(segment) {
            drive = Some(segment);
            continue;
        }
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let body = segments.join("/");
    match drive {
        Some(d) if body.is_empty() => format!("{d}/"),
        Some(d) => format!("{d}/{body}"),
        None => format!("/{body}"),
    }
}

fn is_drive(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Whether `path` is a filesystem root (`/` or `C:/`).
pub fn is_root(path: &str) -> bool {
    path == "/" || (path.len() == 3 && path.get(..2).is_some_and(is_drive) && path.ends_with('/'))
}

/// Join a directory and a child name.
pub fn join(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Parent directory of `path` (`/a/b` → `/a`, `/a` → `/`).  The root is its
/// own parent.
pub fn dirname(path: &str) -> String {
    if is_root(path) {
        return path.to_string();
    }
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => {
            let head = &path[..idx];
            // `C:/x` → `C:/`, not `C:`.
            if is_drive(head) {
                format!("{head}/")
            } else {
                head.to_string()
            }
        }
        None => "/".to_string(),
    }
}

/// Final component of `path`.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').find(|s| !s.is_empty()).unwrap_or(path)
}

/// `true` when `path` equals `ancestor` or lives somewhere below it.
pub fn is_same_or_descendant(path: &str, ancestor: &str) -> bool {
    path == ancestor || is_descendant(path, ancestor)
}

/// `true` when `path` lives strictly below `ancestor`.
pub fn is_descendant(path: &str, ancestor: &str) -> bool {
    if ancestor.ends_with('/') {
        path.len() > ancestor.len() && path.starts_with(ancestor)
    } else {
        path.len() > ancestor.len() + 1
            && path.starts_with(ancestor)
            && path.as_bytes()[ancestor.len()] == b'/'
    }
}

/// Rewrite `path` from under `old_prefix` to under `new_prefix`.
///
/// Returns `None` when `path` is unrelated to `old_prefix`.
pub fn rebase(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    if path == old_prefix {
        return Some(new_prefix.to_string());
    }
    if !is_descendant(path, old_prefix) {
        return None;
    }
    let rest = path[old_prefix.len()..].trim_start_matches('/');
    Some(join(new_prefix, rest))
}

/// Split a file name into stem and extension (extension keeps its dot).
///
/// Dot-files keep their whole name as the stem: `.env` → (`.env`, ``).
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(0) | None => (name, ""),
        Some(idx) => (&name[..idx], &name[idx..]),
    }
}

/// Validate a single path component typed by the user.
pub fn is_valid_name(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// Convert an OS path into the virtual form used by the model.
pub fn from_os(path: &std::path::Path) -> String {
    normalize(&path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_matches_expected_cases() {
        let cases = [
            ("", "/"),
            ("   ", "/"),
            ("foo/bar", "/foo/bar"),
            ("/foo//bar/", "/foo/bar"),
            ("./foo/../bar", "/bar"),
            ("\\\\foo\\\\bar", "/foo/bar"),
            ("/../../", "/"),
            ("C:\\notes\\a.md", "C:/notes/a.md"),
            ("C:", "C:/"),
        ];
        for (input, expected) in cases {
            assert_eq!(normalize(input), expected, "input={input:?}");
        }
    }

    #[test]
    fn dirname_and_basename() {
        assert_eq!(dirname("/a/b/c.md"), "/a/b");
        assert_eq!(dirname("/a"), "/");
        assert_eq!(dirname("/"), "/");
        assert_eq!(dirname("C:/notes"), "C:/");
        assert_eq!(basename("/a/b/c.md"), "c.md");
        assert_eq!(basename("/"), "/");
    }

    #[test]
    fn descendant_checks_respect_segment_boundaries() {
        assert!(is_descendant("/a/b", "/a"));
        assert!(!is_descendant("/ab", "/a"));
        assert!(!is_descendant("/a", "/a"));
        assert!(is_same_or_descendant("/a", "/a"));
        assert!(is_descendant("/x", "/"));
        assert!(!is_descendant("/", "/"));
    }

    #[test]
    fn rebase_rewrites_prefix_only() {
        assert_eq!(rebase("/f/x.md", "/f", "/g/f").as_deref(), Some("/g/f/x.md"));
        assert_eq!(rebase("/f", "/f", "/g/f").as_deref(), Some("/g/f"));
        assert_eq!(rebase("/foo/x.md", "/f", "/g"), None);
    }

    #[test]
    fn split_extension_handles_dotfiles() {
        assert_eq!(split_extension("Untitled.md"), ("Untitled", ".md"));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_extension(".env"), (".env", ""));
        assert_eq!(split_extension("README"), ("README", ""));
    }

    #[test]
    fn name_validation() {
        assert!(is_valid_name("notes.md"));
        assert!(!is_valid_name("  "));
        assert!(!is_valid_name("a/b"));
        assert!(!is_valid_name(".."));
    }
}
