//! Helpers for the service's slash-separated virtual paths.

use crate::core::ROOT_PATH;

/// Join a directory path and a child name.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() || dir == ROOT_PATH {
        format!("/{name}")
    } else {
        format!("{}/{name}", dir.trim_end_matches('/'))
    }
}

/// Parent directory of a path; the root is its own parent.
pub fn parent(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => ROOT_PATH.to_owned(),
        Some(i) => trimmed[..i].to_owned(),
    }
}

/// Last segment of a path.
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Whether `path` equals `ancestor` or lies below it.
pub(crate) fn is_same_or_within(path: &str, ancestor: &str) -> bool {
    if path == ancestor || ancestor == ROOT_PATH {
        return true;
    }
    path.strip_prefix(ancestor)
        .map(|rest| rest.starts_with('/'))
        .unwrap_or(false)
}

/// Pick a free child name, adding ` (copy)`/` (copy N)` before the full extension.
pub(crate) fn unique_child_name(exists: impl Fn(&str) -> bool, desired: &str) -> Option<String> {
    if !exists(desired) {
        return Some(desired.to_owned());
    }

    let (base, ext) = split_base_and_full_ext(desired);
    (1usize..=10_000).find_map(|i| {
        let suffix = if i == 1 {
            " (copy)".to_owned()
        } else {
            format!(" (copy {i})")
        };
        let candidate = format!("{base}{suffix}{ext}");
        (!exists(&candidate)).then_some(candidate)
    })
}

fn split_base_and_full_ext(name: &str) -> (&str, &str) {
    if name.starts_with('.') && !name[1..].contains('.') {
        return (name, "");
    }
    name.find('.')
        .map(|i| (&name[..i], &name[i..]))
        .unwrap_or((name, ""))
}
