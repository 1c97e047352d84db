use super::FileSet;

pub const PACKAGE_MARKER: &str = "__init__.py";

/// Spellings of the package marker that generators commonly produce. Only
/// these are rewritten; any other final segment passes through untouched.
const PACKAGE_MARKER_VARIANTS: &[&str] = &[
    "__init__.py",
    "_init_.py",
    "init.py",
    "__init.py",
    "init__.py",
    "_init__.py",
    "__init_.py",
    "___init___.py",
];

fn split_final_segment(path: &str) -> (&str, &str) {
    match path.rfind(['/', '\\']) {
        Some(idx) => path.split_at(idx + 1),
        None => ("", path),
    }
}

fn is_marker_variant(segment: &str) -> bool {
    let compact: String = segment
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    PACKAGE_MARKER_VARIANTS.contains(&compact.as_str())
}

fn canonical_path(path: &str) -> String {
    let (parent, name) = split_final_segment(path);
    if is_marker_variant(name) {
        format!("{parent}{PACKAGE_MARKER}")
    } else {
        path.to_string()
    }
}

pub fn is_package_marker(path: &str) -> bool {
    split_final_segment(path).1 == PACKAGE_MARKER
}

/// Normalizes one batch entry, returning `None` when it must be dropped.
pub fn normalize_entry(path: &str, content: Option<&str>) -> Option<(String, String)> {
    let path = canonical_path(path.trim());
    if path.trim().is_empty() {
        return None;
    }
    if is_package_marker(&path) {
        return Some((path, String::new()));
    }
    let content = content?;
    Some((path, content.trim().to_string()))
}

/// Merges `batch` over `existing`.
///
/// Every normalized batch entry replaces the entry at the same path; paths
/// missing from the batch are kept as they are.
pub fn merge_into<I, P, C>(existing: &FileSet, batch: I) -> FileSet
where
    I: IntoIterator<Item = (P, Option<C>)>,
    P: AsRef<str>,
    C: AsRef<str>,
{
    let mut merged = existing.clone();
    for (path, content) in batch {
        let content = content.as_ref().map(|text| text.as_ref());
        if let Some((path, content)) = normalize_entry(path.as_ref(), content) {
            merged.insert(path, content);
        }
    }
    merged
}

/// Re-normalizes a whole file set.
pub fn normalize_file_set(files: &FileSet) -> FileSet {
    merge_into(
        &FileSet::new(),
        files.iter().map(|(path, content)| (path, Some(content))),
    )
}
