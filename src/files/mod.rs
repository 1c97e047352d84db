use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub mod export;
pub mod extract;
pub mod normalize;

pub use export::{
    read_project_summary, resolve_export_path, write_file_set, write_project_summary, ExportError,
    PROJECT_SUMMARY_FILE_NAME,
};
pub use extract::{extract_file_map, ExtractedFiles, ExtractionError, ParsePath};
pub use normalize::{
    is_package_marker, merge_into, normalize_entry, normalize_file_set, PACKAGE_MARKER,
};

/// Ordered mapping from project-relative path to file content.
///
/// Paths are unique. Inserting an existing path replaces its content in
/// place, so display order follows first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    entries: Vec<(String, String)>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == path)
            .map(|(_, content)| content.as_str())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Returns the previous content when `path` was already present.
    pub fn insert(&mut self, path: String, content: String) -> Option<String> {
        if let Some(slot) = self.entries.iter_mut().find(|(key, _)| *key == path) {
            return Some(std::mem::replace(&mut slot.1, content));
        }
        self.entries.push((path, content));
        None
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(path, content)| (path.as_str(), content.as_str()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(path, _)| path.as_str())
    }
}

impl IntoIterator for FileSet {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FileSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = FileSet::new();
        for (path, content) in iter {
            set.insert(path.into(), content.into());
        }
        set
    }
}

impl Serialize for FileSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (path, content) in &self.entries {
            map.serialize_entry(path, content)?;
        }
        map.end()
    }
}

struct FileSetVisitor;

impl<'de> Visitor<'de> for FileSetVisitor {
    type Value = FileSet;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of file paths to string contents")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut set = FileSet::new();
        while let Some((path, content)) = access.next_entry::<String, String>()? {
            set.insert(path, content);
        }
        Ok(set)
    }
}

impl<'de> Deserialize<'de> for FileSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FileSetVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_in_place() {
        let mut set = FileSet::new();
        set.insert("a.py".to_string(), "1".to_string());
        set.insert("b.py".to_string(), "2".to_string());
        let previous = set.insert("a.py".to_string(), "3".to_string());

        assert_eq!(previous.as_deref(), Some("1"));
        assert_eq!(set.paths().collect::<Vec<_>>(), vec!["a.py", "b.py"]);
        assert_eq!(set.get("a.py"), Some("3"));
    }

    #[test]
    fn serializes_in_insertion_order() {
        let set: FileSet = [("z.py", "z"), ("a.py", "a")].into_iter().collect();
        let json = serde_json::to_string(&set).expect("serialize");
        assert_eq!(json, r#"{"z.py":"z","a.py":"a"}"#);

        let back: FileSet = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, set);
    }

    #[test]
    fn rejects_non_string_contents_on_deserialize() {
        let err = serde_json::from_str::<FileSet>(r#"{"a.py": 1}"#);
        assert!(err.is_err());
    }
}
