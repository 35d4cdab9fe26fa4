//! Class label list.
//!
//! The detector reports class ids; the label list maps them to names. The
//! list is loaded once at startup from a plain text file, one label per
//! line, in model output order. The only lookup the controller needs is the
//! index of the target label ("bottle"), resolved once and checked hard at
//! startup so a mismatched model/label pair fails before the robot moves.

use std::path::Path;

use anyhow::{anyhow, Result};

/// Immutable class-id to name mapping.
#[derive(Clone, Debug)]
pub struct LabelMap {
    labels: Vec<String>,
}

impl LabelMap {
    /// Load labels from a text file, one per line. Trailing blank lines are
    /// dropped; interior order is preserved because ids are positional.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read label list {}: {}", path.display(), e))?;
        Ok(Self::parse(&raw))
    }

    fn parse(raw: &str) -> Self {
        let mut labels: Vec<String> = raw.lines().map(|line| line.trim().to_string()).collect();
        while labels.last().is_some_and(|label| label.is_empty()) {
            labels.pop();
        }
        Self { labels }
    }

    /// Build a map from an explicit name list (synthetic runs and tests).
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Name for a class id, if in range.
    pub fn name(&self, class_id: usize) -> Option<&str> {
        self.labels.get(class_id).map(String::as_str)
    }

    /// First class id carrying the given label.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|entry| entry == label)
    }

    /// Like `index_of`, but a missing label is a startup error.
    pub fn require(&self, label: &str) -> Result<usize> {
        self.index_of(label)
            .ok_or_else(|| anyhow!("label '{}' not present in the loaded label list", label))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parses_labels_in_order() {
        let map = LabelMap::parse("person\ncar\nbottle\n");
        assert_eq!(map.len(), 3);
        assert_eq!(map.name(2), Some("bottle"));
        assert_eq!(map.index_of("bottle"), Some(2));
        assert_eq!(map.index_of("car"), Some(1));
    }

    #[test]
    fn trailing_blank_lines_are_dropped() {
        let map = LabelMap::parse("bottle\n\n\n");
        assert_eq!(map.len(), 1);
        assert_eq!(map.index_of("bottle"), Some(0));
    }

    #[test]
    fn require_rejects_missing_label() {
        let map = LabelMap::from_names(["person", "car"]);
        assert!(map.require("bottle").is_err());
        assert_eq!(map.require("car").unwrap(), 1);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp label file");
        file.write_all(b"cup\nbottle\n").expect("write labels");

        let map = LabelMap::load(file.path()).expect("load labels");
        assert_eq!(map.require("bottle").unwrap(), 1);
    }
}
