#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use import_mapper::{column::ColumnMapping, mapper::MappedRecord};
use serde_json::Value;
use tempfile::{TempDir, tempdir};

/// Scratch directory for input files, mappings and JSON Lines output.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.file(name);
        fs::write(&path, contents).expect("write temp file contents");
        path
    }

    pub fn load_mapping(&self, name: &str) -> ColumnMapping {
        ColumnMapping::load(&self.file(name)).expect("load mapping")
    }

    /// Reads a JSON Lines file produced by `map`.
    pub fn read_json_lines(&self, name: &str) -> Vec<Value> {
        fs::read_to_string(self.file(name))
            .expect("read output")
            .lines()
            .map(|line| serde_json::from_str(line).expect("valid JSON line"))
            .collect()
    }
}

/// Serializes a record the way the `map` command writes it.
pub fn to_json(record: &MappedRecord) -> Value {
    serde_json::to_value(record).expect("serialize record")
}
