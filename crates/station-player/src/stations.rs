//! Station list parsing.
//!
//! Each line is either `name=source` or a bare `source`. The split happens at
//! the first `=` only when no `/` precedes it, so `http://host/a=b` keeps its
//! query intact and gets an empty name.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

/// One playable entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StationEntry {
    /// Display name, possibly empty.
    pub name: String,
    /// Locator handed to the player command.
    pub source: String,
}

impl StationEntry {
    /// Split a single entry into name and source.
    pub fn parse(entry: &str) -> Self {
        let eq = entry.find('=');
        let slash = entry.find('/');
        match eq {
            Some(eq) if slash.is_none_or(|slash| slash > eq) => Self {
                name: entry[..eq].to_string(),
                source: entry[eq + 1..].to_string(),
            },
            _ => Self {
                name: String::new(),
                source: entry.to_string(),
            },
        }
    }

    /// Name if present, otherwise the source.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.source
        } else {
            &self.name
        }
    }
}

/// Ordered, immutable list of stations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StationList {
    entries: Vec<StationEntry>,
}

impl StationList {
    pub fn new(entries: Vec<StationEntry>) -> Self {
        Self { entries }
    }

    /// Parse a station file body. Blank lines and `#` comments are skipped.
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(StationEntry::parse)
            .collect();
        Self { entries }
    }

    /// Read and parse a station file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read station list {:?}", path))?;
        let list = Self::parse(&raw);
        tracing::info!(path = ?path, stations = list.len(), "station list loaded");
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&StationEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StationEntry> {
        self.entries.iter()
    }
}
