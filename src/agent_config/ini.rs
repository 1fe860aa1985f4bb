//! Minimal ordered INI document, compatible with the files the agent reads.
//!
//! Sections keep their order and their keys keep insertion order. Comments and
//! blank lines are accepted on input and not preserved on output.

use anyhow::{bail, Context, Result};
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Section {
    name: String,
    entries: Vec<(String, String)>,
}

impl IniDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse INI text. `key = value` and `key: value` are both accepted.
    pub fn parse(text: &str) -> Result<Self> {
        let mut doc = Self::new();
        let mut current: Option<String> = None;

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let Some(name) = rest.strip_suffix(']') else {
                    bail!("line {}: unterminated section header: {}", index + 1, line);
                };
                let name = name.trim().to_string();
                doc.add_section(&name);
                current = Some(name);
                continue;
            }

            let Some(section) = current.as_deref() else {
                bail!("line {}: option outside of any section: {}", index + 1, line);
            };
            let Some(split) = line.find(|c: char| c == '=' || c == ':') else {
                bail!("line {}: expected 'key = value': {}", index + 1, line);
            };
            let key = line[..split].trim();
            let value = line[split + 1..].trim();
            doc.set(section, key, value);
        }

        Ok(doc)
    }

    /// Read and parse an INI file.
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Malformed config: {}", path.display()))
    }

    /// Add an empty section if it does not exist yet.
    pub fn add_section(&mut self, name: &str) {
        if !self.has_section(name) {
            self.sections.push(Section {
                name: name.to_string(),
                entries: Vec::new(),
            });
        }
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.sections.iter().any(|s| s.name == name)
    }

    /// Set `key` in `section`, creating the section when needed.
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.add_section(section);
        let Some(section) = self.sections.iter_mut().find(|s| s.name == section) else {
            return;
        };
        match section.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => section.entries.push((key.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.name == section)?
            .entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Section names in document order.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    /// Key/value pairs of a section in insertion order.
    pub fn entries(&self, section: &str) -> impl Iterator<Item = (&str, &str)> {
        let section = section.to_string();
        self.sections
            .iter()
            .filter(move |s| s.name == section)
            .flat_map(|s| s.entries.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

impl fmt::Display for IniDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            writeln!(f, "[{}]", section.name)?;
            for (key, value) in &section.entries {
                writeln!(f, "{} = {}", key, value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
