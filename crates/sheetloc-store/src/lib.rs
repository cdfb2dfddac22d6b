//! Locale string files on disk.
//!
//! Two layouts live side by side under one language directory:
//! a flat map `<dir>/<locale>.json` and nested files `<dir>/<locale>/*.json`.
//! Nested files are flattened with dot-joined keys before they reach the sync
//! engine and un-flattened again on save.

use color_eyre::eyre::{eyre, Result, WrapErr};
use serde::Serialize;
use serde_json::{Map, Value};
use sheetloc_core::{StringMap, SyncError};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileShape {
    /// Single-level `key -> string` map.
    Flat,
    /// Arbitrarily nested objects, addressed by dot-joined key paths.
    Nested,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Name recorded in the sheet's File column.
    pub name: String,
    pub path: PathBuf,
    pub shape: FileShape,
}

#[derive(Debug, Default)]
pub struct LoadedStrings {
    pub strings: StringMap,
    /// Entries that were not strings; reported as warnings, never fatal.
    pub skipped: Vec<SyncError>,
}

/// Source strings of a locale versus the ones a target locale already has.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Coverage {
    pub total: usize,
    pub translated: usize,
}

#[derive(Debug, Clone)]
pub struct LangStore {
    root: PathBuf,
}

impl LangStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files to translate for `locale`: the flat file first, then nested files by name.
    pub fn source_files(&self, locale: &str) -> Result<Vec<SourceFile>> {
        let mut out = Vec::new();
        let flat = self.root.join(format!("{locale}.json"));
        if flat.is_file() {
            out.push(SourceFile {
                name: format!("{locale}.json"),
                path: flat,
                shape: FileShape::Flat,
            });
        }
        let dir = self.root.join(locale);
        if dir.is_dir() {
            let mut nested = Vec::new();
            for entry in fs::read_dir(&dir).wrap_err_with(|| format!("reading {}", dir.display()))? {
                let path = entry?.path();
                let is_json = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("json"));
                if !path.is_file() || !is_json {
                    continue;
                }
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    nested.push(SourceFile {
                        name: name.to_string(),
                        path: path.clone(),
                        shape: FileShape::Nested,
                    });
                }
            }
            nested.sort_by(|a, b| a.name.cmp(&b.name));
            out.extend(nested);
        }
        tracing::debug!(event = "source_files", locale = locale, count = out.len());
        Ok(out)
    }

    /// Locales present in the directory: sub-directories and `*.json` file
    /// stems, sorted and without duplicates. A missing directory has none.
    pub fn locales(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.root)
            .wrap_err_with(|| format!("reading {}", self.root.display()))?
        {
            let path = entry?.path();
            let name = if path.is_dir() {
                path.file_name()
            } else if path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("json"))
            {
                path.file_stem()
            } else {
                None
            };
            if let Some(name) = name.and_then(|n| n.to_str()) {
                out.push(name.to_string());
            }
        }
        out.sort();
        out.dedup();
        Ok(out)
    }

    /// Count the source strings of `source_locale` and how many of them have a
    /// non-empty value in `locale`. A target file that cannot be read counts as
    /// untranslated.
    pub fn coverage(&self, source_locale: &str, locale: &str) -> Result<Coverage> {
        let mut cov = Coverage::default();
        for file in self.source_files(source_locale)? {
            let source = self.load_strings(&file)?.strings;
            cov.total += source.len();
            let target = self.target_path(&file, locale);
            let existing = match read_json(&target) {
                Ok(Some(Value::Object(m))) => m,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(event = "coverage_unreadable", path = %target.display(), error = %e);
                    continue;
                }
            };
            let present: Map<String, Value> = match file.shape {
                FileShape::Flat => existing,
                FileShape::Nested => flatten(&Value::Object(existing)).into_iter().collect(),
            };
            cov.translated += source
                .keys()
                .filter(|k| present.get(*k).and_then(Value::as_str).is_some_and(|v| !v.is_empty()))
                .count();
        }
        Ok(cov)
    }

    /// Read a source file into a flat map, skipping empty and non-string values.
    pub fn load_strings(&self, file: &SourceFile) -> Result<LoadedStrings> {
        let value = read_json(&file.path)?
            .ok_or_else(|| eyre!("{} does not exist", file.path.display()))?;
        let Value::Object(map) = value else {
            return Err(eyre!("{} is not a JSON object", file.path.display()));
        };
        let pairs: Vec<(String, Value)> = match file.shape {
            FileShape::Flat => map.into_iter().collect(),
            FileShape::Nested => flatten(&Value::Object(map)),
        };

        let mut loaded = LoadedStrings::default();
        for (key, value) in pairs {
            match value {
                Value::String(s) if s.is_empty() => {
                    tracing::debug!(event = "skip_empty", file = %file.name, key = %key);
                }
                Value::String(s) => {
                    loaded.strings.insert(key, s);
                }
                other => loaded.skipped.push(SyncError::InvalidSourceData {
                    key,
                    reason: format!("expected a string, found {}", json_kind(&other)),
                }),
            }
        }
        Ok(loaded)
    }

    /// Where translations of `file` into `target_locale` are stored.
    pub fn target_path(&self, file: &SourceFile, target_locale: &str) -> PathBuf {
        match file.shape {
            FileShape::Flat => self.root.join(format!("{target_locale}.json")),
            FileShape::Nested => self.root.join(target_locale).join(&file.name),
        }
    }

    /// Shallow-merge `translated` into the target file: keys already present and
    /// not part of this run are kept, translated keys overwrite.
    pub fn save_translations(
        &self,
        file: &SourceFile,
        target_locale: &str,
        translated: &StringMap,
    ) -> Result<PathBuf> {
        let path = self.target_path(file, target_locale);
        let existing = match read_json(&path)? {
            None => Map::new(),
            Some(Value::Object(m)) => m,
            Some(_) => return Err(eyre!("{} is not a JSON object", path.display())),
        };

        let merged = match file.shape {
            FileShape::Flat => {
                let mut m = existing;
                for (k, v) in translated {
                    m.insert(k.clone(), Value::String(v.clone()));
                }
                Value::Object(m)
            }
            FileShape::Nested => {
                let mut flat: Map<String, Value> =
                    flatten(&Value::Object(existing)).into_iter().collect();
                for (k, v) in translated {
                    flat.insert(k.clone(), Value::String(v.clone()));
                }
                unflatten(flat)
            }
        };

        write_json_atomic(&path, &merged)?;
        tracing::info!(event = "translations_saved", path = %path.display(), keys = translated.len());
        Ok(path)
    }
}

fn read_json(path: &Path) -> Result<Option<Value>> {
    match fs::read_to_string(path) {
        Ok(text) => {
            let v = serde_json::from_str(&text)
                .wrap_err_with(|| format!("invalid JSON in {}", path.display()))?;
            Ok(Some(v))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).wrap_err_with(|| format!("reading {}", path.display())),
    }
}

/// Pretty JSON with four-space indentation, written through a temp file in the
/// same directory so readers never see a half-written file.
pub fn write_json_atomic(path: &Path, value: &Value) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    buf.push(b'\n');

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(&buf)?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .wrap_err_with(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Flatten nested objects/arrays into `a.b.0` style keys, in document order.
pub fn flatten(value: &Value) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    flatten_into(value, "", &mut out);
    out
}

fn flatten_into(value: &Value, prefix: &str, out: &mut Vec<(String, Value)>) {
    let join = |k: &str| {
        if prefix.is_empty() {
            k.to_string()
        } else {
            format!("{prefix}.{k}")
        }
    };
    match value {
        Value::Object(m) if !m.is_empty() => {
            for (k, v) in m {
                flatten_into(v, &join(k), out);
            }
        }
        Value::Array(a) if !a.is_empty() => {
            for (i, v) in a.iter().enumerate() {
                flatten_into(v, &join(&i.to_string()), out);
            }
        }
        other if !prefix.is_empty() => out.push((prefix.to_string(), other.clone())),
        _ => {}
    }
}

/// Inverse of [`flatten`]. Objects whose keys are exactly `0..n` become arrays.
pub fn unflatten(flat: Map<String, Value>) -> Value {
    let mut root = Value::Object(Map::new());
    for (path, value) in flat {
        let mut node = &mut root;
        let mut segments = path.split('.').peekable();
        while let Some(seg) = segments.next() {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            let Value::Object(map) = node else {
                unreachable!("node was just made an object")
            };
            if segments.peek().is_none() {
                map.insert(seg.to_string(), value);
                break;
            }
            node = map
                .entry(seg.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
    }
    restore_arrays(root)
}

fn restore_arrays(value: Value) -> Value {
    match value {
        Value::Object(m) => {
            let is_sequence = !m.is_empty()
                && (0..m.len()).all(|i| m.contains_key(&i.to_string()));
            if is_sequence {
                let mut m = m;
                let items = (0..m.len())
                    .filter_map(|i| m.remove(&i.to_string()))
                    .map(restore_arrays)
                    .collect();
                Value::Array(items)
            } else {
                Value::Object(m.into_iter().map(|(k, v)| (k, restore_arrays(v))).collect())
            }
        }
        other => other,
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
