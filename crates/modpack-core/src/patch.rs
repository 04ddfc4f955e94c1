//! Hook-produced values patches
//!
//! A patch is an ordered sequence of operations, each either a deep **merge**
//! of a subtree or one of the RFC 6902 operations `add`, `remove`, `replace`
//! addressed by an RFC 6901 JSON pointer. On the wire a patch is one JSON
//! document per line. Application is all-or-nothing: a failing operation
//! leaves the target untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::values::{deep_merge, Values};

/// A single patch operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Add { path: String, value: JsonValue },
    Remove { path: String },
    Replace { path: String, value: JsonValue },
    Merge { value: JsonValue },
}

/// An ordered sequence of patch operations applied atomically
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValuesPatch(pub Vec<PatchOp>);

impl ValuesPatch {
    /// Parse a patch from its wire format: one JSON document per line,
    /// blank lines skipped.
    pub fn from_lines(input: &str) -> Result<Self> {
        let mut ops = Vec::new();
        for line in input.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let op: PatchOp = serde_json::from_str(line).map_err(|e| CoreError::InvalidPatch {
                message: format!("bad patch line '{}': {}", line, e),
            })?;
            ops.push(op);
        }
        Ok(Self(ops))
    }

    /// Read a patch file. An absent or empty file is an empty patch.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_lines(&content)
    }

    /// Render the patch back to its wire format
    pub fn to_lines(&self) -> Result<String> {
        let mut out = String::new();
        for op in &self.0 {
            out.push_str(&serde_json::to_string(op)?);
            out.push('\n');
        }
        Ok(out)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Apply all operations in order against a copy of `base`.
    ///
    /// Any failing operation aborts the whole patch; the input is never
    /// partially modified.
    pub fn apply(&self, base: &Values) -> Result<Values> {
        let mut work = base.clone();
        for op in &self.0 {
            apply_op(&mut work.0, op)?;
        }
        Ok(work)
    }
}

fn apply_op(target: &mut JsonValue, op: &PatchOp) -> Result<()> {
    match op {
        PatchOp::Add { path, value } => add(target, path, value),
        PatchOp::Remove { path } => remove(target, path),
        PatchOp::Replace { path, value } => replace(target, path, value),
        PatchOp::Merge { value } => {
            if value.is_null() {
                return Ok(());
            }
            if !value.is_object() {
                return Err(CoreError::InvalidPatch {
                    message: "merge value must be an object".to_string(),
                });
            }
            deep_merge(target, value);
            Ok(())
        }
    }
}

/// Split an RFC 6901 pointer into unescaped tokens
fn pointer_tokens(path: &str) -> Result<Vec<String>> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    let rest = path.strip_prefix('/').ok_or_else(|| CoreError::InvalidPatch {
        message: format!("pointer '{}' must start with '/'", path),
    })?;
    Ok(rest
        .split('/')
        .map(|token| token.replace("~1", "/").replace("~0", "~"))
        .collect())
}

fn bad_pointer(path: &str, reason: &str) -> CoreError {
    CoreError::InvalidPatch {
        message: format!("pointer '{}': {}", path, reason),
    }
}

/// Walk to the parent of the addressed node, returning it with the final token
fn resolve_parent<'a>(
    target: &'a mut JsonValue,
    path: &str,
) -> Result<(&'a mut JsonValue, String)> {
    let mut tokens = pointer_tokens(path)?;
    let last = tokens
        .pop()
        .ok_or_else(|| bad_pointer(path, "whole-document operations are not supported"))?;

    let mut node = target;
    for token in &tokens {
        node = match node {
            JsonValue::Object(map) => map
                .get_mut(token)
                .ok_or_else(|| bad_pointer(path, &format!("missing key '{}'", token)))?,
            JsonValue::Array(items) => {
                let index: usize = token
                    .parse()
                    .map_err(|_| bad_pointer(path, &format!("bad array index '{}'", token)))?;
                items
                    .get_mut(index)
                    .ok_or_else(|| bad_pointer(path, &format!("index {} out of range", index)))?
            }
            _ => return Err(bad_pointer(path, "path traverses a scalar")),
        };
    }
    Ok((node, last))
}

fn add(target: &mut JsonValue, path: &str, value: &JsonValue) -> Result<()> {
    let (parent, key) = resolve_parent(target, path)?;
    match parent {
        JsonValue::Object(map) => {
            map.insert(key, value.clone());
            Ok(())
        }
        JsonValue::Array(items) => {
            if key == "-" {
                items.push(value.clone());
                return Ok(());
            }
            let index: usize = key
                .parse()
                .map_err(|_| bad_pointer(path, &format!("bad array index '{}'", key)))?;
            if index > items.len() {
                return Err(bad_pointer(path, &format!("index {} out of range", index)));
            }
            items.insert(index, value.clone());
            Ok(())
        }
        _ => Err(bad_pointer(path, "parent is not a container")),
    }
}

fn remove(target: &mut JsonValue, path: &str) -> Result<()> {
    let (parent, key) = resolve_parent(target, path)?;
    match parent {
        JsonValue::Object(map) => {
            map.remove(&key)
                .ok_or_else(|| bad_pointer(path, &format!("missing key '{}'", key)))?;
            Ok(())
        }
        JsonValue::Array(items) => {
            let index: usize = key
                .parse()
                .map_err(|_| bad_pointer(path, &format!("bad array index '{}'", key)))?;
            if index >= items.len() {
                return Err(bad_pointer(path, &format!("index {} out of range", index)));
            }
            items.remove(index);
            Ok(())
        }
        _ => Err(bad_pointer(path, "parent is not a container")),
    }
}

fn replace(target: &mut JsonValue, path: &str, value: &JsonValue) -> Result<()> {
    let (parent, key) = resolve_parent(target, path)?;
    match parent {
        JsonValue::Object(map) => match map.get_mut(&key) {
            Some(slot) => {
                *slot = value.clone();
                Ok(())
            }
            None => Err(bad_pointer(path, &format!("missing key '{}'", key))),
        },
        JsonValue::Array(items) => {
            let index: usize = key
                .parse()
                .map_err(|_| bad_pointer(path, &format!("bad array index '{}'", key)))?;
            match items.get_mut(index) {
                Some(slot) => {
                    *slot = value.clone();
                    Ok(())
                }
                None => Err(bad_pointer(path, &format!("index {} out of range", index))),
            }
        }
        _ => Err(bad_pointer(path, "parent is not a container")),
    }
}
