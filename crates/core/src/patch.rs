//! Structural diff and patch primitives for project documents.
//!
//! [`diff`] takes two immutable `serde_json::Value` snapshots of the same
//! document and computes a minimal ordered list of path-qualified operations
//! together with its exact inverse. [`apply_patches`] replays such a list
//! against a document value. Both functions are pure, deterministic, and
//! independent of any particular document schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Path segments
// ---------------------------------------------------------------------------

/// One step in a structural path: an object key or an array index.
///
/// Serializes untagged, so a path renders as a plain JSON array like
/// `["screens", 0, "image", "src"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segment {
    Index(usize),
    Key(String),
}

impl Segment {
    /// The object key, if this segment is one.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Segment::Key(k) => Some(k),
            Segment::Index(_) => None,
        }
    }

    /// The array index, if this segment is one.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Segment::Index(i) => Some(*i),
            Segment::Key(_) => None,
        }
    }
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Segment::Key(key.to_string())
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Segment::Index(index)
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::Key(k) => f.write_str(k),
            Segment::Index(i) => write!(f, "{i}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Patches
// ---------------------------------------------------------------------------

/// The kind of structural edit a [`Patch`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchOp {
    Add,
    Replace,
    Remove,
}

/// A single structural edit: an operation at a path, plus the value to
/// write for `Add` and `Replace`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub op: PatchOp,
    pub path: Vec<Segment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Patch {
    fn add(path: Vec<Segment>, value: Value) -> Self {
        Self {
            op: PatchOp::Add,
            path,
            value: Some(value),
        }
    }

    fn replace(path: Vec<Segment>, value: Value) -> Self {
        Self {
            op: PatchOp::Replace,
            path,
            value: Some(value),
        }
    }

    fn remove(path: Vec<Segment>) -> Self {
        Self {
            op: PatchOp::Remove,
            path,
            value: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

/// Compute the minimal ordered patch list turning `old` into `new`, plus
/// the exact inverse list turning the result back into `old`.
///
/// Equal subtrees are skipped entirely, so untouched parts of the document
/// never appear in the output. The inverse list is ordered such that
/// `apply(apply(old, forward), inverse) == old` holds exactly.
pub fn diff(old: &Value, new: &Value) -> (Vec<Patch>, Vec<Patch>) {
    let mut forward = Vec::new();
    let mut inverse = Vec::new();
    let mut path = Vec::new();
    diff_at(&mut path, old, new, &mut forward, &mut inverse);
    // Per-op inverses were collected in forward order; undoing must replay
    // them back-to-front.
    inverse.reverse();
    (forward, inverse)
}

fn diff_at(
    path: &mut Vec<Segment>,
    old: &Value,
    new: &Value,
    forward: &mut Vec<Patch>,
    inverse: &mut Vec<Patch>,
) {
    if old == new {
        return;
    }
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            for (key, old_value) in old_map {
                match new_map.get(key) {
                    Some(new_value) => {
                        path.push(Segment::Key(key.clone()));
                        diff_at(path, old_value, new_value, forward, inverse);
                        path.pop();
                    }
                    None => {
                        let at = child(path, Segment::Key(key.clone()));
                        forward.push(Patch::remove(at.clone()));
                        inverse.push(Patch::add(at, old_value.clone()));
                    }
                }
            }
            for (key, new_value) in new_map {
                if !old_map.contains_key(key) {
                    let at = child(path, Segment::Key(key.clone()));
                    forward.push(Patch::add(at.clone(), new_value.clone()));
                    inverse.push(Patch::remove(at));
                }
            }
        }
        (Value::Array(old_items), Value::Array(new_items)) => {
            let shared = old_items.len().min(new_items.len());
            for index in 0..shared {
                path.push(Segment::Index(index));
                diff_at(path, &old_items[index], &new_items[index], forward, inverse);
                path.pop();
            }
            // Appended tail: insert in ascending order.
            for (index, item) in new_items.iter().enumerate().skip(shared) {
                let at = child(path, Segment::Index(index));
                forward.push(Patch::add(at.clone(), item.clone()));
                inverse.push(Patch::remove(at));
            }
            // Truncated tail: remove in descending order so earlier
            // removals never shift the indices of later ones.
            for index in (shared..old_items.len()).rev() {
                let at = child(path, Segment::Index(index));
                forward.push(Patch::remove(at.clone()));
                inverse.push(Patch::add(at, old_items[index].clone()));
            }
        }
        _ => {
            forward.push(Patch::replace(path.clone(), new.clone()));
            inverse.push(Patch::replace(path.clone(), old.clone()));
        }
    }
}

fn child(path: &[Segment], segment: Segment) -> Vec<Segment> {
    let mut at = path.to_vec();
    at.push(segment);
    at
}

// ---------------------------------------------------------------------------
// Apply
// ---------------------------------------------------------------------------

/// Apply `patches` to `value` in order.
///
/// # Panics
///
/// Panics if a patch path does not resolve against the current shape of
/// `value`. Patch lists produced by [`diff`] always resolve against the
/// value they were diffed from; anything else is a programming error, not
/// a recoverable condition.
pub fn apply_patches(value: &mut Value, patches: &[Patch]) {
    for patch in patches {
        apply_one(value, patch);
    }
}

fn apply_one(value: &mut Value, patch: &Patch) {
    let Some((last, parents)) = patch.path.split_last() else {
        match patch.op {
            PatchOp::Add | PatchOp::Replace => {
                *value = expect_value(patch);
            }
            PatchOp::Remove => panic!("cannot remove the document root"),
        }
        return;
    };

    let parent = resolve_mut(value, parents);
    match patch.op {
        PatchOp::Add => match (last, &mut *parent) {
            (Segment::Key(key), Value::Object(map)) => {
                map.insert(key.clone(), expect_value(patch));
            }
            (Segment::Index(index), Value::Array(items)) => {
                assert!(
                    *index <= items.len(),
                    "add index {index} out of bounds (len {})",
                    items.len()
                );
                items.insert(*index, expect_value(patch));
            }
            (segment, _) => panic!("add segment {segment} does not match parent shape"),
        },
        PatchOp::Replace => match (last, &mut *parent) {
            (Segment::Key(key), Value::Object(map)) => {
                let slot = map
                    .get_mut(key)
                    .unwrap_or_else(|| panic!("replace target key `{key}` is missing"));
                *slot = expect_value(patch);
            }
            (Segment::Index(index), Value::Array(items)) => {
                let len = items.len();
                let slot = items
                    .get_mut(*index)
                    .unwrap_or_else(|| panic!("replace index {index} out of bounds (len {len})"));
                *slot = expect_value(patch);
            }
            (segment, _) => panic!("replace segment {segment} does not match parent shape"),
        },
        PatchOp::Remove => match (last, &mut *parent) {
            (Segment::Key(key), Value::Object(map)) => {
                map.remove(key)
                    .unwrap_or_else(|| panic!("remove target key `{key}` is missing"));
            }
            (Segment::Index(index), Value::Array(items)) => {
                assert!(
                    *index < items.len(),
                    "remove index {index} out of bounds (len {})",
                    items.len()
                );
                items.remove(*index);
            }
            (segment, _) => panic!("remove segment {segment} does not match parent shape"),
        },
    }
}

fn resolve_mut<'a>(value: &'a mut Value, path: &[Segment]) -> &'a mut Value {
    let mut current = value;
    for segment in path {
        current = match segment {
            Segment::Key(key) => match current {
                Value::Object(map) => map
                    .get_mut(key)
                    .unwrap_or_else(|| panic!("patch path references missing key `{key}`")),
                _ => panic!("patch path expects an object at `{key}`"),
            },
            Segment::Index(index) => match current {
                Value::Array(items) => {
                    let len = items.len();
                    items.get_mut(*index).unwrap_or_else(|| {
                        panic!("patch path index {index} out of bounds (len {len})")
                    })
                }
                _ => panic!("patch path expects an array at index {index}"),
            },
        };
    }
    current
}

fn expect_value(patch: &Patch) -> Value {
    patch
        .value
        .clone()
        .unwrap_or_else(|| panic!("{:?} patch requires a value", patch.op))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
