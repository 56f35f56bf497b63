//! Edit-label classification for history entries.
//!
//! When a commit is recorded with the generic default label, the history
//! store derives a human-readable one by inspecting the union of structural
//! paths touched by the commit's patches. Classification is an ordered
//! table of `(predicate, label)` rules evaluated top to bottom; the first
//! match wins and [`DEFAULT_LABEL`] is kept when nothing matches.

use crate::patch::{Patch, PatchOp, Segment};

/// The generic fallback label. A caller-supplied label equal to this one is
/// treated as "no label given" and triggers classification.
pub const DEFAULT_LABEL: &str = "Edit project";

/// One classification rule: a predicate over the commit's patch set and
/// the label it yields.
pub struct LabelRule {
    pub label: &'static str,
    pub matches: fn(&[Patch]) -> bool,
}

/// The fixed, ordered rule table. Earlier rules shadow later ones.
pub static RULES: &[LabelRule] = &[
    LabelRule {
        label: "Edit text",
        matches: touches_text,
    },
    LabelRule {
        label: "Change background color",
        matches: touches_background_color,
    },
    LabelRule {
        label: "Add screen",
        matches: screens_only_added,
    },
    LabelRule {
        label: "Delete screen",
        matches: screens_only_removed,
    },
    LabelRule {
        label: "Reorder screens",
        matches: screens_rearranged,
    },
    LabelRule {
        label: "Replace media",
        matches: |patches| touches_image_field(patches, "src"),
    },
    LabelRule {
        label: "Change device frame",
        matches: |patches| touches_image_field(patches, "frame"),
    },
    LabelRule {
        label: "Pan media",
        matches: |patches| touches_image_field(patches, "pan"),
    },
    LabelRule {
        label: "Move frame",
        matches: |patches| touches_image_field(patches, "position"),
    },
    LabelRule {
        label: "Scale frame",
        matches: |patches| touches_image_field(patches, "scale"),
    },
    LabelRule {
        label: "Rotate frame",
        matches: |patches| touches_image_field(patches, "rotation"),
    },
    LabelRule {
        label: "Edit frame",
        matches: touches_image,
    },
];

/// Classify a commit's patch set against [`RULES`].
pub fn derive_label(patches: &[Patch]) -> &'static str {
    RULES
        .iter()
        .find(|rule| (rule.matches)(patches))
        .map(|rule| rule.label)
        .unwrap_or(DEFAULT_LABEL)
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

fn last_key(patch: &Patch) -> Option<&str> {
    patch.path.last().and_then(Segment::as_key)
}

fn touches_text(patches: &[Patch]) -> bool {
    patches.iter().any(|p| last_key(p) == Some("text"))
}

fn touches_background_color(patches: &[Patch]) -> bool {
    patches.iter().any(|p| {
        last_key(p) == Some("color")
            && p.path
                .iter()
                .any(|segment| segment.as_key() == Some("background"))
    })
}

/// Operations on direct children of the top-level `screens` collection,
/// i.e. whole screens being inserted, removed, or swapped.
fn screen_child_ops(patches: &[Patch]) -> impl Iterator<Item = &Patch> {
    patches.iter().filter(|p| {
        p.path.len() == 2
            && p.path[0].as_key() == Some("screens")
            && p.path[1].as_index().is_some()
    })
}

fn screens_only_added(patches: &[Patch]) -> bool {
    let mut any = false;
    for patch in screen_child_ops(patches) {
        if patch.op != PatchOp::Add {
            return false;
        }
        any = true;
    }
    any
}

fn screens_only_removed(patches: &[Patch]) -> bool {
    let mut any = false;
    for patch in screen_child_ops(patches) {
        if patch.op != PatchOp::Remove {
            return false;
        }
        any = true;
    }
    any
}

/// Mixed adds and removes, or element-level replaces. A positional diff
/// renders a pure reorder as replaces at the shifted indices, so both
/// shapes classify as a reorder.
fn screens_rearranged(patches: &[Patch]) -> bool {
    screen_child_ops(patches).next().is_some()
}

fn touches_image(patches: &[Patch]) -> bool {
    patches.iter().any(|p| {
        p.path
            .iter()
            .any(|segment| segment.as_key() == Some("image"))
    })
}

/// True if any patch touches `field` (or a path beneath it) directly under
/// an `image` object.
fn touches_image_field(patches: &[Patch], field: &str) -> bool {
    patches.iter().any(|p| {
        p.path.windows(2).any(|pair| {
            pair[0].as_key() == Some("image") && pair[1].as_key() == Some(field)
        })
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
