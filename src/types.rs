//! Node classification and the small value types shared by every stage
use crate::tree::TreeRead;
use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Element,
    Text,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Element => f.write_str("element"),
            NodeKind::Text => f.write_str("text"),
        }
    }
}

/// Which piece of runtime control state a node carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFacet {
    /// `<input>` whose value the user edits.
    TextEntry,
    Checkbox,
    Radio,
    /// button, file, image, reset and submit inputs: value is never copied.
    NonValueControl,
    TextArea,
    Option,
}

impl ControlFacet {
    pub fn carries_value(self) -> bool {
        matches!(self, ControlFacet::TextEntry | ControlFacet::TextArea)
    }

    pub fn carries_checked(self) -> bool {
        matches!(self, ControlFacet::Checkbox | ControlFacet::Radio)
    }
}

// Every input type token a browser reflects; anything else falls back to "text".
static INPUT_TYPES: phf::Map<&'static str, ControlFacet> = phf_map! {
    "text" => ControlFacet::TextEntry,
    "search" => ControlFacet::TextEntry,
    "url" => ControlFacet::TextEntry,
    "tel" => ControlFacet::TextEntry,
    "email" => ControlFacet::TextEntry,
    "password" => ControlFacet::TextEntry,
    "date" => ControlFacet::TextEntry,
    "month" => ControlFacet::TextEntry,
    "week" => ControlFacet::TextEntry,
    "time" => ControlFacet::TextEntry,
    "datetime-local" => ControlFacet::TextEntry,
    "number" => ControlFacet::TextEntry,
    "range" => ControlFacet::TextEntry,
    "color" => ControlFacet::TextEntry,
    "hidden" => ControlFacet::TextEntry,
    "checkbox" => ControlFacet::Checkbox,
    "radio" => ControlFacet::Radio,
    "button" => ControlFacet::NonValueControl,
    "file" => ControlFacet::NonValueControl,
    "image" => ControlFacet::NonValueControl,
    "reset" => ControlFacet::NonValueControl,
    "submit" => ControlFacet::NonValueControl,
};

/// Input types that expose a text selection range.
static SELECTABLE_INPUT_TYPES: phf::Set<&'static str> = phf::phf_set! {
    "text", "search", "url", "tel", "password",
};

/// Normalises an `<input type>` attribute into the token the control reports.
/// Matching is ASCII case-insensitive; surrounding whitespace is not stripped.
pub fn input_type(raw: Option<&str>) -> (&'static str, ControlFacet) {
    let lowered = raw.map(str::to_ascii_lowercase);
    match lowered.as_deref().and_then(|t| INPUT_TYPES.get_entry(t)) {
        Some((name, facet)) => (*name, *facet),
        None => ("text", ControlFacet::TextEntry),
    }
}

pub fn input_type_supports_selection(token: &str) -> bool {
    SELECTABLE_INPUT_TYPES.contains(token)
}

/// The result of classifying one node; policy branches switch on this instead of
/// re-querying the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeClass {
    Text {
        value: String,
    },
    Element {
        tag: String,
        /// Normalised type token, only for `<input>`.
        input_type: Option<&'static str>,
        control: Option<ControlFacet>,
    },
}

impl NodeClass {
    pub fn control(&self) -> Option<ControlFacet> {
        match self {
            NodeClass::Element { control, .. } => *control,
            NodeClass::Text { .. } => None,
        }
    }
}

pub fn classify<T: TreeRead + ?Sized>(tree: &T, node: T::Handle) -> NodeClass {
    match tree.kind(node) {
        NodeKind::Text => NodeClass::Text {
            value: tree.text(node).unwrap_or_default().to_string(),
        },
        NodeKind::Element => {
            let tag = tree.tag(node).unwrap_or_default().to_string();
            let (input_type, control) = match tag.as_str() {
                "input" => {
                    let (token, facet) = input_type(tree.attribute(node, "type"));
                    (Some(token), Some(facet))
                }
                "textarea" => (None, Some(ControlFacet::TextArea)),
                "option" => (None, Some(ControlFacet::Option)),
                _ => (None, None),
            };
            NodeClass::Element {
                tag,
                input_type,
                control,
            }
        }
    }
}

/// A text selection as char offsets, normalised so `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelectionRange {
    pub start: usize,
    pub end: usize,
}

impl SelectionRange {
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn collapsed(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn clamp(self, len: usize) -> Self {
        Self::new(self.start.min(len), self.end.min(len))
    }
}

/// Counts of the effective mutations one reconciliation call performed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MorphStats {
    pub replaced: usize,
    pub inserted: usize,
    pub moved: usize,
    pub removed: usize,
    pub attributes_set: usize,
    pub attributes_removed: usize,
    pub values_assigned: usize,
    pub selections_restored: usize,
}

impl MorphStats {
    /// No structural, attribute or control-state change happened.
    pub fn is_noop(&self) -> bool {
        *self == MorphStats::default()
    }
}
