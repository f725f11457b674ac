//! Markup serialization for any readable tree, with consistent escaping
use crate::parser::{RAW_TEXT_ELEMENTS, VOID_ELEMENTS};
use crate::tree::TreeRead;
use crate::types::NodeKind;

/// Attribute value escaping
fn escape_attribute(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Markup of the children of `node`. Runtime control state (typed values,
/// checkedness, selection) is not part of markup and is not written.
pub fn inner_html<T: TreeRead + ?Sized>(tree: &T, node: T::Handle) -> String {
    let mut out = String::new();
    let raw = tree.tag(node).is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(tag));
    for child in tree.children(node) {
        write_node(tree, child, raw, &mut out);
    }
    out
}

pub fn outer_html<T: TreeRead + ?Sized>(tree: &T, node: T::Handle) -> String {
    let mut out = String::new();
    write_node(tree, node, false, &mut out);
    out
}

fn write_node<T: TreeRead + ?Sized>(tree: &T, node: T::Handle, raw_parent: bool, out: &mut String) {
    match tree.kind(node) {
        NodeKind::Text => {
            let text = tree.text(node).unwrap_or_default();
            if raw_parent {
                out.push_str(text);
            } else {
                out.push_str(&escape_text(text));
            }
        }
        NodeKind::Element => {
            let tag = tree.tag(node).unwrap_or_default();
            out.push('<');
            out.push_str(tag);
            for (name, value) in tree.attributes(node) {
                out.push(' ');
                out.push_str(&name);
                out.push_str("=\"");
                out.push_str(&escape_attribute(&value));
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(tag) {
                return;
            }
            let raw = RAW_TEXT_ELEMENTS.contains(tag);
            for child in tree.children(node) {
                write_node(tree, child, raw, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}
