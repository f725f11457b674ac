//! Lenient markup fragment parser producing a candidate `Document`.
//!
//! Not an HTML5 tree builder: there is no implied-end-tag or foster-parenting
//! logic. Recognised structure:
//! - start/end tags with lowercase names, quoted, unquoted and valueless attributes
//!   (the first of duplicate attributes wins);
//! - void elements and `/>` self-closing tags;
//! - raw-text content for `script`/`style` and escapable raw text for
//!   `textarea`/`title`;
//! - comments, doctypes and processing instructions are skipped;
//! - end tags without a matching open element are ignored, open elements are
//!   closed at end of input.
use crate::document::{Document, NodeId};
use crate::tree::{TreeMut, TreeRead};
use log::warn;
use phf::phf_set;

/// Turns markup into a candidate tree. The returned handle is a container whose
/// children are the fragment's top-level nodes.
pub trait FragmentParser {
    type Tree: TreeRead;

    fn parse_fragment(&self, markup: &str) -> (Self::Tree, <Self::Tree as TreeRead>::Handle);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl FragmentParser for HtmlParser {
    type Tree = Document;

    fn parse_fragment(&self, markup: &str) -> (Document, NodeId) {
        let document = parse_fragment(markup);
        let root = document.root();
        (document, root)
    }
}

pub(crate) static VOID_ELEMENTS: phf::Set<&'static str> = phf_set! {
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "param", "source", "track", "wbr",
};

pub(crate) static RAW_TEXT_ELEMENTS: phf::Set<&'static str> = phf_set! {
    "script", "style",
};

static ESCAPABLE_RAW_TEXT_ELEMENTS: phf::Set<&'static str> = phf_set! {
    "textarea", "title",
};

pub fn parse_fragment(markup: &str) -> Document {
    let mut builder = Builder::new();
    let bytes = markup.as_bytes();
    let mut i = 0;
    // Slices are only cut at ASCII structural bytes, which are always UTF-8
    // char boundaries.
    while i < bytes.len() {
        if bytes[i] != b'<' {
            let start = i;
            while i < bytes.len() && bytes[i] != b'<' {
                i += 1;
            }
            builder.text.push_str(&decode_entities(&markup[start..i]));
            continue;
        }
        let rest = &markup[i..];
        if rest.starts_with("<!--") {
            i = match rest[4..].find("-->") {
                Some(end) => i + 4 + end + 3,
                None => bytes.len(),
            };
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            i = skip_past(bytes, i, b'>');
        } else if rest.starts_with("</") {
            let end = scan_name(bytes, i + 2);
            let name = markup[i + 2..end].to_ascii_lowercase();
            if name.is_empty() {
                builder.text.push_str("</");
                i += 2;
                continue;
            }
            builder.close(&name);
            i = skip_past(bytes, end, b'>');
        } else if bytes.get(i + 1).is_some_and(u8::is_ascii_alphabetic) {
            i = parse_start_tag(markup, i, &mut builder);
        } else {
            builder.text.push('<');
            i += 1;
        }
    }
    builder.finish()
}

struct Builder {
    document: Document,
    open: Vec<NodeId>,
    text: String,
}

impl Builder {
    fn new() -> Self {
        Builder {
            document: Document::default(),
            open: Vec::new(),
            text: String::new(),
        }
    }

    fn parent(&self) -> NodeId {
        self.open.last().copied().unwrap_or(self.document.root())
    }

    fn flush_text(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.text);
        let node = self.document.create_text(&text);
        self.attach(node);
    }

    fn attach(&mut self, node: NodeId) {
        let parent = self.parent();
        if let Err(e) = self.document.append_child(parent, node) {
            warn!("dropping parsed node {node}: {e}");
        }
    }

    fn open_element(&mut self, name: &str, attributes: Vec<(String, String)>) -> NodeId {
        self.flush_text();
        let node = self.document.create_element(name);
        for (key, value) in attributes {
            if !self.document.has_attribute(node, &key) {
                if let Err(e) = self.document.set_attribute(node, &key, &value) {
                    warn!("dropping attribute '{key}' on {node}: {e}");
                }
            }
        }
        self.attach(node);
        node
    }

    fn close(&mut self, name: &str) {
        self.flush_text();
        if let Some(pos) = self
            .open
            .iter()
            .rposition(|id| self.document.tag(*id) == Some(name))
        {
            self.open.truncate(pos);
        }
    }

    fn finish(mut self) -> Document {
        self.flush_text();
        self.document
    }
}

fn is_name_end(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'/' || b == b'>'
}

/// Index just past the tag name starting at `start`.
fn scan_name(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && !is_name_end(bytes[end]) {
        end += 1;
    }
    end
}

fn skip_past(bytes: &[u8], from: usize, target: u8) -> usize {
    match bytes[from.min(bytes.len())..].iter().position(|b| *b == target) {
        Some(offset) => from + offset + 1,
        None => bytes.len(),
    }
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Parses `<name attrs...>` starting at `start` (which points at `<`) and any
/// raw-text body that follows. Returns the index after everything consumed.
fn parse_start_tag(markup: &str, start: usize, builder: &mut Builder) -> usize {
    let bytes = markup.as_bytes();
    let name_end = scan_name(bytes, start + 1);
    let name = markup[start + 1..name_end].to_ascii_lowercase();

    let mut attributes = Vec::new();
    let mut self_closing = false;
    let mut i = name_end;
    loop {
        i = skip_whitespace(bytes, i);
        match bytes.get(i) {
            None => break,
            Some(b'>') => {
                i += 1;
                break;
            }
            Some(b'/') => {
                if bytes.get(i + 1) == Some(&b'>') {
                    self_closing = true;
                    i += 2;
                    break;
                }
                i += 1;
                continue;
            }
            Some(_) => {}
        }

        let attr_start = i;
        while i < bytes.len() && !is_name_end(bytes[i]) && bytes[i] != b'=' {
            i += 1;
        }
        let attr_name = markup[attr_start..i].to_ascii_lowercase();
        i = skip_whitespace(bytes, i);
        let mut value = String::new();
        if bytes.get(i) == Some(&b'=') {
            i = skip_whitespace(bytes, i + 1);
            match bytes.get(i) {
                Some(&quote) if quote == b'"' || quote == b'\'' => {
                    let value_start = i + 1;
                    let value_end = bytes[value_start..]
                        .iter()
                        .position(|b| *b == quote)
                        .map(|offset| value_start + offset)
                        .unwrap_or(bytes.len());
                    value = decode_entities(&markup[value_start..value_end]);
                    i = (value_end + 1).min(bytes.len());
                }
                _ => {
                    let value_start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    value = decode_entities(&markup[value_start..i]);
                }
            }
        }
        if !attr_name.is_empty() {
            attributes.push((attr_name, value));
        }
    }

    let node = builder.open_element(&name, attributes);
    if self_closing || VOID_ELEMENTS.contains(name.as_str()) {
        return i;
    }

    let raw = RAW_TEXT_ELEMENTS.contains(name.as_str());
    if raw || ESCAPABLE_RAW_TEXT_ELEMENTS.contains(name.as_str()) {
        let (body_end, after) = find_close_tag(markup, i, &name);
        let mut body = &markup[i.min(body_end)..body_end];
        if name == "textarea" {
            body = body.strip_prefix('\n').unwrap_or(body);
        }
        if !body.is_empty() {
            let text = if raw {
                body.to_string()
            } else {
                decode_entities(body)
            };
            let child = builder.document.create_text(&text);
            if let Err(e) = builder.document.append_child(node, child) {
                warn!("dropping <{name}> body: {e}");
            }
        }
        return after;
    }

    builder.open.push(node);
    i
}

/// Finds `</name` (ASCII case-insensitive) at or after `from`. Returns the body end
/// and the index just past the closing `>`.
fn find_close_tag(markup: &str, from: usize, name: &str) -> (usize, usize) {
    let bytes = markup.as_bytes();
    let needle_len = name.len() + 2;
    let mut i = from;
    while i + needle_len <= bytes.len() {
        if bytes[i] == b'<'
            && bytes[i + 1] == b'/'
            && bytes[i + 2..i + needle_len].eq_ignore_ascii_case(name.as_bytes())
            && bytes.get(i + needle_len).is_none_or(|b| is_name_end(*b))
        {
            return (i, skip_past(bytes, i + needle_len, b'>'));
        }
        i += 1;
    }
    (bytes.len(), bytes.len())
}

/// Decodes the named entities `amp lt gt quot apos nbsp` and numeric references.
/// Anything unrecognised is kept verbatim.
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest[1..]
            .find(';')
            .filter(|semi| *semi <= 10)
            .and_then(|semi| decode_reference(&rest[1..1 + semi]).map(|ch| (ch, semi + 2)));
        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::NodeSnapshot;
    use indexmap::IndexMap;

    fn top(doc: &Document) -> Vec<NodeId> {
        doc.children(doc.root())
    }

    #[test]
    fn parses_nested_elements_and_text() {
        let doc = parse_fragment("<div id=a><span>hi</span> there</div>");
        let div = top(&doc)[0];
        assert_eq!(doc.tag(div), Some("div"));
        assert_eq!(doc.attribute(div, "id"), Some("a"));
        let children = doc.children(div);
        assert_eq!(children.len(), 2);
        assert_eq!(doc.text_content(children[0]), "hi");
        assert_eq!(doc.text(children[1]), Some(" there"));
    }

    #[test]
    fn attribute_forms() {
        let doc = parse_fragment(r#"<input TYPE="checkbox" checked value='a b' data-x=1 data-x=2>"#);
        let input = top(&doc)[0];
        assert_eq!(
            doc.attributes(input),
            vec![
                ("type".to_string(), "checkbox".to_string()),
                ("checked".to_string(), String::new()),
                ("value".to_string(), "a b".to_string()),
                ("data-x".to_string(), "1".to_string()),
            ]
        );
        assert!(doc.checked(input));
    }

    #[test]
    fn void_and_self_closing_elements_do_not_nest() {
        let doc = parse_fragment("<br><img src=x.png/><span/>after");
        let tags: Vec<_> = top(&doc).iter().map(|n| doc.tag(*n).map(str::to_string)).collect();
        assert_eq!(
            tags,
            vec![
                Some("br".to_string()),
                Some("img".to_string()),
                Some("span".to_string()),
                None
            ]
        );
    }

    #[test]
    fn textarea_and_script_bodies_are_raw() {
        let doc = parse_fragment("<textarea>\n<b>&amp;</b></textarea><script>if (a < b) {}</script>");
        let nodes = top(&doc);
        assert_eq!(doc.value(nodes[0]).as_deref(), Some("<b>&</b>"));
        assert_eq!(doc.text_content(nodes[1]), "if (a < b) {}");
    }

    #[test]
    fn comments_and_doctype_are_skipped() {
        let doc = parse_fragment("<!doctype html><!-- note --><p>x</p><!-- unterminated");
        assert_eq!(top(&doc).len(), 1);
    }

    #[test]
    fn stray_end_tags_and_unclosed_elements() {
        let doc = parse_fragment("</em><ul><li>one<li>two</ul>tail");
        let nodes = top(&doc);
        assert_eq!(nodes.len(), 2);
        assert_eq!(doc.text(nodes[1]), Some("tail"));
        // No implied end tags: the second <li> nests inside the first.
        let first = doc.children(nodes[0])[0];
        assert_eq!(doc.children(first).len(), 2);
    }

    #[test]
    fn literal_angle_brackets_stay_text() {
        let doc = parse_fragment("a < b and 1<2");
        assert_eq!(
            doc.snapshot(doc.root()),
            Some(NodeSnapshot::Element {
                tag: "div".into(),
                attributes: IndexMap::new(),
                children: vec![NodeSnapshot::Text {
                    text: "a < b and 1<2".into()
                }],
            })
        );
    }

    #[test]
    fn entity_decoding() {
        assert_eq!(decode_entities("&lt;a&gt; &amp;&amp; &quot;q&quot;"), "<a> && \"q\"");
        assert_eq!(decode_entities("&#65;&#x42;&#X43;"), "ABC");
        assert_eq!(decode_entities("&unknown; & &amp"), "&unknown; & &amp");
        assert_eq!(decode_entities("caf&eacute; ünï"), "caf&eacute; ünï");
    }

    #[test]
    fn every_parsed_node_is_attached() {
        let mut doc = parse_fragment("<div a=1 a=2><textarea>x</textarea><script>y</script>z</div>");
        let before = doc.node_count();
        doc.release_detached();
        // root, div, textarea, its text, script, its text, trailing text
        assert_eq!(before, 7);
        assert_eq!(doc.node_count(), before);
    }

    #[test]
    fn parser_trait_returns_container_root() {
        let (doc, root) = HtmlParser.parse_fragment("<p>x</p>");
        assert_eq!(root, doc.root());
        assert_eq!(doc.children(root).len(), 1);
    }
}
