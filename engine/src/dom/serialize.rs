// HTML serialization for the arena DOM.
//
// The synthetic `document` root is never emitted; its children are. The
// doctype is written back only when the parsed page had one.

use super::{Dom, NodeId, NodeType};
use crate::parser::html::tokenizer::{RAW_TEXT_ELEMENTS, VOID_ELEMENTS};

/// Serialize the whole document back to HTML.
pub fn serialize(dom: &Dom) -> String {
    let mut out = String::new();
    if dom.nodes.is_empty() {
        return out;
    }
    if let Some(doctype) = &dom.doctype {
        out.push_str("<!DOCTYPE");
        if !doctype.is_empty() {
            out.push(' ');
            out.push_str(doctype);
        }
        out.push('>');
    }
    for &child in &dom.nodes[dom.root()].children {
        write_node(dom, child, false, &mut out);
    }
    out
}

/// Serialize a single node and its subtree.
pub fn serialize_node(dom: &Dom, id: NodeId) -> String {
    let mut out = String::new();
    if id < dom.nodes.len() {
        write_node(dom, id, false, &mut out);
    }
    out
}

fn write_node(dom: &Dom, id: NodeId, raw_text: bool, out: &mut String) {
    let node = &dom.nodes[id];
    match &node.node_type {
        NodeType::Text(text) => {
            if raw_text {
                out.push_str(text);
            } else {
                escape_into(text, false, out);
            }
        }
        NodeType::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeType::Element(el) => {
            let tag = el.tag_name.to_ascii_lowercase();
            out.push('<');
            out.push_str(&tag);
            for (name, value) in &el.attributes {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_into(value, true, out);
                out.push('"');
            }
            out.push('>');

            if VOID_ELEMENTS.contains(&tag.as_str()) {
                return;
            }

            let children_raw = RAW_TEXT_ELEMENTS.contains(&tag.as_str());
            for &child in &node.children {
                write_node(dom, child, children_raw, out);
            }

            out.push_str("</");
            out.push_str(&tag);
            out.push('>');
        }
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_attribute_values_and_text() {
        let mut dom = Dom::with_document();
        let p = dom.create_element("p", vec![("title".into(), "a \"b\" & c".into())], Some(0));
        dom.create_text("1 < 2 & 3", Some(p));
        assert_eq!(
            serialize(&dom),
            "<p title=\"a &quot;b&quot; &amp; c\">1 &lt; 2 &amp; 3</p>"
        );
    }

    #[test]
    fn writes_doctype_and_comments_back() {
        let mut dom = Dom::with_document();
        dom.doctype = Some("html".into());
        dom.create_comment(" built 2024 ", Some(0));
        let p = dom.create_element("p", vec![], Some(0));
        dom.create_comment("#include virtual=\"x\"", Some(p));
        assert_eq!(serialize(&dom), "<!DOCTYPE html><!-- built 2024 --><p><!--#include virtual=\"x\"--></p>");
    }

    #[test]
    fn void_and_raw_text_elements() {
        let mut dom = Dom::with_document();
        let div = dom.create_element("div", vec![], Some(0));
        dom.create_element("img", vec![("src".into(), "/img/10/a.png".into())], Some(div));
        let style = dom.create_element("style", vec![], Some(div));
        dom.create_text("a > b { width: 1px }", Some(style));
        assert_eq!(
            serialize_node(&dom, div),
            "<div><img src=\"/img/10/a.png\"><style>a > b { width: 1px }</style></div>"
        );
    }
}
