// Collection of author stylesheets embedded in the document.

use crate::dom::{Dom, NodeId, NodeType};

/// Text of every `<style>` element reachable from the root, in document order.
pub fn extract_stylesheets(dom: &Dom) -> Vec<String> {
    let mut sheets = Vec::new();
    if !dom.nodes.is_empty() {
        collect(dom, dom.root(), &mut sheets);
    }
    sheets
}

fn collect(dom: &Dom, node_id: NodeId, sheets: &mut Vec<String>) {
    let node = &dom.nodes[node_id];
    if let NodeType::Element(el) = &node.node_type {
        if el.is("style") && media_applies(el.get_attribute("media")) {
            let text: String = node
                .children
                .iter()
                .filter_map(|&c| match &dom.nodes[c].node_type {
                    NodeType::Text(t) => Some(t.as_str()),
                    _ => None,
                })
                .collect();
            sheets.push(text);
            return;
        }
    }
    for &child in &node.children {
        collect(dom, child, sheets);
    }
}

/// Print-only sheets never affect on-screen layout.
fn media_applies(media: Option<&str>) -> bool {
    match media {
        None => true,
        Some(m) => {
            let m = m.trim().to_ascii_lowercase();
            m.is_empty() || m.split(',').any(|q| {
                let q = q.trim();
                q.starts_with("all") || q.starts_with("screen")
            })
        }
    }
}
