// HTML tree builder following the WHATWG tree construction stage
// Reference: https://html.spec.whatwg.org/multipage/parsing.html#tree-construction
//
// IMPLEMENTATION STATUS:
// ✅ Initial mode
// ✅ BeforeHtml mode
// ✅ BeforeHead mode
// ⚠️ InHead mode - meta, link, base, title, style, script
// ⚠️ AfterHead mode - head content after </head> goes to body
// ⚠️ InBody mode - implied end tags for p/li/dd/dt, no formatting reconstruction
// ✅ Text mode (raw text elements)
// ✅ AfterBody mode
// ❌ Table modes, select modes, foreign content, framesets

use crate::dom::{Dom, NodeId, NodeType};
use super::tokenizer::{Token, Tokenizer, RAW_TEXT_ELEMENTS, RCDATA_ELEMENTS, VOID_ELEMENTS};

#[derive(Debug, Copy, Clone, PartialEq)]
enum InsertionMode {
    Initial,
    BeforeHtml,
    BeforeHead,
    InHead,
    AfterHead,
    InBody,
    Text,
    AfterBody,
}

/// Start tags that close an open `<p>`.
const CLOSES_P: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "div", "dl", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "main", "menu", "nav", "ol", "p", "pre", "section", "table", "ul",
];

const HEAD_ELEMENTS: &[&str] = &["meta", "link", "base", "title", "style", "script", "noscript"];

/// Elements an implied end tag search never crosses.
const SCOPE_BOUNDARY: &[&str] = &["document", "html", "body", "table", "td", "th", "button"];

enum Flow {
    Done,
    Reprocess(Token),
}

pub struct HtmlParser {
    tokenizer: Tokenizer,
    dom: Dom,
    stack: Vec<NodeId>,
    mode: InsertionMode,
    original_mode: InsertionMode,
    pending_text: String,
}

impl HtmlParser {
    pub fn new(input: &str) -> Self {
        Self {
            tokenizer: Tokenizer::new(input),
            dom: Dom::with_document(),
            stack: vec![0],
            mode: InsertionMode::Initial,
            original_mode: InsertionMode::InBody,
            pending_text: String::new(),
        }
    }

    pub fn parse(mut self) -> Dom {
        while let Some(token) = self.tokenizer.next_token() {
            let eof = token == Token::Eof;
            let mut token = token;
            loop {
                tracing::trace!(mode = ?self.mode, ?token, "tree construction");
                match self.process(token) {
                    Flow::Done => break,
                    Flow::Reprocess(t) => token = t,
                }
            }
            if eof {
                break;
            }
        }
        self.flush_text();
        self.dom
    }

    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(0)
    }

    fn current_tag(&self) -> Option<&str> {
        match &self.dom.nodes[self.current()].node_type {
            NodeType::Element(el) => Some(el.tag_name.as_str()),
            _ => None,
        }
    }

    fn tag_of(&self, id: NodeId) -> &str {
        match &self.dom.nodes[id].node_type {
            NodeType::Element(el) => el.tag_name.as_str(),
            _ => "",
        }
    }

    fn flush_text(&mut self) {
        if self.pending_text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.pending_text);
        let parent = self.current();
        // Merge with a directly preceding text node.
        if let Some(&last) = self.dom.nodes[parent].children.last() {
            if let NodeType::Text(existing) = &mut self.dom.nodes[last].node_type {
                existing.push_str(&text);
                return;
            }
        }
        self.dom.create_text(&text, Some(parent));
    }

    fn insert(&mut self, tag: &str, attributes: Vec<(String, String)>) -> NodeId {
        let parent = self.current();
        self.dom.create_element(tag, attributes, Some(parent))
    }

    fn insert_comment(&mut self, text: &str, parent: NodeId) -> Flow {
        self.dom.create_comment(text, Some(parent));
        Flow::Done
    }

    fn insert_and_push(&mut self, tag: &str, attributes: Vec<(String, String)>) -> NodeId {
        let id = self.insert(tag, attributes);
        self.stack.push(id);
        id
    }

    fn convert_attributes(attributes: Vec<super::tokenizer::Attribute>) -> Vec<(String, String)> {
        attributes.into_iter().map(|a| (a.name, a.value)).collect()
    }

    /// Pops up to and including the nearest open `tag`, unless a scope
    /// boundary (or `stop_at`) comes first. Returns whether it was closed.
    fn close_open(&mut self, tag: &str, stop_at: &[&str]) -> bool {
        let position = self.stack.iter().rposition(|&id| {
            let t = self.tag_of(id);
            t == tag || SCOPE_BOUNDARY.contains(&t) || stop_at.contains(&t)
        });
        match position {
            Some(pos) if self.tag_of(self.stack[pos]) == tag => {
                self.stack.truncate(pos);
                true
            }
            _ => false,
        }
    }

    fn is_whitespace(token: &Token) -> bool {
        matches!(token, Token::Character(c) if c.is_ascii_whitespace())
    }

    fn process(&mut self, token: Token) -> Flow {
        if !matches!(token, Token::Character(_)) {
            self.flush_text();
        }

        match self.mode {
            InsertionMode::Initial => match token {
                Token::Doctype { raw, .. } => {
                    self.dom.doctype = Some(raw);
                    self.mode = InsertionMode::BeforeHtml;
                    Flow::Done
                }
                Token::Comment(text) => self.insert_comment(&text, 0),
                t if Self::is_whitespace(&t) => Flow::Done,
                t => {
                    self.mode = InsertionMode::BeforeHtml;
                    Flow::Reprocess(t)
                }
            },

            InsertionMode::BeforeHtml => match token {
                Token::Doctype { .. } => Flow::Done,
                Token::Comment(text) => self.insert_comment(&text, 0),
                t if Self::is_whitespace(&t) => Flow::Done,
                Token::StartTag { name, attributes, .. } if name == "html" => {
                    self.insert_and_push("html", Self::convert_attributes(attributes));
                    self.mode = InsertionMode::BeforeHead;
                    Flow::Done
                }
                Token::EndTag { ref name }
                    if !matches!(name.as_str(), "head" | "body" | "html" | "br") =>
                {
                    Flow::Done
                }
                t => {
                    self.insert_and_push("html", vec![]);
                    self.mode = InsertionMode::BeforeHead;
                    Flow::Reprocess(t)
                }
            },

            InsertionMode::BeforeHead => match token {
                Token::Doctype { .. } => Flow::Done,
                Token::Comment(text) => {
                    let parent = self.current();
                    self.insert_comment(&text, parent)
                }
                t if Self::is_whitespace(&t) => Flow::Done,
                Token::StartTag { ref name, .. } if name == "html" => Flow::Done,
                Token::StartTag { name, attributes, .. } if name == "head" => {
                    self.insert_and_push("head", Self::convert_attributes(attributes));
                    self.mode = InsertionMode::InHead;
                    Flow::Done
                }
                Token::EndTag { ref name }
                    if !matches!(name.as_str(), "head" | "body" | "html" | "br") =>
                {
                    Flow::Done
                }
                t => {
                    self.insert_and_push("head", vec![]);
                    self.mode = InsertionMode::InHead;
                    Flow::Reprocess(t)
                }
            },

            InsertionMode::InHead => match token {
                Token::Doctype { .. } => Flow::Done,
                Token::Comment(text) => {
                    let parent = self.current();
                    self.insert_comment(&text, parent)
                }
                t if Self::is_whitespace(&t) => Flow::Done,
                Token::StartTag { name, attributes, self_closing }
                    if HEAD_ELEMENTS.contains(&name.as_str()) =>
                {
                    let attrs = Self::convert_attributes(attributes);
                    if VOID_ELEMENTS.contains(&name.as_str()) || self_closing {
                        self.insert(&name, attrs);
                    } else {
                        self.insert_and_push(&name, attrs);
                        self.original_mode = InsertionMode::InHead;
                        self.mode = InsertionMode::Text;
                    }
                    Flow::Done
                }
                Token::EndTag { ref name } if name == "head" => {
                    self.stack.pop();
                    self.mode = InsertionMode::AfterHead;
                    Flow::Done
                }
                Token::EndTag { ref name } if !matches!(name.as_str(), "body" | "html" | "br") => {
                    Flow::Done
                }
                t => {
                    self.stack.pop();
                    self.mode = InsertionMode::AfterHead;
                    Flow::Reprocess(t)
                }
            },

            InsertionMode::AfterHead => match token {
                Token::Doctype { .. } => Flow::Done,
                Token::Comment(text) => {
                    let parent = self.current();
                    self.insert_comment(&text, parent)
                }
                t if Self::is_whitespace(&t) => Flow::Done,
                Token::StartTag { name, attributes, .. } if name == "body" => {
                    self.insert_and_push("body", Self::convert_attributes(attributes));
                    self.mode = InsertionMode::InBody;
                    Flow::Done
                }
                Token::EndTag { ref name } if !matches!(name.as_str(), "body" | "html" | "br") => {
                    Flow::Done
                }
                t => {
                    self.insert_and_push("body", vec![]);
                    self.mode = InsertionMode::InBody;
                    Flow::Reprocess(t)
                }
            },

            InsertionMode::InBody => self.in_body(token),

            InsertionMode::Text => match token {
                Token::Character(c) => {
                    self.pending_text.push(c);
                    Flow::Done
                }
                Token::EndTag { .. } => {
                    self.stack.pop();
                    self.mode = self.original_mode;
                    Flow::Done
                }
                t => {
                    self.stack.pop();
                    self.mode = self.original_mode;
                    Flow::Reprocess(t)
                }
            },

            InsertionMode::AfterBody => match token {
                Token::Eof => Flow::Done,
                Token::Doctype { .. } => Flow::Done,
                Token::Comment(text) => {
                    // After </body> comments belong to the html element.
                    let html = self.stack.get(1).copied().unwrap_or(0);
                    self.insert_comment(&text, html)
                }
                Token::EndTag { ref name } if name == "html" || name == "body" => Flow::Done,
                t if Self::is_whitespace(&t) => self.in_body(t),
                t => {
                    self.mode = InsertionMode::InBody;
                    Flow::Reprocess(t)
                }
            },
        }
    }

    fn in_body(&mut self, token: Token) -> Flow {
        match token {
            Token::Character(c) => {
                self.pending_text.push(c);
            }
            Token::Comment(text) => {
                let parent = self.current();
                self.dom.create_comment(&text, Some(parent));
            }
            Token::Doctype { .. } | Token::Eof => {}
            Token::StartTag { name, attributes, self_closing } => {
                if matches!(name.as_str(), "html" | "body" | "head") {
                    return Flow::Done;
                }

                if CLOSES_P.contains(&name.as_str()) {
                    self.close_open("p", &[]);
                }
                if matches!(name.as_str(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
                    && matches!(self.current_tag(), Some("h1" | "h2" | "h3" | "h4" | "h5" | "h6"))
                {
                    self.stack.pop();
                }
                match name.as_str() {
                    "li" => {
                        self.close_open("li", &["ul", "ol"]);
                    }
                    "dd" | "dt" => {
                        if !self.close_open("dd", &["dl"]) {
                            self.close_open("dt", &["dl"]);
                        }
                    }
                    "option" => {
                        self.close_open("option", &["select"]);
                    }
                    _ => {}
                }

                let attrs = Self::convert_attributes(attributes);
                if VOID_ELEMENTS.contains(&name.as_str()) || self_closing {
                    self.insert(&name, attrs);
                } else {
                    self.insert_and_push(&name, attrs);
                    let text_only = RAW_TEXT_ELEMENTS.contains(&name.as_str())
                        || RCDATA_ELEMENTS.contains(&name.as_str());
                    if text_only {
                        self.original_mode = InsertionMode::InBody;
                        self.mode = InsertionMode::Text;
                    }
                }
            }
            Token::EndTag { name } => {
                if name == "body" || name == "html" {
                    self.mode = InsertionMode::AfterBody;
                    return Flow::Done;
                }
                if name == "p" && !self.close_open("p", &[]) {
                    // A stray </p> produces an empty paragraph.
                    self.insert("p", vec![]);
                    return Flow::Done;
                }
                self.close_open(&name, &[]);
            }
        }
        Flow::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::serialize;

    fn parse(html: &str) -> Dom {
        HtmlParser::new(html).parse()
    }

    #[test]
    fn test_implied_structure() {
        let dom = parse("<img class=proxied data-src=a.jpg>");
        assert_eq!(
            serialize(&dom),
            "<html><head></head><body><img class=\"proxied\" data-src=\"a.jpg\"></body></html>"
        );
    }

    #[test]
    fn test_head_content_stays_in_head() {
        let dom = parse("<!doctype html><title>t</title><style>img{width:10px}</style><p>x");
        assert_eq!(
            serialize(&dom),
            "<!DOCTYPE html><html><head><title>t</title><style>img{width:10px}</style></head><body><p>x</p></body></html>"
        );
    }

    #[test]
    fn test_paragraph_auto_close() {
        let dom = parse("<p>one<p>two<div>three</div>");
        assert_eq!(
            serialize(&dom),
            "<html><head></head><body><p>one</p><p>two</p><div>three</div></body></html>"
        );
    }

    #[test]
    fn test_list_items_close_siblings() {
        let dom = parse("<ul><li>a<li>b</ul>");
        assert_eq!(
            serialize(&dom),
            "<html><head></head><body><ul><li>a</li><li>b</li></ul></body></html>"
        );
    }

    #[test]
    fn test_unmatched_end_tag_is_ignored() {
        let dom = parse("<div><span>x</em></span></div>");
        assert_eq!(
            serialize(&dom),
            "<html><head></head><body><div><span>x</span></div></body></html>"
        );
    }

    #[test]
    fn test_whitespace_between_inline_elements_is_kept() {
        let dom = parse("<body><b>a</b> <i>b</i></body>");
        assert_eq!(
            serialize(&dom),
            "<html><head></head><body><b>a</b> <i>b</i></body></html>"
        );
    }

    #[test]
    fn test_comments_and_doctype_survive() {
        let html = concat!(
            r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 4.01//EN">"#,
            "<!-- licence --><html><head><!--[if IE]><link rel=x><![endif]--></head>",
            "<body><p>x<!--#include virtual=\"f\" --></p></body></html><!-- tail -->",
        );
        assert_eq!(
            serialize(&parse(html)),
            concat!(
                r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 4.01//EN">"#,
                "<!-- licence --><html><head><!--[if IE]><link rel=x><![endif]--></head>",
                "<body><p>x<!--#include virtual=\"f\" --></p></body><!-- tail --></html>",
            )
        );
    }

    #[test]
    fn test_text_only_elements_keep_markup_as_text() {
        let dom = parse(r#"<title>a &amp; b</title><noscript><img class="proxied"></noscript>"#);
        assert_eq!(
            serialize(&dom),
            concat!(
                "<html><head><title>a &amp; b</title>",
                r#"<noscript><img class="proxied"></noscript></head><body></body></html>"#,
            )
        );
        assert!(dom.elements_by_class_name("proxied").is_empty());
    }

    #[test]
    fn test_old_uppercase_markup() {
        let html = r#"<TITLE>What is Hypertext?</TITLE>
<H1>What is HyperText</H1>Hypertext is text.<P>
See <A HREF=Terms.html>terms</A>.
<UL>
<LI><A HREF=a.html>A</A>
</UL>"#;
        let dom = parse(html);
        let anchors: Vec<_> = dom
            .nodes
            .iter()
            .filter(|n| matches!(&n.node_type, NodeType::Element(el) if el.tag_name == "a"))
            .collect();
        assert_eq!(anchors.len(), 2);
        assert_eq!(dom.elements_by_class_name("x"), Vec::<NodeId>::new());
    }
}
