use crate::dom::{Dom, DomError, ElementData, NodeId, NodeType};
use crate::parser::css::{
    parse_declarations, serialize_declarations, Combinator, CompoundSelector, CssItem, CssParser,
    Declaration, Selector, Specificity,
};
use std::collections::HashMap;

pub const BASE_FONT_SIZE: f32 = 16.0;

const BLOCK_TAGS: &[&str] = &[
    "html", "body", "address", "article", "aside", "blockquote", "details", "dd", "div", "dl",
    "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table",
    "ul",
];

const HIDDEN_TAGS: &[&str] = &[
    "head", "meta", "link", "title", "style", "script", "base", "noscript", "template",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Display {
    None,
    Block,
    Inline,
    InlineBlock,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    Px(f32),
    Percent(f32),
    Vw(f32),
    Em(f32),
    Auto,
}

impl Length {
    pub fn parse(value: &str) -> Option<Length> {
        let v = value.trim().to_ascii_lowercase();
        if v == "auto" {
            return Some(Length::Auto);
        }
        if v == "0" {
            return Some(Length::Px(0.0));
        }
        let (number, ctor): (&str, fn(f32) -> Length) = if let Some(n) = v.strip_suffix("px") {
            (n, Length::Px)
        } else if let Some(n) = v.strip_suffix('%') {
            (n, Length::Percent)
        } else if let Some(n) = v.strip_suffix("vw") {
            (n, Length::Vw)
        } else if let Some(n) = v.strip_suffix("rem") {
            // Root font size is fixed, so rem resolves like px.
            return n.trim().parse::<f32>().ok().map(|n| Length::Px(n * BASE_FONT_SIZE));
        } else if let Some(n) = v.strip_suffix("em") {
            (n, Length::Em)
        } else {
            return None;
        };
        number.trim().parse::<f32>().ok().filter(|n| n.is_finite()).map(ctor)
    }

    /// Pixels for this length, `None` for `auto`.
    pub fn resolve(&self, containing: f32, viewport: f32, font_size: f32) -> Option<f32> {
        match *self {
            Length::Px(px) => Some(px),
            Length::Percent(p) => Some(containing * p / 100.0),
            Length::Vw(v) => Some(viewport * v / 100.0),
            Length::Em(e) => Some(font_size * e),
            Length::Auto => None,
        }
    }
}

/// Cascaded property values for a single element.
#[derive(Debug, Clone, Default)]
pub struct Style {
    pub properties: HashMap<String, String>,
    tag_display: Option<Display>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(|s| s.as_str())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.properties.insert(key.to_string(), value.to_string());
    }

    pub fn display(&self) -> Display {
        match self.get("display").map(|d| d.trim().to_ascii_lowercase()).as_deref() {
            Some("none") => Display::None,
            Some("block" | "flex" | "grid" | "list-item" | "table") => Display::Block,
            Some("inline-block" | "inline-flex" | "inline-grid" | "inline-table") => {
                Display::InlineBlock
            }
            Some("inline") => Display::Inline,
            _ => self.tag_display.unwrap_or(Display::Inline),
        }
    }

    pub fn length(&self, property: &str) -> Option<Length> {
        self.get(property).and_then(Length::parse)
    }

    /// Resolved length in pixels, treating missing, invalid and `auto` as 0.
    pub fn px_or_zero(
        &self,
        property: &str,
        containing: f32,
        viewport: f32,
        font_size: f32,
    ) -> f32 {
        self.length(property)
            .and_then(|l| l.resolve(containing, viewport, font_size))
            .unwrap_or(0.0)
    }

    /// Used width of a horizontal border. Without a visible border style the
    /// width is 0 whatever `border-*-width` says.
    pub fn border_width(
        &self,
        side: &str,
        containing: f32,
        viewport: f32,
        font_size: f32,
    ) -> f32 {
        let line = self.get(&format!("border-{side}-style")).map(str::trim);
        match line {
            None => 0.0,
            Some(l) if l.eq_ignore_ascii_case("none") || l.eq_ignore_ascii_case("hidden") => 0.0,
            Some(_) => {
                let property = format!("border-{side}-width");
                match self.get(&property) {
                    Some(_) => self.px_or_zero(&property, containing, viewport, font_size).max(0.0),
                    None => 3.0,
                }
            }
        }
    }

    pub fn font_size(&self, parent_font_size: f32) -> f32 {
        match self.get("font-size").map(|s| s.trim().to_ascii_lowercase()) {
            Some(s) if s == "small" => 13.0,
            Some(s) if s == "medium" => BASE_FONT_SIZE,
            Some(s) if s == "large" => 18.0,
            Some(s) => match Length::parse(&s) {
                Some(Length::Em(e)) => parent_font_size * e,
                Some(Length::Percent(p)) => parent_font_size * p / 100.0,
                Some(Length::Px(px)) => px,
                _ => parent_font_size,
            },
            None => parent_font_size,
        }
    }
}

/// Rules built into the engine, below every author rule in the cascade.
pub const USER_AGENT_CSS: &str = "body { margin: 8px }";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Origin {
    UserAgent,
    Author,
    Inline,
}

#[derive(Debug, Clone)]
pub struct StyleRule {
    pub selector: Selector,
    pub declarations: Vec<Declaration>,
    pub origin: Origin,
}

#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    pub rules: Vec<StyleRule>,
}

impl Stylesheet {
    pub fn new() -> Self {
        Self { rules: vec![] }
    }

    /// An empty author sheet on top of the user agent defaults.
    pub fn with_user_agent_defaults() -> Self {
        let mut sheet = Self::new();
        sheet.add_css_with_origin(USER_AGENT_CSS, Origin::UserAgent);
        sheet
    }

    pub fn from_css(css: &str) -> Self {
        let mut sheet = Self::new();
        sheet.add_css(css);
        sheet
    }

    pub fn add_css(&mut self, css: &str) {
        self.add_css_with_origin(css, Origin::Author);
    }

    fn add_css_with_origin(&mut self, css: &str, origin: Origin) {
        for item in CssParser::new(css).parse() {
            if let CssItem::Rule(rule) = item {
                for selector in rule.selectors {
                    self.rules.push(StyleRule {
                        selector,
                        declarations: rule.declarations.clone(),
                        origin,
                    });
                }
            }
        }
    }

    pub fn add_rule(&mut self, selector: Selector, declarations: Vec<Declaration>) {
        self.rules.push(StyleRule { selector, declarations, origin: Origin::Author });
    }

    pub fn compute_style(&self, dom: &Dom, node_id: NodeId) -> Style {
        let mut result = Style::new();
        let el = match &dom.nodes[node_id].node_type {
            NodeType::Element(el) => el,
            _ => return result,
        };
        result.tag_display = Some(default_display(el));

        let inline = el.get_attribute("style").map(parse_declarations).unwrap_or_default();

        // (important, origin, specificity, order)
        let mut applied: Vec<((bool, Origin, Specificity, usize), &Declaration)> = Vec::new();
        for (order, rule) in self.rules.iter().enumerate() {
            let Some(last) = rule.selector.compounds.len().checked_sub(1) else {
                continue;
            };
            if matches_selector(dom, node_id, &rule.selector, last) {
                let specificity = rule.selector.specificity();
                for decl in &rule.declarations {
                    applied.push(((decl.important, rule.origin, specificity, order), decl));
                }
            }
        }
        for decl in &inline {
            applied.push(((decl.important, Origin::Inline, Specificity::default(), 0), decl));
        }
        applied.sort_by(|a, b| a.0.cmp(&b.0));

        for (_, decl) in applied {
            apply_declaration(&mut result, decl);
        }
        result
    }
}

fn default_display(el: &ElementData) -> Display {
    let tag = el.tag_name.to_ascii_lowercase();
    if HIDDEN_TAGS.contains(&tag.as_str()) || el.get_attribute("hidden").is_some() {
        Display::None
    } else if BLOCK_TAGS.contains(&tag.as_str()) {
        Display::Block
    } else {
        Display::Inline
    }
}

const BORDER_STYLES: &[&str] = &[
    "none", "hidden", "dotted", "dashed", "solid", "double", "groove", "ridge", "inset", "outset",
];

/// A border width as a length, with the keyword widths spelled out.
fn border_width_value(part: &str) -> Option<&str> {
    match part.to_ascii_lowercase().as_str() {
        "thin" => Some("1px"),
        "medium" => Some("3px"),
        "thick" => Some("5px"),
        _ => Length::parse(part).is_some().then_some(part),
    }
}

fn apply_declaration(style: &mut Style, decl: &Declaration) {
    match decl.property.as_str() {
        "margin" | "padding" => {
            let parts: Vec<&str> = decl.value.split_whitespace().collect();
            let (top, right, bottom, left) = match parts.as_slice() {
                [a] => (*a, *a, *a, *a),
                [a, b] => (*a, *b, *a, *b),
                [a, b, c] => (*a, *b, *c, *b),
                [a, b, c, d, ..] => (*a, *b, *c, *d),
                [] => return,
            };
            let sides = [("top", top), ("right", right), ("bottom", bottom), ("left", left)];
            for (side, value) in sides {
                style.set(&format!("{}-{}", decl.property, side), value);
            }
        }
        "border" | "border-left" | "border-right" => {
            // Omitted parts reset to their initial values: medium, none.
            let parts: Vec<&str> = decl.value.split_whitespace().collect();
            let width = parts
                .iter()
                .find_map(|p| border_width_value(p))
                .unwrap_or("3px");
            let line = parts
                .iter()
                .find(|p| BORDER_STYLES.contains(&p.to_ascii_lowercase().as_str()))
                .copied()
                .unwrap_or("none");
            let sides: &[&str] = match decl.property.as_str() {
                "border-left" => &["left"],
                "border-right" => &["right"],
                _ => &["left", "right"],
            };
            for side in sides {
                style.set(&format!("border-{side}-width"), width);
                style.set(&format!("border-{side}-style"), line);
            }
        }
        "border-width" | "border-style" => {
            let parts: Vec<&str> = decl.value.split_whitespace().collect();
            let (right, left) = match parts.as_slice() {
                [a] => (*a, *a),
                [_, b] | [_, b, _] => (*b, *b),
                [_, b, _, d, ..] => (*b, *d),
                [] => return,
            };
            let kind = &decl.property["border-".len()..];
            for (side, value) in [("right", right), ("left", left)] {
                let value = match kind {
                    "width" => border_width_value(value).unwrap_or("0"),
                    _ => value,
                };
                style.set(&format!("border-{side}-{kind}"), value);
            }
        }
        "border-left-width" | "border-right-width" => {
            let width = border_width_value(decl.value.trim()).unwrap_or("0");
            style.set(&decl.property, width);
        }
        _ => style.set(&decl.property, &decl.value),
    }
}

fn matches_compound(el: &ElementData, compound: &CompoundSelector) -> bool {
    if let Some(tag) = &compound.tag {
        if !el.tag_name.eq_ignore_ascii_case(tag) {
            return false;
        }
    }
    if let Some(id) = &compound.id {
        if el.get_attribute("id") != Some(id.as_str()) {
            return false;
        }
    }
    compound.classes.iter().all(|c| el.has_class(c))
}

/// Whether `node_id` matches `selector.compounds[..=idx]`, with compound
/// `idx` matched against the node itself.
fn matches_selector(dom: &Dom, node_id: NodeId, selector: &Selector, idx: usize) -> bool {
    let el = match &dom.nodes[node_id].node_type {
        NodeType::Element(el) => el,
        _ => return false,
    };
    if !matches_compound(el, &selector.compounds[idx]) {
        return false;
    }
    if idx == 0 {
        return true;
    }
    match selector.combinators[idx - 1] {
        Combinator::Child => dom.nodes[node_id]
            .parent
            .map_or(false, |p| matches_selector(dom, p, selector, idx - 1)),
        Combinator::Descendant => dom
            .ancestors(node_id)
            .any(|a| matches_selector(dom, a, selector, idx - 1)),
    }
}

/// Sets one property in the element's `style` attribute, replacing any
/// previous declaration of it and keeping the others.
pub fn set_inline_property(
    dom: &mut Dom,
    node_id: NodeId,
    property: &str,
    value: &str,
) -> Result<(), DomError> {
    let el = dom.element_mut(node_id)?;
    let mut declarations = el.get_attribute("style").map(parse_declarations).unwrap_or_default();
    declarations.retain(|d| !d.property.eq_ignore_ascii_case(property));
    declarations.push(Declaration {
        property: property.to_ascii_lowercase(),
        value: value.to_string(),
        important: false,
    });
    el.set_attribute("style", &serialize_declarations(&declarations));
    Ok(())
}
