// engine/src/layout/mod.rs
//
// Horizontal layout only: every box gets the width a browser would report as
// `offsetWidth` (border box, rounded). Vertical placement is not computed.

use crate::dom::{Dom, NodeId, NodeType};
use crate::style::{Display, Style, Stylesheet, BASE_FONT_SIZE};
use std::collections::HashMap;

/// Average glyph advance as a fraction of the font size.
pub const CHAR_WIDTH_FACTOR: f32 = 0.6;

const REPLACED_TAGS: &[&str] = &[
    "img", "video", "canvas", "iframe", "embed", "object", "svg", "input",
];

/// Whether the element sizes itself from its own content (`src`, attributes).
pub fn is_replaced(tag: &str) -> bool {
    REPLACED_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

/// Looks up the natural width of an image resource.
pub trait ImageProbe {
    fn intrinsic_width(&self, src: &str) -> Option<u32>;
}

/// Probe that knows nothing; unsized images lay out at 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProbe;

impl ImageProbe for NoProbe {
    fn intrinsic_width(&self, _src: &str) -> Option<u32> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    pub viewport_width: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self { viewport_width: 1280.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoxType {
    Block,
    Inline,
    InlineBlock,
    Replaced,
    Text,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Dimensions {
    /// Border box width.
    pub width: f32,
    /// Width available to children.
    pub content_width: f32,
}

#[derive(Debug, Clone)]
pub struct LayoutBox {
    pub node_id: NodeId,
    pub box_type: BoxType,
    pub dimensions: Dimensions,
    pub children: Vec<LayoutBox>,
}

/// Result of one layout pass.
#[derive(Debug, Clone, Default)]
pub struct LayoutTree {
    pub root: Option<LayoutBox>,
    widths: HashMap<NodeId, f32>,
}

impl LayoutTree {
    /// Rounded border box width, `None` when the node generated no box.
    pub fn width(&self, node_id: NodeId) -> Option<u32> {
        self.widths.get(&node_id).map(|w| w.round().max(0.0) as u32)
    }

    /// Width as scripts see it: nodes without a box report 0.
    pub fn rendered_width(&self, node_id: NodeId) -> u32 {
        self.width(node_id).unwrap_or(0)
    }

    pub fn box_count(&self) -> usize {
        self.widths.len()
    }

    fn record(&mut self, layout_box: &LayoutBox) {
        self.widths.insert(layout_box.node_id, layout_box.dimensions.width);
        for child in &layout_box.children {
            self.record(child);
        }
    }
}

/// Horizontal edges of a box resolved to pixels.
#[derive(Debug, Clone, Copy, Default)]
struct Edges {
    margin: f32,
    padding: f32,
    border: f32,
}

impl Edges {
    fn inner(&self) -> f32 {
        self.padding + self.border
    }

    fn around(&self, content: f32) -> Dimensions {
        Dimensions { width: content + self.inner(), content_width: content }
    }
}

pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> LayoutConfig {
        self.config
    }

    pub fn layout(&self, dom: &Dom, stylesheet: &Stylesheet, probe: &dyn ImageProbe) -> LayoutTree {
        let mut tree = LayoutTree::default();
        if dom.nodes.is_empty() {
            return tree;
        }

        let viewport = self.config.viewport_width.max(0.0);
        let root_id = dom.root();
        let children = dom.nodes[root_id]
            .children
            .iter()
            .filter_map(|&child| {
                self.layout_node(dom, stylesheet, probe, child, viewport, BASE_FONT_SIZE)
            })
            .collect();

        let root = LayoutBox {
            node_id: root_id,
            box_type: BoxType::Block,
            dimensions: Dimensions { width: viewport, content_width: viewport },
            children,
        };
        tree.record(&root);
        tree.root = Some(root);
        tree
    }

    fn edges(&self, style: &Style, containing: f32, font_size: f32) -> Edges {
        let viewport = self.config.viewport_width;
        let px = |prop: &str| style.px_or_zero(prop, containing, viewport, font_size);
        let border = |side: &str| style.border_width(side, containing, viewport, font_size);
        Edges {
            margin: px("margin-left") + px("margin-right"),
            padding: px("padding-left").max(0.0) + px("padding-right").max(0.0),
            border: border("left") + border("right"),
        }
    }

    /// Explicit `width` converted to a content width, honouring box-sizing
    /// and min/max-width.
    fn specified_content_width(
        &self,
        style: &Style,
        containing: f32,
        font_size: f32,
        edges: &Edges,
    ) -> Option<f32> {
        let viewport = self.config.viewport_width;
        let width = style
            .length("width")
            .and_then(|l| l.resolve(containing, viewport, font_size))?;
        let content = if style.get("box-sizing").map(str::trim) == Some("border-box") {
            width - edges.inner()
        } else {
            width
        };
        Some(self.clamp(style, content.max(0.0), containing, font_size))
    }

    fn clamp(&self, style: &Style, content: f32, containing: f32, font_size: f32) -> f32 {
        let viewport = self.config.viewport_width;
        let mut content = content;
        if let Some(max) = style
            .length("max-width")
            .and_then(|l| l.resolve(containing, viewport, font_size))
        {
            content = content.min(max);
        }
        if let Some(min) = style
            .length("min-width")
            .and_then(|l| l.resolve(containing, viewport, font_size))
        {
            content = content.max(min);
        }
        content.max(0.0)
    }

    fn layout_node(
        &self,
        dom: &Dom,
        stylesheet: &Stylesheet,
        probe: &dyn ImageProbe,
        node_id: NodeId,
        containing: f32,
        parent_font_size: f32,
    ) -> Option<LayoutBox> {
        let el = match &dom.nodes[node_id].node_type {
            NodeType::Text(text) => return self.layout_text(node_id, text, parent_font_size),
            NodeType::Element(el) => el,
            NodeType::Comment(_) => return None,
        };

        let style = stylesheet.compute_style(dom, node_id);
        let display = style.display();
        if display == Display::None {
            return None;
        }

        let font_size = style.font_size(parent_font_size);
        let edges = self.edges(&style, containing, font_size);
        let tag = el.tag_name.to_ascii_lowercase();

        if is_replaced(&tag) {
            let content = self
                .specified_content_width(&style, containing, font_size, &edges)
                .or_else(|| {
                    let attr = el.get_attribute("width")?.trim().parse::<f32>().ok()?;
                    Some(self.clamp(&style, attr, containing, font_size))
                })
                .or_else(|| {
                    let natural = probe.intrinsic_width(el.get_attribute("src")?)? as f32;
                    Some(self.clamp(&style, natural, containing, font_size))
                })
                .unwrap_or(0.0);
            return Some(LayoutBox {
                node_id,
                box_type: BoxType::Replaced,
                dimensions: edges.around(content),
                children: vec![],
            });
        }

        match display {
            Display::Block => {
                let content = self
                    .specified_content_width(&style, containing, font_size, &edges)
                    .unwrap_or_else(|| {
                        let available = (containing - edges.margin - edges.inner()).max(0.0);
                        self.clamp(&style, available, containing, font_size)
                    });
                let children =
                    self.layout_children(dom, stylesheet, probe, node_id, content, font_size);
                Some(LayoutBox {
                    node_id,
                    box_type: BoxType::Block,
                    dimensions: edges.around(content),
                    children,
                })
            }
            Display::InlineBlock => {
                let available = (containing - edges.margin - edges.inner()).max(0.0);
                let specified = self.specified_content_width(&style, containing, font_size, &edges);
                let child_containing = specified.unwrap_or(available);
                let children = self.layout_children(
                    dom,
                    stylesheet,
                    probe,
                    node_id,
                    child_containing,
                    font_size,
                );
                let content = specified.unwrap_or_else(|| {
                    let preferred = preferred_width(&children);
                    self.clamp(&style, preferred.min(available), containing, font_size)
                });
                Some(LayoutBox {
                    node_id,
                    box_type: BoxType::InlineBlock,
                    dimensions: edges.around(content),
                    children,
                })
            }
            Display::Inline => {
                let available = (containing - edges.inner()).max(0.0);
                let children =
                    self.layout_children(dom, stylesheet, probe, node_id, available, font_size);
                let content = preferred_width(&children).min(available);
                Some(LayoutBox {
                    node_id,
                    box_type: BoxType::Inline,
                    dimensions: edges.around(content),
                    children,
                })
            }
            Display::None => None,
        }
    }

    fn layout_children(
        &self,
        dom: &Dom,
        stylesheet: &Stylesheet,
        probe: &dyn ImageProbe,
        node_id: NodeId,
        containing: f32,
        font_size: f32,
    ) -> Vec<LayoutBox> {
        dom.nodes[node_id]
            .children
            .iter()
            .filter_map(|&child| {
                self.layout_node(dom, stylesheet, probe, child, containing, font_size)
            })
            .collect()
    }

    fn layout_text(&self, node_id: NodeId, text: &str, font_size: f32) -> Option<LayoutBox> {
        let width = measure_text(text, font_size);
        if width == 0.0 {
            return None;
        }
        Some(LayoutBox {
            node_id,
            box_type: BoxType::Text,
            dimensions: Dimensions { width, content_width: width },
            children: vec![],
        })
    }
}

/// Width of `text` on a single line with collapsed whitespace.
pub fn measure_text(text: &str, font_size: f32) -> f32 {
    let chars: usize = text.split_whitespace().map(|w| w.chars().count() + 1).sum();
    chars.saturating_sub(1) as f32 * font_size * CHAR_WIDTH_FACTOR
}

/// Shrink-to-fit preferred width: inline runs are summed, blocks start a
/// new line.
fn preferred_width(children: &[LayoutBox]) -> f32 {
    let mut widest = 0.0_f32;
    let mut line = 0.0_f32;
    for child in children {
        if child.box_type == BoxType::Block {
            widest = widest.max(line).max(child.dimensions.width);
            line = 0.0;
        } else {
            line += child.dimensions.width;
        }
    }
    widest.max(line)
}
