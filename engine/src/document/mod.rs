// engine/src/document/mod.rs
//
// A parsed page with its stylesheets and a lazily computed layout. Mutations
// that can move a box throw the layout away so the next width query reflows.

use crate::dom::{serialize, Dom, DomError, NodeId};
use crate::layout::{is_replaced, ImageProbe, LayoutConfig, LayoutEngine, LayoutTree, NoProbe};
use crate::net::CachedProbe;
use crate::parser::html::{extract_stylesheets, HtmlParser};
use crate::rewriter::{DocumentHost, HostError};
use crate::style::{set_inline_property, Stylesheet};
use std::cell::RefCell;

pub struct LiveDocument {
    dom: Dom,
    stylesheet: Stylesheet,
    engine: LayoutEngine,
    probe: CachedProbe,
    layout: RefCell<Option<LayoutTree>>,
}

impl LiveDocument {
    pub fn parse(html: &str, config: LayoutConfig) -> Self {
        Self::parse_with_probe(html, config, Box::new(NoProbe))
    }

    pub fn parse_with_probe(
        html: &str,
        config: LayoutConfig,
        probe: Box<dyn ImageProbe>,
    ) -> Self {
        Self::from_dom(HtmlParser::new(html).parse(), config, probe)
    }

    /// Collects the document's own `<style>` sheets on top of the user agent
    /// defaults. Image probes are memoized for the life of the document.
    pub fn from_dom(dom: Dom, config: LayoutConfig, probe: Box<dyn ImageProbe>) -> Self {
        let mut stylesheet = Stylesheet::with_user_agent_defaults();
        let sheets = extract_stylesheets(&dom);
        tracing::debug!(count = sheets.len(), "collected document stylesheets");
        for css in &sheets {
            stylesheet.add_css(css);
        }
        Self {
            dom,
            stylesheet,
            engine: LayoutEngine::new(config),
            probe: CachedProbe::new(probe),
            layout: RefCell::new(None),
        }
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    /// Mutable access for callers editing the tree directly. Layout is
    /// recomputed on the next query.
    pub fn dom_mut(&mut self) -> &mut Dom {
        self.invalidate_layout();
        &mut self.dom
    }

    pub fn stylesheet(&self) -> &Stylesheet {
        &self.stylesheet
    }

    pub fn invalidate_layout(&mut self) {
        self.layout.get_mut().take();
    }

    pub fn is_laid_out(&self) -> bool {
        self.layout.borrow().is_some()
    }

    fn with_layout<R>(&self, f: impl FnOnce(&LayoutTree) -> R) -> R {
        let mut cached = self.layout.borrow_mut();
        let tree = cached.get_or_insert_with(|| {
            tracing::trace!("reflow");
            self.engine.layout(&self.dom, &self.stylesheet, &self.probe)
        });
        f(tree)
    }

    pub fn to_html(&self) -> String {
        serialize(&self.dom)
    }

    pub fn into_html(self) -> String {
        self.to_html()
    }

    fn ensure_document(&self) -> Result<(), HostError> {
        if self.dom.nodes.is_empty() {
            return Err(HostError::NoDocument);
        }
        Ok(())
    }
}

impl DocumentHost for LiveDocument {
    type Element = NodeId;

    fn candidates(&self, class: &str) -> Result<Vec<NodeId>, HostError> {
        self.ensure_document()?;
        Ok(self.dom.elements_by_class_name(class))
    }

    fn attribute(&self, element: NodeId, name: &str) -> Result<Option<String>, HostError> {
        Ok(self.dom.get_attribute(element, name)?.map(str::to_string))
    }

    fn rendered_width(&self, element: NodeId) -> Result<u32, HostError> {
        self.dom.element(element)?;
        if !self.dom.is_attached(element) {
            return Err(DomError::Detached(element).into());
        }
        Ok(self.with_layout(|tree| tree.rendered_width(element)))
    }

    fn set_source(&mut self, element: NodeId, url: &str) -> Result<(), HostError> {
        self.dom.set_attribute(element, "src", url)?;
        // Only replaced elements size themselves from `src`.
        if is_replaced(&self.dom.element(element)?.tag_name) {
            self.invalidate_layout();
        }
        Ok(())
    }

    fn set_background_image(
        &mut self,
        element: NodeId,
        css_value: &str,
    ) -> Result<(), HostError> {
        // Backgrounds never affect box widths; the layout stays valid.
        set_inline_property(&mut self.dom, element, "background-image", css_value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> LiveDocument {
        LiveDocument::parse(html, LayoutConfig::default())
    }

    #[test]
    fn widths_follow_document_styles() {
        let doc = doc(r#"<style>.box { width: 240px }</style><img class="box proxied" data-src="a.jpg">"#);
        let el = doc.candidates("proxied").unwrap()[0];
        assert_eq!(doc.rendered_width(el).unwrap(), 240);
        assert!(doc.is_laid_out());
    }

    #[test]
    fn mutation_invalidates_layout() {
        let mut doc = doc(r#"<img class="proxied" width="64">"#);
        let el = doc.candidates("proxied").unwrap()[0];
        assert_eq!(doc.rendered_width(el).unwrap(), 64);

        doc.set_source(el, "/img/64/a.jpg").unwrap();
        assert!(!doc.is_laid_out());
        assert_eq!(doc.attribute(el, "src").unwrap().as_deref(), Some("/img/64/a.jpg"));
    }

    #[test]
    fn backgrounds_keep_the_layout() {
        let mut doc = doc(r#"<div class="proxied" data-bg="b.png"></div><p class="proxied"></p>"#);
        let found = doc.candidates("proxied").unwrap();
        assert_eq!(doc.rendered_width(found[0]).unwrap(), 1264);

        doc.set_background_image(found[0], "url(/img/1264/b.png)").unwrap();
        doc.set_source(found[1], "/img/1264/c.png").unwrap();
        assert!(doc.is_laid_out());
    }

    #[test]
    fn background_is_written_into_inline_style() {
        let mut doc = doc(r#"<div class="proxied" style="color: red; background-image: none"></div>"#);
        let el = doc.candidates("proxied").unwrap()[0];
        doc.set_background_image(el, "url(/img/0/b.png)").unwrap();
        assert_eq!(
            doc.attribute(el, "style").unwrap().as_deref(),
            Some("color: red; background-image: url(/img/0/b.png);")
        );
    }

    #[test]
    fn detached_elements_have_no_width() {
        let mut doc = doc(r#"<p><img class="proxied"></p>"#);
        let el = doc.candidates("proxied").unwrap()[0];
        doc.dom_mut().detach(el).unwrap();
        assert_eq!(doc.rendered_width(el), Err(HostError::Dom(DomError::Detached(el))));
    }

    #[test]
    fn missing_nodes_are_reported() {
        let doc = doc("<p>hi</p>");
        assert_eq!(doc.attribute(999, "data-src"), Err(HostError::Dom(DomError::NoSuchNode(999))));
    }

    #[test]
    fn empty_tree_has_no_document() {
        let doc = LiveDocument::from_dom(Dom::new(), LayoutConfig::default(), Box::new(NoProbe));
        assert_eq!(doc.candidates("proxied"), Err(HostError::NoDocument));
    }
}
