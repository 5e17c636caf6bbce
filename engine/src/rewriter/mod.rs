// engine/src/rewriter/mod.rs
//
// Rewrites marked elements so their images are fetched through a resizing
// proxy at the width the element is rendered at.

pub mod config;
pub mod host;
pub mod proxy_url;

pub use config::{ConfigError, RewriterConfig};
pub use host::{DocumentHost, HostError};
pub use proxy_url::{ProxyUrl, ProxyUrlError};

use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("could not select candidate elements")]
    Selection(#[source] HostError),
}

/// What a pass does (or would do) to one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementPlan<E> {
    pub element: E,
    pub width: u32,
    pub source: Option<ProxyUrl>,
    pub background: Option<ProxyUrl>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementOutcome<E> {
    Rewritten(ElementPlan<E>),
    /// Neither source attribute was present.
    Skipped(E),
    /// The element was left as it was, or partly rewritten if the failure
    /// came after the source was set.
    Failed(E, HostError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RewriteReport<E> {
    pub outcomes: Vec<ElementOutcome<E>>,
}

impl<E> Default for RewriteReport<E> {
    fn default() -> Self {
        Self { outcomes: Vec::new() }
    }
}

impl<E> RewriteReport<E> {
    pub fn rewritten(&self) -> impl Iterator<Item = &ElementPlan<E>> {
        self.outcomes.iter().filter_map(|o| match o {
            ElementOutcome::Rewritten(plan) => Some(plan),
            _ => None,
        })
    }

    pub fn rewritten_count(&self) -> usize {
        self.rewritten().count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, ElementOutcome::Skipped(_))).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&E, &HostError)> {
        self.outcomes.iter().filter_map(|o| match o {
            ElementOutcome::Failed(element, error) => Some((element, error)),
            _ => None,
        })
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }
}

pub struct Rewriter {
    config: RewriterConfig,
}

impl Rewriter {
    pub fn new(config: RewriterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RewriterConfig {
        &self.config
    }

    /// Runs one pass over every candidate in document order. A failing
    /// element is recorded and the pass moves on.
    pub fn rewrite<H: DocumentHost>(
        &self,
        host: &mut H,
    ) -> Result<RewriteReport<H::Element>, RewriteError> {
        let candidates = self.select(host)?;
        let mut report = RewriteReport::default();

        for element in candidates {
            let outcome = match self.rewrite_element(host, element) {
                Ok(Some(plan)) => {
                    debug!(?element, width = plan.width, "rewrote element");
                    ElementOutcome::Rewritten(plan)
                }
                Ok(None) => ElementOutcome::Skipped(element),
                Err(error) => {
                    warn!(?element, %error, "leaving element unrewritten");
                    ElementOutcome::Failed(element, error)
                }
            };
            report.outcomes.push(outcome);
        }

        info!(
            rewritten = report.rewritten_count(),
            skipped = report.skipped_count(),
            failed = report.failed_count(),
            "rewrite pass finished"
        );
        Ok(report)
    }

    /// Same as `rewrite` without touching the document. Widths come from the
    /// untouched layout, which matches `rewrite` since it measures each
    /// element before mutating it.
    pub fn plan<H: DocumentHost>(
        &self,
        host: &H,
    ) -> Result<RewriteReport<H::Element>, RewriteError> {
        let candidates = self.select(host)?;
        let outcomes = candidates
            .into_iter()
            .map(|element| match self.resolve(host, element) {
                Ok(Some(plan)) => ElementOutcome::Rewritten(plan),
                Ok(None) => ElementOutcome::Skipped(element),
                Err(error) => ElementOutcome::Failed(element, error),
            })
            .collect();
        Ok(RewriteReport { outcomes })
    }

    fn select<H: DocumentHost>(&self, host: &H) -> Result<Vec<H::Element>, RewriteError> {
        let candidates = host
            .candidates(&self.config.marker_class)
            .map_err(RewriteError::Selection)?;
        debug!(class = %self.config.marker_class, count = candidates.len(), "selected candidates");
        Ok(candidates)
    }

    fn resolve<H: DocumentHost>(
        &self,
        host: &H,
        element: H::Element,
    ) -> Result<Option<ElementPlan<H::Element>>, HostError> {
        let source = host.attribute(element, &self.config.source_attribute)?;
        let background = host.attribute(element, &self.config.background_attribute)?;
        if source.is_none() && background.is_none() {
            return Ok(None);
        }

        // Measured once, before anything on this element changes.
        let width = host.rendered_width(element)?;
        let proxied = |s: String| ProxyUrl::new(&self.config.proxy_id, width, &s);
        Ok(Some(ElementPlan {
            element,
            width,
            source: source.map(proxied),
            background: background.map(proxied),
        }))
    }

    fn rewrite_element<H: DocumentHost>(
        &self,
        host: &mut H,
        element: H::Element,
    ) -> Result<Option<ElementPlan<H::Element>>, HostError> {
        let Some(plan) = self.resolve(host, element)? else {
            return Ok(None);
        };
        if let Some(url) = &plan.source {
            host.set_source(element, &url.to_string())?;
        }
        if let Some(url) = &plan.background {
            host.set_background_image(element, &url.css_url())?;
        }
        Ok(Some(plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, Default)]
    struct FakeElement {
        classes: Vec<&'static str>,
        attributes: HashMap<String, String>,
        width: u32,
        width_after_write: Option<u32>,
        background: Option<String>,
        broken: bool,
    }

    #[derive(Default)]
    struct FakeHost {
        elements: Vec<FakeElement>,
        width_reads: std::cell::Cell<usize>,
        select_fails: bool,
    }

    impl FakeHost {
        fn push(&mut self, element: FakeElement) -> usize {
            self.elements.push(element);
            self.elements.len() - 1
        }
    }

    fn marked(attrs: &[(&str, &str)], width: u32) -> FakeElement {
        FakeElement {
            classes: vec!["proxied"],
            attributes: attrs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            width,
            ..Default::default()
        }
    }

    impl DocumentHost for FakeHost {
        type Element = usize;

        fn candidates(&self, class: &str) -> Result<Vec<usize>, HostError> {
            if self.select_fails {
                return Err(HostError::NoDocument);
            }
            Ok((0..self.elements.len())
                .filter(|&i| self.elements[i].classes.contains(&class))
                .collect())
        }

        fn attribute(&self, element: usize, name: &str) -> Result<Option<String>, HostError> {
            let el = &self.elements[element];
            if el.broken {
                return Err(HostError::Other("element went away".into()));
            }
            Ok(el.attributes.get(name).cloned())
        }

        fn rendered_width(&self, element: usize) -> Result<u32, HostError> {
            self.width_reads.set(self.width_reads.get() + 1);
            Ok(self.elements[element].width)
        }

        fn set_source(&mut self, element: usize, url: &str) -> Result<(), HostError> {
            let el = &mut self.elements[element];
            el.attributes.insert("src".into(), url.into());
            if let Some(width) = el.width_after_write {
                el.width = width;
            }
            Ok(())
        }

        fn set_background_image(&mut self, element: usize, css_value: &str) -> Result<(), HostError> {
            self.elements[element].background = Some(css_value.into());
            Ok(())
        }
    }

    fn rewriter() -> Rewriter {
        Rewriter::new(RewriterConfig::new("img", "proxied")).unwrap()
    }

    #[test]
    fn rewrites_source_with_rendered_width() {
        let mut host = FakeHost::default();
        let el = host.push(marked(&[("data-src", "photos/a.jpg")], 240));

        let report = rewriter().rewrite(&mut host).unwrap();

        assert_eq!(host.elements[el].attributes["src"], "/img/240/photos/a.jpg");
        assert_eq!(host.elements[el].background, None);
        assert_eq!(report.rewritten_count(), 1);
    }

    #[test]
    fn rewrites_background_of_boxless_element() {
        let mut host = FakeHost::default();
        let el = host.push(marked(&[("data-bg", "/hero.png")], 0));

        rewriter().rewrite(&mut host).unwrap();

        assert_eq!(host.elements[el].background.as_deref(), Some("url(/img/0//hero.png)"));
        assert!(!host.elements[el].attributes.contains_key("src"));
    }

    #[test]
    fn both_urls_share_one_width_read_before_mutation() {
        let mut host = FakeHost::default();
        let mut element = marked(&[("data-src", "a.jpg"), ("data-bg", "b.png")], 100);
        element.width_after_write = Some(640);
        let el = host.push(element);

        let report = rewriter().rewrite(&mut host).unwrap();

        assert_eq!(host.width_reads.get(), 1);
        assert_eq!(host.elements[el].attributes["src"], "/img/100/a.jpg");
        assert_eq!(host.elements[el].background.as_deref(), Some("url(/img/100/b.png)"));
        let plan = report.rewritten().next().unwrap();
        assert_eq!(plan.width, 100);
    }

    #[test]
    fn unmarked_and_attributeless_elements_are_untouched() {
        let mut host = FakeHost::default();
        let mut plain = marked(&[("data-src", "a.jpg")], 50);
        plain.classes = vec!["hero"];
        let plain = host.push(plain);
        let bare = host.push(marked(&[], 50));

        let report = rewriter().rewrite(&mut host).unwrap();

        assert!(!host.elements[plain].attributes.contains_key("src"));
        assert!(host.elements[bare].attributes.is_empty());
        assert_eq!(report.outcomes, vec![ElementOutcome::Skipped(bare)]);
        assert_eq!(host.width_reads.get(), 0);
    }

    #[test]
    fn empty_attribute_counts_as_present() {
        let mut host = FakeHost::default();
        let el = host.push(marked(&[("data-src", "")], 240));

        rewriter().rewrite(&mut host).unwrap();

        assert_eq!(host.elements[el].attributes["src"], "/img/240/");
    }

    #[test]
    fn failing_element_does_not_stop_the_pass() {
        let mut host = FakeHost::default();
        let mut broken = marked(&[("data-src", "a.jpg")], 10);
        broken.broken = true;
        let broken = host.push(broken);
        let good = host.push(marked(&[("data-src", "b.jpg")], 20));

        let report = rewriter().rewrite(&mut host).unwrap();

        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.failures().next().map(|(e, _)| *e), Some(broken));
        assert_eq!(host.elements[good].attributes["src"], "/img/20/b.jpg");
    }

    #[test]
    fn selection_failure_aborts_the_pass() {
        let mut host = FakeHost {
            select_fails: true,
            ..Default::default()
        };
        let err = rewriter().rewrite(&mut host).unwrap_err();
        assert!(matches!(err, RewriteError::Selection(HostError::NoDocument)));
    }

    #[test]
    fn second_pass_keeps_original_sources() {
        let mut host = FakeHost::default();
        let el = host.push(marked(&[("data-src", "a.jpg")], 240));

        rewriter().rewrite(&mut host).unwrap();
        rewriter().rewrite(&mut host).unwrap();

        assert_eq!(host.elements[el].attributes["src"], "/img/240/a.jpg");
    }

    #[test]
    fn plan_leaves_host_untouched() {
        let mut host = FakeHost::default();
        let el = host.push(marked(&[("data-bg", "b.png")], 30));

        let report = rewriter().plan(&host).unwrap();

        assert_eq!(host.elements[el].background, None);
        let plan = report.rewritten().next().unwrap();
        assert_eq!(plan.background.as_ref().map(|u| u.css_url()).as_deref(), Some("url(/img/30/b.png)"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(Rewriter::new(RewriterConfig::new("", "proxied")).is_err());
    }
}
