// End-to-end rewrite passes over parsed pages: parsing, style cascade,
// layout and the rewriter together.

#[cfg(test)]
mod rewrite_pass_tests {
    use sizeproxy_engine::{DocumentHost, LayoutConfig, LiveDocument, Rewriter, RewriterConfig};

    fn rewrite(html: &str) -> LiveDocument {
        let mut doc = LiveDocument::parse(html, LayoutConfig::default());
        let rewriter = Rewriter::new(RewriterConfig::new("img", "proxied")).unwrap();
        let report = rewriter.rewrite(&mut doc).unwrap();
        assert_eq!(report.failed_count(), 0);
        doc
    }

    fn attr(doc: &LiveDocument, class: &str, name: &str) -> Option<String> {
        let el = doc.candidates(class).unwrap()[0];
        doc.attribute(el, name).unwrap()
    }

    #[test]
    fn image_source_uses_rendered_width() {
        let doc = rewrite(r#"<img class="proxied" data-src="photos/a.jpg" style="width: 240px">"#);
        assert_eq!(attr(&doc, "proxied", "src").as_deref(), Some("/img/240/photos/a.jpg"));
    }

    #[test]
    fn hidden_background_gets_zero_width() {
        let doc = rewrite(r#"<div class="proxied" data-bg="hero.png" style="display:none"></div>"#);
        assert_eq!(
            attr(&doc, "proxied", "style").as_deref(),
            Some("display: none; background-image: url(/img/0/hero.png);")
        );
    }

    #[test]
    fn hidden_ancestor_hides_descendants() {
        let doc = rewrite(r#"<section hidden><img class="proxied" data-src="a.jpg" width="80"></section>"#);
        assert_eq!(attr(&doc, "proxied", "src").as_deref(), Some("/img/0/a.jpg"));
    }

    #[test]
    fn both_attributes_share_the_width() {
        let doc = rewrite(r#"<div class="proxied" data-src="a.jpg" data-bg="b.jpg" style="width: 100px"></div>"#);
        assert_eq!(attr(&doc, "proxied", "src").as_deref(), Some("/img/100/a.jpg"));
        assert_eq!(
            attr(&doc, "proxied", "style").as_deref(),
            Some("width: 100px; background-image: url(/img/100/b.jpg);")
        );
    }

    #[test]
    fn stylesheet_rules_drive_the_width() {
        let doc = rewrite(
            r#"<style>
                .column { width: 600px; padding: 0 20px }
                .column img { width: 50% }
            </style>
            <div class="column"><img class="proxied" data-src="a.jpg"></div>"#,
        );
        assert_eq!(attr(&doc, "proxied", "src").as_deref(), Some("/img/300/a.jpg"));
    }

    #[test]
    fn auto_width_block_fills_body() {
        let doc = rewrite(r#"<body><div class="proxied" data-bg="wide.png"></div></body>"#);
        assert_eq!(
            attr(&doc, "proxied", "style").as_deref(),
            Some("background-image: url(/img/1264/wide.png);")
        );
    }

    #[test]
    fn narrower_viewport_changes_widths() {
        let mut doc = LiveDocument::parse(
            r#"<div class="proxied" data-bg="wide.png"></div>"#,
            LayoutConfig { viewport_width: 375.0 },
        );
        Rewriter::new(RewriterConfig::default()).unwrap().rewrite(&mut doc).unwrap();
        assert_eq!(
            attr(&doc, "proxied", "style").as_deref(),
            Some("background-image: url(/img/359/wide.png);")
        );
    }

    #[test]
    fn only_exact_class_tokens_are_candidates() {
        let doc = rewrite(
            r#"<img class="hero proxied" data-src="a.jpg" width="10">
               <img class="proxied-lazy" data-src="b.jpg" width="10">
               <img data-src="c.jpg" width="10">"#,
        );
        let html = doc.to_html();
        assert!(html.contains(r#"src="/img/10/a.jpg""#));
        assert!(!html.contains("/img/10/b.jpg"));
        assert!(!html.contains("/img/10/c.jpg"));
    }

    #[test]
    fn absolute_sources_are_appended_verbatim() {
        let doc = rewrite(r#"<img class="proxied" data-src="https://cdn.example.com/a.jpg" width="32">"#);
        assert_eq!(
            attr(&doc, "proxied", "src").as_deref(),
            Some("/img/32/https://cdn.example.com/a.jpg")
        );
    }

    #[test]
    fn serialized_output_carries_rewrites() {
        let doc = rewrite(r#"<p>Intro</p><img class="proxied" data-src="a.jpg" width="64" alt="A &amp; B">"#);
        let html = doc.into_html();
        assert!(html.contains(r#"<img class="proxied" data-src="a.jpg" width="64" alt="A &amp; B" src="/img/64/a.jpg">"#));
    }

    #[test]
    fn second_pass_leaves_the_page_unchanged() {
        let page = concat!(
            r#"<div class="proxied" data-src="a.jpg" data-bg="b.png" style="color: red; width: 100px"></div>"#,
            r#"<img class="proxied" data-src="c.jpg" width="48" style="border: 1px solid">"#,
        );
        let mut doc = LiveDocument::parse(page, LayoutConfig::default());
        let rewriter = Rewriter::new(RewriterConfig::new("img", "proxied")).unwrap();

        rewriter.rewrite(&mut doc).unwrap();
        let first = doc.to_html();
        assert!(first.contains(
            r#"style="color: red; width: 100px; background-image: url(/img/100/b.png);" src="/img/100/a.jpg""#
        ));
        assert!(first.contains(r#"src="/img/50/c.jpg""#));

        rewriter.rewrite(&mut doc).unwrap();
        assert_eq!(doc.to_html(), first);
    }
}

#[cfg(test)]
mod reflow_tests {
    use sizeproxy_engine::{
        DocumentHost, ElementOutcome, ImageProbe, LayoutConfig, LiveDocument, Rewriter,
        RewriterConfig,
    };
    use std::cell::Cell;
    use std::rc::Rc;

    /// Knows only the placeholder; proxied URLs lay out at 0.
    struct PlaceholderProbe;

    impl ImageProbe for PlaceholderProbe {
        fn intrinsic_width(&self, src: &str) -> Option<u32> {
            (src == "placeholder.png").then_some(10)
        }
    }

    const PAGE: &str = r#"<img class="proxied" src="placeholder.png" data-src="a.png" data-bg="b.png">"#;

    #[test]
    fn width_is_read_before_the_source_changes() {
        let mut doc = LiveDocument::parse_with_probe(PAGE, LayoutConfig::default(), Box::new(PlaceholderProbe));
        let el = doc.candidates("proxied").unwrap()[0];

        Rewriter::new(RewriterConfig::default()).unwrap().rewrite(&mut doc).unwrap();

        assert_eq!(doc.attribute(el, "src").unwrap().as_deref(), Some("/img/10/a.png"));
        assert_eq!(
            doc.attribute(el, "style").unwrap().as_deref(),
            Some("background-image: url(/img/10/b.png);")
        );
        // The new source is unknown to the probe, so the element reflowed to 0.
        assert_eq!(doc.rendered_width(el).unwrap(), 0);
    }

    #[test]
    fn plan_matches_rewrite() {
        let rewriter = Rewriter::new(RewriterConfig::default()).unwrap();
        let mut doc = LiveDocument::parse_with_probe(PAGE, LayoutConfig::default(), Box::new(PlaceholderProbe));

        let planned = rewriter.plan(&doc).unwrap();
        let done = rewriter.rewrite(&mut doc).unwrap();

        assert_eq!(planned, done);
        assert!(matches!(&done.outcomes[0], ElementOutcome::Rewritten(plan) if plan.width == 10));
    }

    struct CountingProbe(Rc<Cell<usize>>);

    impl ImageProbe for CountingProbe {
        fn intrinsic_width(&self, src: &str) -> Option<u32> {
            self.0.set(self.0.get() + 1);
            (src == "p.png").then_some(10)
        }
    }

    #[test]
    fn many_candidates_read_each_image_once() {
        let page: String = (0..200)
            .map(|i| format!(r#"<img class="proxied" src="p.png" data-src="a{i}.jpg">"#))
            .collect();
        let calls = Rc::new(Cell::new(0));
        let mut doc = LiveDocument::parse_with_probe(
            &page,
            LayoutConfig::default(),
            Box::new(CountingProbe(calls.clone())),
        );

        let report = Rewriter::new(RewriterConfig::default()).unwrap().rewrite(&mut doc).unwrap();

        assert_eq!(report.rewritten_count(), 200);
        // The placeholder once, then each rewritten source once.
        assert!(calls.get() <= 201, "looked up {} times", calls.get());
        let last = doc.candidates("proxied").unwrap()[199];
        assert_eq!(doc.attribute(last, "src").unwrap().as_deref(), Some("/img/10/a199.jpg"));
    }
}

#[cfg(test)]
mod file_probe_tests {
    use sizeproxy_engine::{load_document, FileProbe, LiveDocument, NetworkConfig, Rewriter, RewriterConfig};

    #[test]
    fn intrinsic_size_comes_from_the_image_file() {
        let dir = tempfile::tempdir().unwrap();
        image::RgbaImage::new(50, 20).save(dir.path().join("thumb.png")).unwrap();
        let page = dir.path().join("index.html");
        std::fs::write(&page, r#"<img class="proxied" src="thumb.png" data-bg="b.png">"#).unwrap();

        let loaded = load_document(page.to_str().unwrap(), &NetworkConfig::default()).unwrap();
        let base_dir = loaded.base_dir.clone().unwrap();
        let mut doc = LiveDocument::parse_with_probe(&loaded.html, Default::default(), Box::new(FileProbe::new(base_dir)));
        Rewriter::new(RewriterConfig::default()).unwrap().rewrite(&mut doc).unwrap();

        assert!(doc.to_html().contains(r#"style="background-image: url(/img/50/b.png);""#));
    }
}
