use anyhow::{Context, Result};
use engine::{
    load_document, DocumentHost, ElementOutcome, FileProbe, ImageProbe, LiveDocument,
    LoadedDocument, NetworkConfig, NoProbe, NodeId, ProxyUrl, RewriteReport, Rewriter,
    RewriterConfig, SizeproxyConfig,
};
use std::io::{Read, Write};
use std::path::Path;

use super::Overrides;

pub(super) fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<SizeproxyConfig> {
    let mut config = match path {
        Some(path) => SizeproxyConfig::load(path)?,
        None => SizeproxyConfig::default(),
    };
    if let Some(proxy_id) = &overrides.proxy_id {
        config.rewriter.proxy_id = proxy_id.clone();
    }
    if let Some(marker_class) = &overrides.marker_class {
        config.rewriter.marker_class = marker_class.clone();
    }
    if let Some(width) = overrides.viewport_width {
        config.layout.viewport_width = width;
    }
    config.validate().context("invalid configuration")?;
    tracing::debug!(?config, "effective config");
    Ok(config)
}

/// `-` reads stdin and resolves images against the working directory.
pub(super) fn read_input(input: &str, network: &NetworkConfig) -> Result<LoadedDocument> {
    if input == "-" {
        let mut html = String::new();
        std::io::stdin()
            .read_to_string(&mut html)
            .context("failed to read stdin")?;
        let base_dir = std::env::current_dir().ok();
        return Ok(LoadedDocument { html, base_dir });
    }
    load_document(input, network).with_context(|| format!("failed to load {}", input))
}

pub(super) fn open_document(loaded: &LoadedDocument, config: &SizeproxyConfig) -> LiveDocument {
    let probe: Box<dyn ImageProbe> = match &loaded.base_dir {
        Some(dir) => Box::new(FileProbe::new(dir)),
        None => Box::new(NoProbe),
    };
    LiveDocument::parse_with_probe(&loaded.html, config.layout.layout_config(), probe)
}

pub(super) fn rewrite_html(
    loaded: &LoadedDocument,
    config: &SizeproxyConfig,
) -> Result<(String, RewriteReport<NodeId>)> {
    let rewriter = Rewriter::new(config.rewriter.clone())?;
    let mut doc = open_document(loaded, config);
    let report = rewriter.rewrite(&mut doc)?;
    Ok((doc.into_html(), report))
}

pub fn run_rewrite(
    config_path: Option<&Path>,
    overrides: &Overrides,
    input: &str,
    output: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let loaded = read_input(input, &config.network)?;
    let (html, report) = rewrite_html(&loaded, &config)?;

    match output {
        Some(path) => {
            std::fs::write(path, html)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(
                path = %path.display(),
                rewritten = report.rewritten_count(),
                "wrote page"
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(html.as_bytes()).context("failed to write stdout")?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// One line per candidate: `<node> <width> <src|-> <bg|->`, `<node> skip`
/// or `<node> error <message>`.
pub(super) fn plan_lines(report: &RewriteReport<NodeId>) -> Vec<String> {
    let or_dash = |url: Option<String>| url.unwrap_or_else(|| "-".to_string());
    report
        .outcomes
        .iter()
        .map(|outcome| match outcome {
            ElementOutcome::Rewritten(plan) => format!(
                "{} {} {} {}",
                plan.element,
                plan.width,
                or_dash(plan.source.as_ref().map(ToString::to_string)),
                or_dash(plan.background.as_ref().map(ProxyUrl::css_url)),
            ),
            ElementOutcome::Skipped(element) => format!("{} skip", element),
            ElementOutcome::Failed(element, error) => format!("{} error {}", element, error),
        })
        .collect()
}

pub(super) fn plan_document(
    doc: &impl DocumentHost<Element = NodeId>,
    config: &SizeproxyConfig,
) -> Result<Vec<String>> {
    let rewriter = Rewriter::new(config.rewriter.clone())?;
    Ok(plan_lines(&rewriter.plan(doc)?))
}

pub fn run_plan(config_path: Option<&Path>, overrides: &Overrides, input: &str) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let loaded = read_input(input, &config.network)?;
    let doc = open_document(&loaded, &config);

    let mut stdout = std::io::stdout().lock();
    for line in plan_document(&doc, &config)? {
        writeln!(stdout, "{}", line)?;
    }
    Ok(())
}

pub(super) fn proxy_url(proxy_id: &str, width: u32, source: &str) -> Result<ProxyUrl> {
    let config = RewriterConfig {
        proxy_id: proxy_id.to_string(),
        ..RewriterConfig::default()
    };
    config.validate().context("invalid proxy id")?;
    Ok(ProxyUrl::new(proxy_id, width, source))
}

pub fn run_url(proxy_id: &str, width: u32, source: &str) -> Result<()> {
    println!("{}", proxy_url(proxy_id, width, source)?);
    Ok(())
}
