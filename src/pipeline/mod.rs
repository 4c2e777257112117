//! Pipeline driver
//!
//! Connects the stages as pure document-to-document functions:
//! fetch → sanitize → load → merge → remap → dedupe → enrich → filter →
//! assemble → write. Nothing is written until the whole output document has
//! been built in memory, so a failing run never leaves a partial file
//! behind.

use chrono::Utc;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use crate::config::Config;
use crate::enrich::{EnrichReport, Enricher};
use crate::errors::PipelineError;
use crate::filter::Allowlist;
use crate::remap::ChannelMap;
use crate::sources::{read_source_list, FeedFetcher};
use crate::xmltv::{parse_document, sanitize, writer::write_document, Document, XmlNode};

const GENERATOR_URL: &str = "https://github.com/jmylchreest/epg-forge";

/// Outcome of a full batch run
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchReport {
    pub sources_loaded: usize,
    pub sources_failed: usize,
    pub channels: usize,
    pub programmes: usize,
}

/// Sanitize and load one raw feed text into a document tree.
pub fn load_feed(raw: &str) -> Result<Document, PipelineError> {
    parse_document(&sanitize(raw))
}

/// The `transform` surface: one input file through sanitize + load +
/// enrichment, written to the destination.
pub fn transform_file(
    config: &Config,
    input: &Path,
    output: &Path,
) -> Result<EnrichReport, PipelineError> {
    let raw =
        std::fs::read_to_string(input).map_err(|e| PipelineError::input_not_found(input, e))?;
    let mut doc = load_feed(&raw)?;

    let report = Enricher::new(&config.pipeline).enrich_document(&mut doc);
    info!(
        "enriched {} programmes ({} identifiers added)",
        report.programmes, report.uids_added
    );

    write_document(&doc, output)?;
    Ok(report)
}

/// The `filter` surface: allowlist filtering alone.
pub fn filter_file(
    input: &Path,
    allowlist_path: &Path,
    output: &Path,
) -> Result<(), PipelineError> {
    let raw =
        std::fs::read_to_string(input).map_err(|e| PipelineError::input_not_found(input, e))?;
    let mut doc = load_feed(&raw)?;

    let allowlist = Allowlist::load(allowlist_path)?;
    allowlist.apply(&mut doc);

    write_document(&doc, output)
}

/// The full batch: every configured source, consolidated into one guide.
pub async fn run_batch(config: &Config) -> Result<BatchReport, PipelineError> {
    let sources = read_source_list(&config.paths.sources_file)?;
    info!("{} sources listed in {}", sources.len(), config.paths.sources_file.display());

    let fetcher = FeedFetcher::new(&config.fetch);
    let mut report = BatchReport::default();
    let mut documents = Vec::new();

    for source in &sources {
        match fetch_and_load(&fetcher, source).await {
            Ok(doc) => {
                info!(
                    "source {} contributed {} channels, {} programmes",
                    source,
                    doc.channel_count(),
                    doc.programme_count()
                );
                report.sources_loaded += 1;
                documents.push(doc);
            }
            Err(e) => {
                warn!("skipping source {source}: {e}");
                report.sources_failed += 1;
            }
        }
    }

    let mut merged = merge_documents(documents);

    let channel_map = ChannelMap::load(&config.paths.channel_map_file)?;
    channel_map.apply(&mut merged);

    dedupe_top_level(&mut merged);

    if merged.programme_count() == 0 && !config.pipeline.allow_empty {
        return Err(PipelineError::EmptyBatch);
    }

    let enrich_report = Enricher::new(&config.pipeline).enrich_document(&mut merged);
    info!(
        "enriched {} programmes ({} identifiers added)",
        enrich_report.programmes, enrich_report.uids_added
    );

    if let Some(allowlist_path) = &config.paths.allowlist_file {
        Allowlist::load(allowlist_path)?.apply(&mut merged);
    }

    stamp_generator(&mut merged);

    report.channels = merged.channel_count();
    report.programmes = merged.programme_count();
    write_document(&merged, &config.paths.output)?;

    info!(
        "wrote {}: {} channels, {} programmes",
        config.paths.output.display(),
        report.channels,
        report.programmes
    );
    Ok(report)
}

async fn fetch_and_load(fetcher: &FeedFetcher, source: &str) -> Result<Document, PipelineError> {
    let raw = fetcher.fetch(source).await?;
    load_feed(&raw)
}

/// Collect every channel, then every programme, preserving order of arrival.
pub fn merge_documents(documents: Vec<Document>) -> Document {
    let mut merged = Document::new();
    let mut programmes = Vec::new();

    for doc in documents {
        for node in doc.root.children {
            let XmlNode::Element(el) = node else { continue };
            match el.name.as_str() {
                "channel" => merged.root.push_element(el),
                "programme" => programmes.push(el),
                _ => {}
            }
        }
    }
    for programme in programmes {
        merged.root.push_element(programme);
    }
    merged
}

/// Drop structurally identical channel/programme elements, keeping the
/// first occurrence. Overlapping feeds routinely serve the same block.
pub fn dedupe_top_level(doc: &mut Document) {
    let mut seen: HashSet<XmlNode> = HashSet::new();
    let before = doc.root.children.len();
    doc.root.children.retain(|node| {
        let is_entry = node
            .as_element()
            .map(|el| el.name == "channel" || el.name == "programme")
            .unwrap_or(false);
        if !is_entry {
            return true;
        }
        seen.insert(node.clone())
    });
    let dropped = before - doc.root.children.len();
    if dropped > 0 {
        info!("dropped {dropped} duplicate blocks");
    }
}

/// Stamp the output root the way downstream consumers expect.
fn stamp_generator(doc: &mut Document) {
    let stamp = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    doc.root
        .set_attr("generator-info-name", &format!("epg-forge {stamp}"));
    doc.root.set_attr("generator-info-url", GENERATOR_URL);
}
