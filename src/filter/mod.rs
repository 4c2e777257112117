//! Allowlist filtering
//!
//! The allowlist file names the channels allowed to survive, one per line:
//! id-shaped entries (`La1.TDT`, `la-1.es`) match channel ids, anything else
//! (`La 1 HD`) matches display-names case-insensitively. Channels not on the
//! list are removed along with every programme referencing them.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;
use tracing::info;

use crate::errors::PipelineError;
use crate::xmltv::Document;

/// Entries without spaces or punctuation beyond id characters are channel
/// ids; everything else is a display-name.
static ID_SHAPED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.:-]+$").expect("static regex"));

/// Counters for the run log
#[derive(Debug, Default, Clone, Copy)]
pub struct FilterReport {
    pub channels_kept: usize,
    pub channels_dropped: usize,
    pub programmes_kept: usize,
    pub programmes_dropped: usize,
}

/// Parsed allowlist: ids matched exactly, names case-insensitively
#[derive(Debug, Clone, Default)]
pub struct Allowlist {
    ids: HashSet<String>,
    names: HashSet<String>,
}

impl Allowlist {
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| PipelineError::input_not_found(path, e))?;
        Ok(Self::parse(&contents))
    }

    /// One entry per line; blanks and `#` comments are skipped.
    pub fn parse(contents: &str) -> Self {
        let mut allowlist = Self::default();
        for line in contents.lines() {
            let entry = line.trim();
            if entry.is_empty() || entry.starts_with('#') {
                continue;
            }
            if ID_SHAPED.is_match(entry) {
                allowlist.ids.insert(entry.to_string());
            } else {
                allowlist.names.insert(entry.to_lowercase());
            }
        }
        allowlist
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.names.is_empty()
    }

    /// Drop non-allowed channels and the programmes referencing them.
    pub fn apply(&self, doc: &mut Document) -> FilterReport {
        let mut report = FilterReport::default();

        // Resolve name entries against the document's display-names so
        // programme channel references can be checked by id alone
        let mut allowed_ids: HashSet<String> = self.ids.clone();
        let mut name_to_id: HashMap<String, String> = HashMap::new();
        for channel in doc.channels() {
            let Some(id) = channel.attr("id") else {
                continue;
            };
            for display_name in channel.elements().filter(|el| el.name == "display-name") {
                name_to_id.insert(display_name.text().trim().to_lowercase(), id.to_string());
            }
        }
        for name in &self.names {
            if let Some(id) = name_to_id.get(name) {
                allowed_ids.insert(id.clone());
            }
        }

        doc.root.children.retain(|node| {
            let Some(el) = node.as_element() else {
                return true;
            };
            match el.name.as_str() {
                "channel" => {
                    let keep = el.attr("id").is_some_and(|id| allowed_ids.contains(id));
                    if keep {
                        report.channels_kept += 1;
                    } else {
                        report.channels_dropped += 1;
                    }
                    keep
                }
                "programme" => {
                    let keep = el
                        .attr("channel")
                        .is_some_and(|id| allowed_ids.contains(id));
                    if keep {
                        report.programmes_kept += 1;
                    } else {
                        report.programmes_dropped += 1;
                    }
                    keep
                }
                _ => true,
            }
        });

        info!(
            "allowlist kept {} channels ({} dropped), {} programmes ({} dropped)",
            report.channels_kept,
            report.channels_dropped,
            report.programmes_kept,
            report.programmes_dropped
        );
        report
    }
}
