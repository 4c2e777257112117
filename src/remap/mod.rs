//! Channel identity remapping
//!
//! The channel map file carries `old-id,new-id[,logo-url]` lines. When a map
//! is present it doubles as a selection: only mapped channels (and their
//! programmes) survive, renamed to the canonical id with the display-name
//! canonicalized and the logo injected. An empty or missing map passes the
//! document through untouched.
//!
//! Remapping runs BEFORE enrichment so the identity hash sees canonical
//! channel ids — that is what lets the same broadcast from two feeds
//! collapse onto one identifier.

use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::errors::PipelineError;
use crate::xmltv::{Document, Element};

#[derive(Debug, Clone)]
struct MapEntry {
    new_id: String,
    logo: Option<String>,
}

/// Parsed channel map, keyed by source channel id
#[derive(Debug, Clone, Default)]
pub struct ChannelMap {
    entries: HashMap<String, MapEntry>,
}

impl ChannelMap {
    /// Load from the mapping file; a missing file yields an empty
    /// (pass-through) map, an unreadable one is an error.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        if !path.exists() {
            info!("no channel map at {}, passing channels through", path.display());
            return Ok(Self::default());
        }
        let contents =
            std::fs::read_to_string(path).map_err(|e| PipelineError::input_not_found(path, e))?;
        Ok(Self::parse(&contents))
    }

    /// Parse `old,new[,logo]` lines; blanks and `#` comments are skipped.
    pub fn parse(contents: &str) -> Self {
        let mut entries = HashMap::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.splitn(3, ',').map(str::trim);
            let (Some(old), Some(new)) = (parts.next(), parts.next()) else {
                warn!("skipping channel map line without a target id: {line}");
                continue;
            };
            if old.is_empty() || new.is_empty() {
                warn!("skipping incomplete channel map line: {line}");
                continue;
            }
            let logo = parts.next().filter(|l| !l.is_empty()).map(str::to_string);
            entries.insert(
                old.to_string(),
                MapEntry {
                    new_id: new.to_string(),
                    logo,
                },
            );
        }
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply the map: rename and reshape mapped channels, rewrite programme
    /// channel references, and drop everything unmapped. Pass-through when
    /// the map is empty.
    pub fn apply(&self, doc: &mut Document) {
        if self.is_empty() {
            return;
        }

        let before_channels = doc.channel_count();
        let before_programmes = doc.programme_count();

        doc.root.children.retain(|node| {
            let Some(el) = node.as_element() else {
                return true;
            };
            match el.name.as_str() {
                "channel" => el.attr("id").is_some_and(|id| self.entries.contains_key(id)),
                "programme" => el
                    .attr("channel")
                    .is_some_and(|id| self.entries.contains_key(id)),
                _ => true,
            }
        });

        for channel in doc.channels_mut() {
            let Some(entry) = channel.attr("id").and_then(|id| self.entries.get(id)) else {
                continue;
            };
            let entry = entry.clone();
            channel.set_attr("id", &entry.new_id);
            canonicalize_display_name(channel, &entry.new_id);
            if let Some(logo) = &entry.logo {
                if !channel.has_child("icon") {
                    channel.push_element(Element::new("icon").with_attr("src", logo));
                }
            }
        }

        for programme in doc.programmes_mut() {
            if let Some(entry) = programme.attr("channel").and_then(|id| self.entries.get(id)) {
                let new_id = entry.new_id.clone();
                programme.set_attr("channel", &new_id);
            }
        }

        info!(
            "channel remap kept {}/{} channels, {}/{} programmes",
            doc.channel_count(),
            before_channels,
            doc.programme_count(),
            before_programmes
        );
    }
}

/// The canonical name leads the display-name list; other names survive
/// behind it.
fn canonicalize_display_name(channel: &mut Element, name: &str) {
    let already_first = channel
        .elements()
        .find(|el| el.name == "display-name")
        .is_some_and(|el| el.text() == name);
    if !already_first {
        channel.insert_element(0, Element::new("display-name").with_text(name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xmltv::parse_document;

    fn sample_doc() -> Document {
        parse_document(
            r#"<tv>
  <channel id="la1.feedA"><display-name>La 1 HD</display-name></channel>
  <channel id="other.feedA"><display-name>Other</display-name></channel>
  <programme channel="la1.feedA" start="1"><title>A</title></programme>
  <programme channel="other.feedA" start="1"><title>B</title></programme>
</tv>"#,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let map = ChannelMap::parse("# mapping\n\nla1.feedA,La 1,https://logos.test/la1.png\n");
        assert!(!map.is_empty());
        assert_eq!(map.entries.len(), 1);
    }

    #[test]
    fn test_mapped_channel_is_renamed_and_logo_injected() {
        let map = ChannelMap::parse("la1.feedA,La 1,https://logos.test/la1.png");
        let mut doc = sample_doc();
        map.apply(&mut doc);

        assert_eq!(doc.channel_count(), 1);
        let channel = doc.channels().next().unwrap();
        assert_eq!(channel.attr("id"), Some("La 1"));
        let first_name = channel
            .elements()
            .find(|el| el.name == "display-name")
            .unwrap();
        assert_eq!(first_name.text(), "La 1");
        assert_eq!(
            channel.child("icon").unwrap().attr("src"),
            Some("https://logos.test/la1.png")
        );
    }

    #[test]
    fn test_unmapped_channels_and_programmes_dropped() {
        let map = ChannelMap::parse("la1.feedA,La 1");
        let mut doc = sample_doc();
        map.apply(&mut doc);

        assert_eq!(doc.channel_count(), 1);
        assert_eq!(doc.programme_count(), 1);
        let prog = doc.programmes().next().unwrap();
        assert_eq!(prog.attr("channel"), Some("La 1"));
        assert_eq!(prog.child("title").unwrap().text(), "A");
    }

    #[test]
    fn test_empty_map_passes_through() {
        let map = ChannelMap::parse("# nothing mapped\n");
        let mut doc = sample_doc();
        map.apply(&mut doc);
        assert_eq!(doc.channel_count(), 2);
        assert_eq!(doc.programme_count(), 2);
    }

    #[test]
    fn test_apply_is_idempotent() {
        // An id-stable mapping applied twice changes nothing on the second
        // pass: the display-name is already canonical and the icon exists
        let map = ChannelMap::parse("la1.feedA,La 1,https://logos.test/la1.png");
        let mut doc = sample_doc();
        map.apply(&mut doc);
        let once = crate::xmltv::serialize(&doc);

        let stable = ChannelMap::parse("La 1,La 1,https://logos.test/la1.png");
        stable.apply(&mut doc);
        assert_eq!(crate::xmltv::serialize(&doc), once);
    }

    #[test]
    fn test_load_missing_file_is_pass_through() {
        let map = ChannelMap::load(Path::new("/nonexistent/canales.txt")).unwrap();
        assert!(map.is_empty());
    }
}
