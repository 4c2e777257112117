//! Description splitting
//!
//! Source descriptions pack several things into one text block: a first line
//! of `|`-separated tokens (genre, year, age rating, score), middle-dot
//! bullet lines with labelled fields, and the actual synopsis. This stage
//! separates the three without interpreting any of them.

/// Bullet markers seen in the wild; both strip to the same thing
const BULLET_MARKERS: [char; 2] = ['·', '•'];

/// A description split into its three layers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitDescription {
    /// Remaining prose, space-joined
    pub synopsis: String,
    /// First non-empty line, usually packed metadata tokens
    pub header: String,
    /// Bullet lines with the marker stripped, in source order
    pub bullets: Vec<String>,
}

impl SplitDescription {
    /// True when the splitter found any structure worth acting on
    pub fn has_metadata_lines(&self) -> bool {
        !self.bullets.is_empty()
    }
}

/// Split a raw `desc` text into synopsis, header and bullet lines.
///
/// Lines are split on any terminator convention, whitespace runs collapsed,
/// empties dropped. An empty or whitespace-only input yields an empty split.
pub fn split_description(raw: &str) -> SplitDescription {
    let mut split = SplitDescription::default();

    for line in raw.split(['\r', '\n']) {
        let line = normalize_whitespace(line);
        if line.is_empty() {
            continue;
        }

        if split.header.is_empty() {
            split.header = line;
            continue;
        }

        if let Some(marker_stripped) = strip_bullet_marker(&line) {
            split.bullets.push(marker_stripped.to_string());
            continue;
        }

        if !split.synopsis.is_empty() {
            split.synopsis.push(' ');
        }
        split.synopsis.push_str(&line);
    }

    split
}

fn normalize_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_bullet_marker(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(BULLET_MARKERS)?;
    Some(rest.trim_start())
}
