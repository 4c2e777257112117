//! Field extraction from header tokens and bullet lines
//!
//! All extraction is data-driven: the header fields and the bullet labels
//! are ordered (pattern → field) tables evaluated first-match-wins, so new
//! label variants are one table row, not new control flow. A token or bullet
//! matching nothing is silently dropped; partial enrichment beats aborting
//! on inconsistent feed text.

use regex::Regex;
use std::sync::LazyLock;

/// Header token delimiters: pipes between tokens, middle dots occasionally
const HEADER_DELIMITERS: [char; 2] = ['|', '·'];

/// Age rating: the exemption literal or a 1-2 digit age, optional `+` prefix
static RATING_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?(TP|\d{1,2})$").expect("static regex"));

/// Review score shaped `*7/10` or `*7.5/10`, stored without the star
static STAR_RATING_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*(\d{1,2}(?:\.\d+)?/10)$").expect("static regex"));

/// Exactly four digits
static YEAR_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}$").expect("static regex"));

/// Structured fields recovered from one description
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub rating: Option<String>,
    pub star_rating: Option<String>,
    pub year: Option<String>,
    pub country: Option<String>,
    pub presenters: Vec<String>,
    pub directors: Vec<String>,
    pub actors: Vec<String>,
    pub composers: Vec<String>,
    pub icon: Option<String>,
}

impl ExtractedFields {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// At least one credited person in any role
    pub fn has_credits(&self) -> bool {
        !self.presenters.is_empty()
            || !self.directors.is_empty()
            || !self.actors.is_empty()
            || !self.composers.is_empty()
    }
}

/// Which field a bullet rule feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BulletField {
    Country,
    Presenters,
    Directors,
    Actors,
    Composers,
    Icon,
}

/// The ordered bullet rule table. Labels are anchored and must match the
/// whole text up to the colon, so `Director de fotografía:` matches nothing
/// rather than being misfiled under the director rule.
static BULLET_RULES: LazyLock<Vec<(BulletField, Regex)>> = LazyLock::new(|| {
    [
        (BulletField::Country, r"^(?i)pa[ií]s\s*:\s*(.+)$"),
        (
            BulletField::Presenters,
            r"^(?i)presenta(?:dor(?:es|a)?)?\s*:\s*(.+)$",
        ),
        (
            BulletField::Directors,
            r"^(?i)(?:direcci[oó]n|directora?)\s*:\s*(.+)$",
        ),
        (
            BulletField::Actors,
            r"^(?i)(?:reparto|actor(?:es)?)\s*:\s*(.+)$",
        ),
        (BulletField::Composers, r"^(?i)m[uú]sica\s*:\s*(.+)$"),
        (BulletField::Icon, r"^(?i)icono?\s*:\s*(.+)$"),
    ]
    .into_iter()
    .map(|(field, pattern)| (field, Regex::new(pattern).expect("static regex")))
    .collect()
});

/// Run the header tokens and bullet lines through the rule tables.
pub fn extract_fields(header: &str, bullets: &[String]) -> ExtractedFields {
    let mut fields = ExtractedFields::default();
    extract_header_tokens(header, &mut fields);
    for bullet in bullets {
        apply_bullet(bullet, &mut fields);
    }
    fields
}

/// Header-level extraction: each field independently takes the first token
/// that matches its shape.
fn extract_header_tokens(header: &str, fields: &mut ExtractedFields) {
    for token in header
        .split(HEADER_DELIMITERS)
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        if fields.rating.is_none() {
            if let Some(caps) = RATING_TOKEN.captures(token) {
                fields.rating = Some(caps[1].to_string());
                continue;
            }
        }
        if fields.star_rating.is_none() {
            if let Some(caps) = STAR_RATING_TOKEN.captures(token) {
                fields.star_rating = Some(caps[1].to_string());
                continue;
            }
        }
        if fields.year.is_none() && YEAR_TOKEN.is_match(token) {
            fields.year = Some(token.to_string());
        }
    }
}

/// First matching rule wins per bullet; unmatched bullets are dropped.
fn apply_bullet(bullet: &str, fields: &mut ExtractedFields) {
    for (field, pattern) in BULLET_RULES.iter() {
        let Some(caps) = pattern.captures(bullet) else {
            continue;
        };
        let value = caps[1].trim();
        match field {
            BulletField::Country => {
                if fields.country.is_none() {
                    fields.country = Some(value.to_string());
                }
            }
            BulletField::Presenters => fields.presenters.extend(split_names(value)),
            BulletField::Directors => fields.directors.extend(split_names(value)),
            BulletField::Actors => fields.actors.extend(split_names(value)),
            BulletField::Composers => fields.composers.extend(split_names(value)),
            BulletField::Icon => {
                if fields.icon.is_none() && is_http_url(value) {
                    fields.icon = Some(value.to_string());
                }
            }
        }
        return;
    }
}

fn split_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}
