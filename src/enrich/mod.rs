//! Per-programme enrichment
//!
//! Walks every programme in a document and (a) assigns a stable
//! content-derived identifier, (b) splits the packed description into a
//! clean synopsis plus structured fields, (c) normalizes the category onto
//! the fixed taxonomy, and (d) writes the results back as canonical XMLTV
//! elements. Every writer checks for an existing element first, so running
//! the enrichment over already-enriched output changes nothing.

pub mod category;
pub mod description;
pub mod extract;
pub mod identity;

use tracing::debug;

use crate::config::PipelineConfig;
use crate::xmltv::{Document, Element};
use category::normalize_category;
use description::split_description;
use extract::{extract_fields, ExtractedFields};
use identity::{programme_uid, uid_system};

/// Counters for the run log
#[derive(Debug, Default, Clone, Copy)]
pub struct EnrichReport {
    pub programmes: usize,
    pub uids_added: usize,
}

/// The enrichment engine; configuration is taken explicitly, never from
/// ambient process state.
pub struct Enricher {
    country: String,
    namespace: String,
    rating_system: String,
    uid_system: String,
}

impl Enricher {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            country: config.country.clone(),
            namespace: config.uid_namespace.clone(),
            rating_system: config.rating_system.clone(),
            uid_system: uid_system(&config.uid_namespace),
        }
    }

    /// Enrich every programme in the document, in document order.
    pub fn enrich_document(&self, doc: &mut Document) -> EnrichReport {
        let mut report = EnrichReport::default();
        for programme in doc.programmes_mut() {
            report.programmes += 1;
            if self.assign_uid(programme) {
                report.uids_added += 1;
            }
            self.enrich_from_description(programme);
        }
        report
    }

    /// Inject the identifier element unless the programme already carries
    /// one of this scheme. Returns whether an element was added.
    fn assign_uid(&self, programme: &mut Element) -> bool {
        let already_assigned = programme
            .elements()
            .any(|el| el.name == "episode-num" && el.attr("system") == Some(&self.uid_system));
        if already_assigned {
            return false;
        }

        let channel = programme.attr("channel").unwrap_or_default().to_string();
        let start = programme.attr("start").unwrap_or_default().to_string();
        let title = programme
            .child("title")
            .map(|el| el.text())
            .unwrap_or_default();

        let uid = programme_uid(&self.namespace, &self.country, &channel, &start, &title);
        let element = Element::new("episode-num")
            .with_attr("system", &self.uid_system)
            .with_text(&uid);

        // After sub-title if present, else after title, else last
        let index = programme
            .position_of("sub-title")
            .or_else(|| programme.position_of("title"))
            .map(|at| at + 1)
            .unwrap_or(programme.children.len());
        programme.insert_element(index, element);
        debug!(%uid, %channel, "assigned programme identifier");
        true
    }

    /// Split the description, extract fields, and write everything back.
    fn enrich_from_description(&self, programme: &mut Element) {
        let raw_desc = programme
            .child("desc")
            .map(|el| el.text())
            .unwrap_or_default();
        let split = split_description(&raw_desc);
        let fields = extract_fields(&split.header, &split.bullets);

        // The header only counts as recognized metadata when something was
        // actually extracted from it; prose-only descriptions pass through
        // untouched.
        let recognized = split.has_metadata_lines()
            || fields.rating.is_some()
            || fields.star_rating.is_some()
            || fields.year.is_some();

        if recognized && !split.synopsis.is_empty() {
            if let Some(desc) = programme.child_mut("desc") {
                desc.set_text(&split.synopsis);
            }
        }

        self.rewrite_category(programme, &split.header);
        self.apply_fields(programme, &fields);
    }

    /// Category has exactly one occurrence by XMLTV convention and is always
    /// rewritten to its canonical form; created when absent.
    fn rewrite_category(&self, programme: &mut Element, header: &str) {
        match programme.child_mut("category") {
            Some(existing) => {
                let raw = existing.text();
                let source = if raw.trim().is_empty() { header } else { &raw };
                existing.set_text(normalize_category(source));
            }
            None => {
                let element = Element::new("category")
                    .with_attr("lang", "es")
                    .with_text(normalize_category(header));
                programme.push_element(element);
            }
        }
    }

    /// Write extracted fields as canonical elements, each gated on absence.
    fn apply_fields(&self, programme: &mut Element, fields: &ExtractedFields) {
        if let Some(year) = &fields.year {
            ensure_child(programme, "date", || Element::new("date").with_text(year));
        }
        if let Some(country) = &fields.country {
            ensure_child(programme, "country", || {
                Element::new("country").with_text(country)
            });
        }
        if let Some(rating) = &fields.rating {
            ensure_child(programme, "rating", || {
                let mut el = Element::new("rating").with_attr("system", &self.rating_system);
                el.push_element(Element::new("value").with_text(rating));
                el
            });
        }
        if let Some(star) = &fields.star_rating {
            ensure_child(programme, "star-rating", || {
                let mut el = Element::new("star-rating");
                el.push_element(Element::new("value").with_text(star));
                el
            });
        }
        if fields.has_credits() {
            ensure_child(programme, "credits", || build_credits(fields));
        }
        if let Some(icon) = &fields.icon {
            ensure_child(programme, "icon", || {
                Element::new("icon").with_attr("src", icon)
            });
        }
    }
}

/// Insert-if-absent primitive shared by every field writer: query once,
/// build only when missing.
fn ensure_child(parent: &mut Element, name: &str, build: impl FnOnce() -> Element) {
    if !parent.has_child(name) {
        parent.push_element(build());
    }
}

/// Credited people in fixed role order, one child per name.
fn build_credits(fields: &ExtractedFields) -> Element {
    let mut credits = Element::new("credits");
    let roles: [(&str, &[String]); 4] = [
        ("presenter", &fields.presenters),
        ("director", &fields.directors),
        ("actor", &fields.actors),
        ("composer", &fields.composers),
    ];
    for (role, names) in roles {
        for name in names {
            credits.push_element(Element::new(role).with_text(name));
        }
    }
    credits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xmltv::{parse_document, serialize};

    fn enricher() -> Enricher {
        Enricher::new(&crate::config::Config::default().pipeline)
    }

    fn programme_doc(desc: &str) -> Document {
        let xml = format!(
            "<tv><programme channel=\"tve1\" start=\"20240115220000 +0100\" stop=\"20240115230000 +0100\">\
             <title>La serie</title><desc>{desc}</desc></programme></tv>"
        );
        parse_document(&xml).unwrap()
    }

    #[test]
    fn test_structured_description_fully_extracted() {
        let mut doc = programme_doc(
            "Serie | 2021 | TP | *7.5/10\n· País: España\n· Reparto: Ana, Luis\nLa trama continúa.",
        );
        enricher().enrich_document(&mut doc);

        let prog = doc.programmes().next().unwrap();
        assert_eq!(prog.child("desc").unwrap().text(), "La trama continúa.");
        assert_eq!(prog.child("category").unwrap().text(), "Series");
        assert_eq!(prog.child("date").unwrap().text(), "2021");
        assert_eq!(prog.child("country").unwrap().text(), "España");

        let rating = prog.child("rating").unwrap();
        assert_eq!(rating.attr("system"), Some("ES"));
        assert_eq!(rating.child("value").unwrap().text(), "TP");

        let star = prog.child("star-rating").unwrap();
        assert_eq!(star.child("value").unwrap().text(), "7.5/10");

        let credits = prog.child("credits").unwrap();
        let cast: Vec<(String, String)> = credits
            .elements()
            .map(|el| (el.name.clone(), el.text()))
            .collect();
        assert_eq!(
            cast,
            vec![
                ("actor".to_string(), "Ana".to_string()),
                ("actor".to_string(), "Luis".to_string())
            ]
        );
    }

    #[test]
    fn test_unstructured_description_left_untouched() {
        let mut doc = programme_doc("Un reportaje sin estructura especial.");
        enricher().enrich_document(&mut doc);

        let prog = doc.programmes().next().unwrap();
        assert_eq!(
            prog.child("desc").unwrap().text(),
            "Un reportaje sin estructura especial."
        );
        assert!(prog.child("date").is_none());
        assert!(prog.child("rating").is_none());
        assert!(prog.child("star-rating").is_none());
        assert!(prog.child("country").is_none());
        assert!(prog.child("credits").is_none());
        // category is still always present, via the fallback
        assert_eq!(prog.child("category").unwrap().text(), "Documentales");
    }

    #[test]
    fn test_no_credits_element_without_credit_bullets() {
        let mut doc = programme_doc("Cine | 1999\n· País: Francia\nUn clásico.");
        enricher().enrich_document(&mut doc);
        let prog = doc.programmes().next().unwrap();
        assert!(prog.child("credits").is_none());
        assert_eq!(prog.child("country").unwrap().text(), "Francia");
    }

    #[test]
    fn test_enrichment_is_idempotent() {
        let mut doc = programme_doc(
            "Serie | 2021 | TP | *7.5/10\n· País: España\n· Reparto: Ana, Luis\nLa trama continúa.",
        );
        let engine = enricher();
        engine.enrich_document(&mut doc);
        let first = serialize(&doc);

        engine.enrich_document(&mut doc);
        let second = serialize(&doc);
        assert_eq!(first, second);

        // No duplicate identifier elements on the second pass
        let prog = doc.programmes().next().unwrap();
        let uid_count = prog
            .elements()
            .filter(|el| el.name == "episode-num" && el.attr("system") == Some("epgforge-uid"))
            .count();
        assert_eq!(uid_count, 1);
    }

    #[test]
    fn test_uid_inserted_after_title() {
        let mut doc = programme_doc("Cine");
        enricher().enrich_document(&mut doc);
        let prog = doc.programmes().next().unwrap();
        assert_eq!(prog.position_of("episode-num"), Some(1));
        let uid = prog.child("episode-num").unwrap();
        assert_eq!(uid.attr("system"), Some("epgforge-uid"));
        assert!(uid.text().starts_with("epgforge:es:"));
    }

    #[test]
    fn test_uid_inserted_after_sub_title_when_present() {
        let mut doc = parse_document(
            "<tv><programme channel=\"c\" start=\"1\"><title>T</title><sub-title>S</sub-title>\
             <desc>D</desc></programme></tv>",
        )
        .unwrap();
        enricher().enrich_document(&mut doc);
        let prog = doc.programmes().next().unwrap();
        assert_eq!(prog.position_of("episode-num"), Some(2));
    }

    #[test]
    fn test_uid_appended_when_titleless() {
        let mut doc =
            parse_document("<tv><programme channel=\"c\" start=\"1\"><desc>D</desc></programme></tv>")
                .unwrap();
        enricher().enrich_document(&mut doc);
        let prog = doc.programmes().next().unwrap();
        assert!(prog.child("episode-num").is_some());
    }

    #[test]
    fn test_existing_elements_never_overwritten() {
        let mut doc = parse_document(
            "<tv><programme channel=\"c\" start=\"1\"><title>T</title>\
             <desc>Cine | 1999 | 18\nRemake.</desc><date>1984</date>\
             <rating system=\"MPAA\"><value>R</value></rating></programme></tv>",
        )
        .unwrap();
        enricher().enrich_document(&mut doc);
        let prog = doc.programmes().next().unwrap();
        // extracted 1999/18 lose to the pre-existing elements
        assert_eq!(prog.child("date").unwrap().text(), "1984");
        assert_eq!(prog.child("rating").unwrap().attr("system"), Some("MPAA"));
    }

    #[test]
    fn test_existing_category_is_normalized_in_place() {
        let mut doc = parse_document(
            "<tv><programme channel=\"c\" start=\"1\"><title>T</title>\
             <category lang=\"es\">serie de culto</category></programme></tv>",
        )
        .unwrap();
        enricher().enrich_document(&mut doc);
        let prog = doc.programmes().next().unwrap();
        assert_eq!(prog.child("category").unwrap().text(), "Series");
        assert_eq!(prog.child("category").unwrap().attr("lang"), Some("es"));
    }

    #[test]
    fn test_cross_source_duplicates_share_identifier() {
        let xml = "<tv>\
            <programme channel=\"la1\" start=\"20240115220000\"><title>Cine de barrio</title></programme>\
            <programme channel=\"la1\" start=\"20240115220000\"><title>Cine de barrio</title></programme>\
            </tv>";
        let mut doc = parse_document(xml).unwrap();
        enricher().enrich_document(&mut doc);
        let uids: Vec<String> = doc
            .programmes()
            .map(|p| p.child("episode-num").unwrap().text())
            .collect();
        assert_eq!(uids[0], uids[1]);
    }
}
