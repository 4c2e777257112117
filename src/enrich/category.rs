//! Category normalization
//!
//! Source feeds carry free-text genres in every imaginable spelling; the
//! output carries exactly one category from a fixed taxonomy. Matching is an
//! ordered substring-keyword table over the lowercased source string; table
//! order is the priority when several keywords could hit (`concurso` is
//! deliberately tested before the entertainment keywords).

/// Fallback bucket when no keyword matches
pub const FALLBACK_CATEGORY: &str = "Otros";

/// Ordered (keyword → canonical category) table. First hit wins.
const CATEGORY_RULES: &[(&str, &str)] = &[
    ("serie", "Series"),
    ("telenovela", "Series"),
    ("película", "Cine"),
    ("pelicula", "Cine"),
    ("cine", "Cine"),
    ("film", "Cine"),
    ("deport", "Deportes"),
    ("fútbol", "Deportes"),
    ("futbol", "Deportes"),
    ("motor", "Deportes"),
    ("notici", "Noticias"),
    ("informativ", "Noticias"),
    ("telediario", "Noticias"),
    ("document", "Documentales"),
    ("reportaje", "Documentales"),
    ("infantil", "Infantil"),
    ("dibujos", "Infantil"),
    ("animación", "Infantil"),
    ("animacion", "Infantil"),
    ("concurso", "Concursos"),
    ("entreten", "Entretenimiento"),
    ("magacín", "Entretenimiento"),
    ("magacin", "Entretenimiento"),
    ("magazine", "Entretenimiento"),
    ("show", "Entretenimiento"),
    ("humor", "Entretenimiento"),
    ("música", "Música"),
    ("musica", "Música"),
    ("concierto", "Música"),
    ("cultur", "Cultura"),
    ("divulga", "Cultura"),
];

/// Every category the normalizer can produce, fallback included
pub fn canonical_categories() -> Vec<&'static str> {
    let mut seen: Vec<&'static str> = Vec::new();
    for &(_, category) in CATEGORY_RULES {
        if !seen.contains(&category) {
            seen.push(category);
        }
    }
    seen.push(FALLBACK_CATEGORY);
    seen
}

/// Map a raw category or header string onto the fixed taxonomy.
/// Total: always returns exactly one canonical value.
pub fn normalize_category(raw: &str) -> &'static str {
    let lowered = raw.to_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, category)| *category)
        .unwrap_or(FALLBACK_CATEGORY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_genres() {
        assert_eq!(normalize_category("Serie"), "Series");
        assert_eq!(normalize_category("Película de acción"), "Cine");
        assert_eq!(normalize_category("Fútbol: Liga"), "Deportes");
        assert_eq!(normalize_category("Informativo territorial"), "Noticias");
        assert_eq!(normalize_category("Documental histórico"), "Documentales");
        assert_eq!(normalize_category("Dibujos animados"), "Infantil");
        assert_eq!(normalize_category("Concierto de año nuevo"), "Música");
    }

    #[test]
    fn test_matching_is_case_insensitive_substring() {
        assert_eq!(normalize_category("SERIES DE ESTRENO"), "Series");
        assert_eq!(normalize_category("Esta noche cine de terror"), "Cine");
    }

    #[test]
    fn test_table_order_resolves_overlaps() {
        // Matches both the contest and entertainment keywords; the table
        // puts contests first.
        assert_eq!(normalize_category("Concurso show de talentos"), "Concursos");
        // serie beats documental by table position
        assert_eq!(normalize_category("Serie documental"), "Series");
    }

    #[test]
    fn test_fallback_bucket() {
        assert_eq!(normalize_category("Tertulia nocturna"), FALLBACK_CATEGORY);
        assert_eq!(normalize_category(""), FALLBACK_CATEGORY);
    }

    #[test]
    fn test_totality_over_arbitrary_input() {
        let all = canonical_categories();
        for raw in ["", "zzz", "Serie", "x concurso y", "🎬", "Magazine matinal"] {
            assert!(all.contains(&normalize_category(raw)));
        }
    }

    #[test]
    fn test_header_as_category_source() {
        // Headers double as the category source when no element exists
        assert_eq!(normalize_category("Serie | 2021 | TP | *7.5/10"), "Series");
    }
}
