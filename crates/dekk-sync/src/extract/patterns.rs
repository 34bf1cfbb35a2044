//! Title patterns recognized by the extraction pipeline.
//!
//! Each matcher works on the working title as left by the previous steps.
//! Matchers that trim return the byte offset the title is cut at.

use std::sync::LazyLock;

use regex::Regex;

/// Dimension followed by a `C` load designation or a dual load index, as the
/// first dimension in the title. Only meaningful on the untouched title.
static CARGO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\D*\d{3}/\d{2}\s*Z?R\s*\d{2}(?:C\b|\s+\d{2,3}/\d{2,3}\s?[A-Z]\b)")
        .expect("valid regex")
});

static ALL_TERRAIN_ALL_SEASON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|[\s(])(?:A/T/S|AT/S)(?:[\s)]|$)").expect("valid regex"));

static ALL_TERRAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[\s(])(?:A/T|All[- ]Terrain)(?:[\s)]|$)").expect("valid regex")
});

static OWL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bOWL\b").expect("valid regex"));

// Longer alternatives first: "ónegld" must not be read as "negld".
static STUD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(óneglanleg\w*|ónegld\w*|neglanleg\w*|negld\w*|nagla\w*)").expect("valid regex")
});

static TIRE_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(sumardekk|vetrardekk|heilsársdekk|jeppadekk|sendibíladekk|mótorhjóladekk)\b")
        .expect("valid regex")
});

static LOAD_SPEED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s(\d{2,3}(?:/\d{2,3})?)\s?([A-Z])\b").expect("valid regex")
});

static PROMO: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)TILBOÐ").expect("valid regex"));

static DIMENSION_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:LT)?\d{3}/\d{2}\s*Z?R\s*\d{2}C?\b").expect("valid regex")
});

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

pub const TIRE_SUBTYPE_CARGO: &str = "Cargo";
pub const PATTERN_ALL_TERRAIN: &str = "All-Terrain";
pub const PATTERN_ALL_TERRAIN_ALL_SEASON: &str = "All-Terrain All-Season";
pub const FINISH_OWL: &str = "OWL";

/// Stud capability of a tire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudStatus {
    Studded,
    NonStuddable,
    Studdable,
}

impl StudStatus {
    /// Attribute value stored in the catalog.
    #[must_use]
    pub fn value(self) -> &'static str {
        match self {
            StudStatus::Studded => "Negld",
            StudStatus::NonStuddable => "Óneglanleg",
            StudStatus::Studdable => "Neglanleg",
        }
    }

    /// Label used in display names.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            StudStatus::Studded => "Nagladekk",
            StudStatus::NonStuddable => "Ekki neglanleg",
            StudStatus::Studdable => "Neglanleg",
        }
    }

    #[must_use]
    pub fn from_value(value: &str) -> Option<Self> {
        [
            StudStatus::Studded,
            StudStatus::NonStuddable,
            StudStatus::Studdable,
        ]
        .into_iter()
        .find(|s| s.value() == value)
    }

    fn from_token(token: &str) -> Self {
        let lower = token.to_lowercase();
        if lower.starts_with('ó') {
            StudStatus::NonStuddable
        } else if lower.starts_with("neglanleg") {
            StudStatus::Studdable
        } else {
            StudStatus::Studded
        }
    }
}

#[must_use]
pub fn is_cargo(title: &str) -> bool {
    CARGO.is_match(title)
}

#[must_use]
pub fn terrain_pattern(title: &str) -> Option<&'static str> {
    if ALL_TERRAIN_ALL_SEASON.is_match(title) {
        Some(PATTERN_ALL_TERRAIN_ALL_SEASON)
    } else if ALL_TERRAIN.is_match(title) {
        Some(PATTERN_ALL_TERRAIN)
    } else {
        None
    }
}

#[must_use]
pub fn has_owl(title: &str) -> bool {
    OWL.is_match(title)
}

/// Finds the stud token; returns the status and the offset to trim at.
#[must_use]
pub fn find_stud(title: &str) -> Option<(StudStatus, usize)> {
    STUD.find(title)
        .map(|m| (StudStatus::from_token(m.as_str()), m.start()))
}

/// Finds every distinct tire-type token in canonical spelling, plus the
/// offset of the first one.
#[must_use]
pub fn find_tire_types(title: &str) -> Option<(Vec<&'static str>, usize)> {
    let mut first = None;
    let mut types: Vec<&'static str> = Vec::new();
    for m in TIRE_TYPE.find_iter(title) {
        first.get_or_insert(m.start());
        if let Some(canonical) = canonical_tire_type(m.as_str()) {
            if !types.contains(&canonical) {
                types.push(canonical);
            }
        }
    }
    first.map(|offset| (types, offset))
}

fn canonical_tire_type(token: &str) -> Option<&'static str> {
    match token.to_lowercase().as_str() {
        "sumardekk" => Some("Sumardekk"),
        "vetrardekk" => Some("Vetrardekk"),
        "heilsársdekk" => Some("Heilsársdekk"),
        "jeppadekk" => Some("Jeppadekk"),
        "sendibíladekk" => Some("Sendibíladekk"),
        "mótorhjóladekk" => Some("Mótorhjóladekk"),
        _ => None,
    }
}

/// Load index / speed rating pair such as ` 91W` or ` 104/102 R`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSpeed {
    pub load_index: String,
    pub speed_rating: String,
    pub offset: usize,
}

#[must_use]
pub fn find_load_speed(title: &str) -> Option<LoadSpeed> {
    let caps = LOAD_SPEED.captures(title)?;
    let whole = caps.get(0)?;
    Some(LoadSpeed {
        load_index: caps.get(1)?.as_str().to_string(),
        speed_rating: caps.get(2)?.as_str().to_string(),
        offset: whole.start(),
    })
}

#[must_use]
pub fn find_promo(title: &str) -> Option<usize> {
    PROMO.find(title).map(|m| m.start())
}

/// Removes dimension tokens and collapses whitespace and stray separators.
#[must_use]
pub fn clean_remainder(title: &str) -> String {
    let stripped = DIMENSION_TOKEN.replace_all(title, " ");
    let collapsed = WHITESPACE.replace_all(&stripped, " ");
    collapsed
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | ',' | '/'))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cargo_needs_c_or_dual_load_index() {
        assert!(is_cargo("Nokian cLine 195/70R15C 104/102S Sendibíladekk"));
        assert!(is_cargo("Hankook 215/65R16 109/107T Vantra"));
        assert!(!is_cargo("Nokian 225/45R17 91W Vetrardekk"));
    }

    #[test]
    fn cargo_only_considers_first_dimension() {
        assert!(!is_cargo("Nokian 225/45R17 91W fits 195/70R15C"));
    }

    #[test]
    fn terrain_patterns() {
        assert_eq!(
            terrain_pattern("BFGoodrich 265/70R17 A/T/S"),
            Some(PATTERN_ALL_TERRAIN_ALL_SEASON)
        );
        assert_eq!(
            terrain_pattern("Kumho AT/S 235/75R15"),
            Some(PATTERN_ALL_TERRAIN_ALL_SEASON)
        );
        assert_eq!(
            terrain_pattern("BFGoodrich All-Terrain T/A KO2"),
            Some(PATTERN_ALL_TERRAIN)
        );
        assert_eq!(terrain_pattern("Toyo Open Country A/T III"), Some(PATTERN_ALL_TERRAIN));
        assert_eq!(terrain_pattern("Sailun 205/55R16"), None);
    }

    #[test]
    fn owl_is_case_sensitive_word() {
        assert!(has_owl("BFGoodrich 265/70R17 OWL"));
        assert!(!has_owl("Bowler 205/55R16"));
    }

    #[test]
    fn stud_tokens() {
        assert_eq!(
            find_stud("Vetrardekk Neglanleg").map(|(s, _)| s),
            Some(StudStatus::Studdable)
        );
        assert_eq!(
            find_stud("Vetrardekk ónegld").map(|(s, _)| s),
            Some(StudStatus::NonStuddable)
        );
        assert_eq!(
            find_stud("Vetrardekk ÓNEGLANLEG").map(|(s, _)| s),
            Some(StudStatus::NonStuddable)
        );
        assert_eq!(
            find_stud("Ice Blazer negld").map(|(s, _)| s),
            Some(StudStatus::Studded)
        );
        assert_eq!(
            find_stud("Hakkapeliitta með nöglum naglar").map(|(s, _)| s),
            Some(StudStatus::Studded)
        );
        assert!(find_stud("Sumardekk").is_none());
    }

    #[test]
    fn stud_offset_points_at_token() {
        let title = "91W Vetrardekk Neglanleg";
        let (_, offset) = find_stud(title).unwrap();
        assert_eq!(&title[offset..], "Neglanleg");
    }

    #[test]
    fn stud_status_value_roundtrip() {
        for status in [
            StudStatus::Studded,
            StudStatus::NonStuddable,
            StudStatus::Studdable,
        ] {
            assert_eq!(StudStatus::from_value(status.value()), Some(status));
        }
        assert_eq!(StudStatus::from_value("naglar"), None);
    }

    #[test]
    fn tire_types_are_collected_in_order() {
        let (types, offset) = find_tire_types("Outpost 91T jeppadekk Vetrardekk JEPPADEKK").unwrap();
        assert_eq!(types, vec!["Jeppadekk", "Vetrardekk"]);
        assert_eq!(offset, "Outpost 91T ".len());
        assert!(find_tire_types("Ice Blazer").is_none());
    }

    #[test]
    fn load_speed_single_and_dual() {
        let ls = find_load_speed("225/45R17 91W ").unwrap();
        assert_eq!((ls.load_index.as_str(), ls.speed_rating.as_str()), ("91", "W"));
        assert_eq!(ls.offset, "225/45R17".len());

        let ls = find_load_speed("195/70R15C 104/102 R").unwrap();
        assert_eq!(ls.load_index, "104/102");
        assert_eq!(ls.speed_rating, "R");
    }

    #[test]
    fn load_speed_ignores_dimension() {
        assert!(find_load_speed(" 225/45R17").is_none());
        assert!(find_load_speed("Hakkapeliitta R5 205/55R16").is_none());
    }

    #[test]
    fn promo_marker() {
        assert_eq!(find_promo("Sailun Ice Blazer TILBOÐ!"), Some("Sailun Ice Blazer ".len()));
        assert_eq!(find_promo("Sailun Ice Blazer"), None);
    }

    #[test]
    fn clean_remainder_strips_dimensions_and_separators() {
        assert_eq!(clean_remainder("Hakkapeliitta R5  205/55R16 "), "Hakkapeliitta R5");
        assert_eq!(clean_remainder(" 225/45R17 "), "");
        assert_eq!(clean_remainder("cLine 195/70R15C - "), "cLine");
        assert_eq!(clean_remainder("Outpost LT265/75R17"), "Outpost");
    }
}
