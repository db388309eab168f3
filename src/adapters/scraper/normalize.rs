use std::sync::LazyLock;

use regex::Regex;

use crate::domain::project::Material;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("invalid regex: number"));

static INTEGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("invalid regex: integer"));

/// Gas-concrete family; checked before timber so "газобетонный брус" stays gas concrete.
const GAS_CONCRETE_KEYWORDS: &[&str] = &[
    "газобетон",
    "газоблок",
    "газосиликат",
    "ячеистый бетон",
    "ячеистобетон",
    "пенобетон",
    "автоклавн",
];

const TIMBER_KEYWORDS: &[&str] = &[
    "брус",
    "клееный брус",
    "профилированный брус",
    "брусовой",
];

const PLACEHOLDERS: &[&str] = &["", "-", "—", "–", "нет", "нет данных", "не указан", "н/д"];

/// Unicode dashes to '-', NBSP variants to spaces, whitespace runs collapsed.
pub fn normalize_text(text: &str) -> String {
    let replaced: String = text
        .chars()
        .map(|c| match c {
            '\u{2010}'..='\u{2015}' | '\u{2212}' => '-',
            '\u{00A0}' | '\u{202F}' | '\u{2007}' | '\u{2009}' => ' ',
            other => other,
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True for the dash/empty values the site renders when a field is unset.
pub fn is_placeholder(value: &str) -> bool {
    let cleaned = normalize_text(value).to_lowercase();
    PLACEHOLDERS.contains(&cleaned.as_str())
}

/// First decimal number in `text`; spaces inside the number ("1 250,5") are ignored.
pub fn normalize_number(text: &str) -> Option<f64> {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '\u{00A0}' | '\u{202F}' | '\u{2009}'))
        .collect();
    let token = NUMBER_RE.find(&compact)?;
    token.as_str().replace(',', ".").parse().ok()
}

/// First unsigned integer in `text`.
pub fn normalize_integer(text: &str) -> Option<u32> {
    INTEGER_RE.find(text)?.as_str().parse().ok()
}

pub fn normalize_material(text: &str) -> Option<Material> {
    if is_placeholder(text) {
        return None;
    }
    let lower = normalize_text(text).to_lowercase().replace('ё', "е");
    if GAS_CONCRETE_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return Some(Material::GasConcrete);
    }
    if TIMBER_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return Some(Material::Brus);
    }
    None
}
