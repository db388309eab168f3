//! Fallback reader for the `__NEXT_DATA__` hydration payload of
//! client-rendered project pages.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

use crate::adapters::scraper::images::PlanCandidate;
use crate::adapters::scraper::normalize::normalize_material;
use crate::domain::project::Material;

const MAX_DEPTH: u32 = 20;
const MIN_FILE_ID_LEN: usize = 8;

const MATERIAL_KEYS: &[&str] = &["wallMaterialId", "wallMaterial", "wallsMaterial", "materialId"];
const IMAGE_ID_KEYS: &[&str] = &["imageFileIds", "images", "imageIds"];
const LEVEL_KEYS: &[&str] = &["floor", "floorNumber", "level"];

/// Wall-material codes used by the site's catalog.
const WALL_MATERIAL_CODES: &[(u64, &str)] = &[
    (1, "Кирпич"),
    (2, "Газобетон"),
    (3, "Брус"),
    (4, "Клееный брус"),
    (5, "Каркас"),
    (6, "Газосиликатный блок"),
    (7, "Бревно"),
    (8, "Керамический блок"),
    (9, "Профилированный брус"),
    (10, "Пенобетон"),
];

static NEXT_DATA: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("script#__NEXT_DATA__").expect("invalid selector: next data")
});

/// Parsed payload, or `None` when the script is absent or malformed.
pub fn read_payload(document: &Html) -> Option<Value> {
    let script = document.select(&NEXT_DATA).next()?;
    let json_text = script.text().collect::<String>();
    serde_json::from_str(&json_text).ok()
}

/// First object carrying a `projectPlans` array, searched depth-first.
pub fn find_project(data: &Value, max_depth: u32) -> Option<&Value> {
    if max_depth == 0 {
        return None;
    }
    match data {
        Value::Object(map) => {
            if map.get("projectPlans").is_some_and(Value::is_array) {
                return Some(data);
            }
            map.values()
                .find_map(|value| find_project(value, max_depth - 1))
        }
        Value::Array(items) => items
            .iter()
            .find_map(|item| find_project(item, max_depth - 1)),
        _ => None,
    }
}

/// Project object of the page's payload, if any.
pub fn hydrated_project(document: &Html) -> Option<Value> {
    let payload = read_payload(document)?;
    find_project(&payload, MAX_DEPTH).cloned()
}

/// Wall material from the project's numeric material code.
pub fn hydrated_material(project: &Value) -> Option<Material> {
    let code = MATERIAL_KEYS
        .iter()
        .filter_map(|key| project.get(key))
        .find_map(material_code)?;
    let (_, name) = WALL_MATERIAL_CODES.iter().find(|(c, _)| *c == code)?;
    normalize_material(name)
}

/// Floor-plan candidates built from the project's plan entries.
pub fn hydrated_floor_plans(project: &Value, base_url: &str) -> Vec<PlanCandidate> {
    let Some(plans) = project.get("projectPlans").and_then(Value::as_array) else {
        return Vec::new();
    };
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    plans
        .iter()
        .filter_map(|plan| {
            let file_id = IMAGE_ID_KEYS
                .iter()
                .filter_map(|key| plan.get(key))
                .find_map(first_file_id)?;
            let level = LEVEL_KEYS
                .iter()
                .filter_map(|key| plan.get(key))
                .find_map(numeric)
                .and_then(|n| u8::try_from(n).ok());
            Some(PlanCandidate {
                url: resizer_url(&base, &file_id)?,
                level,
                in_switcher: true,
            })
        })
        .collect()
}

/// `{origin}/resizer/v1/files/{%XX..}?width=1280&quality=85&fit=inside`, or
/// `None` when `file_id` is not a usable hex id. The host is serialized the
/// same way as page image URLs (punycode for IDN hosts).
pub fn resizer_url(base: &Url, file_id: &str) -> Option<String> {
    let hex: String = file_id.chars().filter(|c| *c != '-').collect();
    if hex.len() < MIN_FILE_ID_LEN
        || !hex.len().is_multiple_of(2)
        || !hex.chars().all(|c| c.is_ascii_hexdigit())
    {
        return None;
    }
    let mut encoded = String::with_capacity(hex.len() / 2 * 3);
    for pair in hex.as_bytes().chunks(2) {
        encoded.push('%');
        encoded.push_str(&String::from_utf8_lossy(pair).to_ascii_uppercase());
    }
    base.join(&format!(
        "/resizer/v1/files/{encoded}?width=1280&quality=85&fit=inside"
    ))
    .ok()
    .map(String::from)
}

/// Unsigned number, or a string holding one.
fn numeric(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn material_code(value: &Value) -> Option<u64> {
    match value {
        Value::Object(map) => map.get("id").and_then(material_code),
        other => numeric(other),
    }
}

fn first_file_id(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.iter().find_map(first_file_id),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(map) => map.get("id").and_then(first_file_id),
        _ => None,
    }
}
