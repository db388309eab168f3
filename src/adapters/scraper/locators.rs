//! Field locators: ordered cascades of strategies, each of which may find a
//! raw value for one labeled field. The first value that is not a placeholder
//! and parses wins.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};
use tracing::debug;

use crate::adapters::scraper::normalize::{
    is_placeholder, normalize_integer, normalize_material, normalize_number,
};
use crate::adapters::scraper::scope::{PageView, Scope, class_of, element_text};
use crate::domain::project::Material;

/// Describes how a labeled field is written on the page.
pub struct FieldLabel {
    pub name: &'static str,
    /// Lower-case label prefixes for labeled-pair widgets.
    pub prefixes: &'static [&'static str],
    /// Label pattern for table rows and cells.
    pub label: &'static LazyLock<Regex>,
    /// Last-resort patterns over the text window; group 1 is the value.
    pub window: &'static LazyLock<Vec<Regex>>,
}

type Strategy = for<'a> fn(Scope<'a>, &FieldLabel) -> Option<String>;

const LABELED_CASCADE: &[(&str, Strategy)] = &[
    ("labeled_pair", labeled_pair),
    ("table_row", table_row),
    ("definition_list", definition_list),
    ("table_cell", table_cell),
];

const WIDGET_MARKERS: &[&str] = &[
    "general_item",
    "general__item",
    "feature",
    "info_item",
    "info__item",
    "infobox",
    "characteristic",
    "param",
];

const MAX_LABEL_CELL_CHARS: usize = 50;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("invalid regex: locator window"))
        .collect()
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("invalid selector: locator")
}

static CLASSED: LazyLock<Selector> = LazyLock::new(|| selector("[class]"));
static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| selector("p"));
static TABLE_ROW: LazyLock<Selector> = LazyLock::new(|| selector(r#"[class*="Table_row"]"#));
static TABLE_COL: LazyLock<Selector> = LazyLock::new(|| selector(r#"[class*="Table_col"]"#));
static HINT: LazyLock<Selector> = LazyLock::new(|| {
    selector(
        r#"[class*="hint"], [class*="Hint"], [class*="tooltip"], [class*="Tooltip"]"#,
    )
});
static DT: LazyLock<Selector> = LazyLock::new(|| selector("dt"));
static LABEL_CELL: LazyLock<Selector> = LazyLock::new(|| selector("td, th"));
static HEADING: LazyLock<Selector> = LazyLock::new(|| selector("h1"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[class*="title"], [class*="Title"]"#));
static DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| {
    selector(r#".description, [class*="description"], [class*="Description"]"#)
});
static META_DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"meta[name="description"]"#));

static AREA_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:площадь\s+дома|общая\s+площадь)").expect("invalid regex: area label")
});
static AREA_WINDOW: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)площадь\s+дома\s*:?\s*(\d[\d ]*(?:[.,]\d+)?)\s*м(?:²|2)",
        r"(?i)общая\s+площадь\s*:?\s*(\d[\d ]*(?:[.,]\d+)?)\s*м(?:²|2)",
    ])
});

static MATERIAL_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)материал\s+(?:наружных\s+)?стен").expect("invalid regex: material label")
});
static MATERIAL_WINDOW: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[r"(?i)материал\s+(?:наружных\s+)?стен\s*:?\s*([а-яё][а-яё \-]{2,40})"])
});

static BEDROOMS_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|\s)(?:спальни|количество\s+спален)").expect("invalid regex: bedrooms label")
});
static BEDROOMS_WINDOW: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)спальни\s*:\s*(\d+)",
        r"(?i)количество\s+спален\s*:?\s*(\d+)",
        r"(?i)(\d+)\s+спал(?:ен|ьни|ьня)",
    ])
});

static FLOORS_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:количество\s+надземных\s+этажей|этажность)")
        .expect("invalid regex: floors label")
});
static FLOORS_WINDOW: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)количество\s+надземных\s+этажей\s*:?\s*(\d+)",
        r"(?i)этажность\s*:?\s*(\d+)",
    ])
});

static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:от\s*)?(\d{1,3}(?:[ \u{00A0}\u{202F}]?\d{3})*)\s*(?:₽|руб)")
        .expect("invalid regex: price")
});

pub static AREA: FieldLabel = FieldLabel {
    name: "area",
    prefixes: &["площадь дома", "общая площадь"],
    label: &AREA_LABEL_RE,
    window: &AREA_WINDOW,
};

pub static MATERIAL: FieldLabel = FieldLabel {
    name: "material",
    prefixes: &["материал стен", "материал наружных стен"],
    label: &MATERIAL_LABEL_RE,
    window: &MATERIAL_WINDOW,
};

pub static BEDROOMS: FieldLabel = FieldLabel {
    name: "bedrooms",
    prefixes: &["спальни", "количество спален"],
    label: &BEDROOMS_LABEL_RE,
    window: &BEDROOMS_WINDOW,
};

pub static FLOORS: FieldLabel = FieldLabel {
    name: "floors",
    prefixes: &["количество надземных этажей", "этажность", "количество этажей"],
    label: &FLOORS_LABEL_RE,
    window: &FLOORS_WINDOW,
};

const KITCHEN_LIVING_PHRASES: &[&str] = &[
    "кухня-гостиная",
    "кухня гостиная",
    "кухней-гостиной",
    "кухни-гостиной",
];
const GARAGE_PHRASES: &[&str] = &["гараж"];
const TERRACE_PHRASES: &[&str] = &["терраса", "террасой", "террасы", "веранда", "верандой"];
const SECOND_FLOOR_PHRASES: &[&str] = &["2 этаж", "второй этаж", "двухэтажн"];

/// Boolean feature flags detected on a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Amenities {
    pub kitchen_living: bool,
    pub garage: bool,
    pub terrace: bool,
    pub second_floor: bool,
}

/// Run the labeled cascade over every scope, then the text window.
pub fn locate<T>(
    page: &PageView<'_>,
    field: &FieldLabel,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    for scope in page.scopes() {
        for (strategy, run) in LABELED_CASCADE {
            if let Some(raw) = run(scope, field)
                && !is_placeholder(&raw)
                && let Some(value) = parse(&raw)
            {
                debug!(field = field.name, strategy, raw = %raw, "field located");
                return Some(value);
            }
        }
    }

    let window = page.window();
    field.window.iter().find_map(|re| {
        let raw = re.captures(window)?.get(1)?.as_str();
        let value = parse(raw)?;
        debug!(field = field.name, strategy = "text_window", raw, "field located");
        Some(value)
    })
}

pub fn locate_area(page: &PageView<'_>) -> Option<f64> {
    locate(page, &AREA, |raw| {
        normalize_number(raw).filter(|area| *area > 0.0 && area.is_finite())
    })
}

pub fn locate_material(page: &PageView<'_>) -> Option<Material> {
    locate(page, &MATERIAL, normalize_material)
}

pub fn locate_bedrooms(page: &PageView<'_>) -> Option<u32> {
    locate(page, &BEDROOMS, normalize_integer)
}

pub fn locate_floor_count(page: &PageView<'_>) -> Option<u32> {
    locate(page, &FLOORS, |raw| normalize_integer(raw).filter(|n| *n > 0))
}

/// First "N ₽" amount on the page.
pub fn locate_price(page: &PageView<'_>) -> Option<u64> {
    PRICE_RE.captures_iter(page.text()).find_map(|caps| {
        let digits: String = caps
            .get(1)?
            .as_str()
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        digits.parse::<u64>().ok().filter(|price| *price > 0)
    })
}

/// Amenity flags from page text; an explicit floor count overrides the
/// second-floor phrases.
pub fn locate_amenities(page: &PageView<'_>, floor_count: Option<u32>) -> Amenities {
    let text = page.text().to_lowercase();
    let mentions = |phrases: &[&str]| phrases.iter().any(|p| text.contains(p));
    Amenities {
        kitchen_living: mentions(KITCHEN_LIVING_PHRASES),
        garage: mentions(GARAGE_PHRASES),
        terrace: mentions(TERRACE_PHRASES),
        second_floor: floor_count.map_or_else(|| mentions(SECOND_FLOOR_PHRASES), |n| n >= 2),
    }
}

/// Project heading; `None` when the page has no usable title.
///
/// An `h1` anywhere on the page beats a title-classed element in the
/// content region.
pub fn locate_name(page: &PageView<'_>) -> Option<String> {
    [&*HEADING, &*TITLE].into_iter().find_map(|selector| {
        page.scopes().find_map(|scope| {
            scope
                .select(selector)
                .map(element_text)
                .find(|text| !text.is_empty())
        })
    })
}

/// Raw description block, falling back to the meta description.
pub fn locate_description(page: &PageView<'_>) -> String {
    page.scopes()
        .find_map(|scope| {
            scope
                .select(&DESCRIPTION)
                .map(element_text)
                .find(|text| !text.is_empty())
        })
        .or_else(|| {
            page.document()
                .select(&META_DESCRIPTION)
                .filter_map(|meta| meta.value().attr("content"))
                .map(str::trim)
                .find(|content| !content.is_empty())
                .map(String::from)
        })
        .unwrap_or_default()
}

fn label_matches(label: &str, field: &FieldLabel) -> bool {
    let label = label.to_lowercase();
    let label = label.trim_end_matches(':').trim();
    field.prefixes.iter().any(|prefix| label.starts_with(prefix))
}

fn labeled_pair(scope: Scope<'_>, field: &FieldLabel) -> Option<String> {
    scope
        .select(&CLASSED)
        .filter(|el| {
            let class = class_of(*el);
            WIDGET_MARKERS.iter().any(|m| class.contains(m))
        })
        .find_map(|widget| {
            let paragraphs: Vec<ElementRef<'_>> = widget.select(&PARAGRAPH).collect();
            let [label, value] = paragraphs.as_slice() else {
                return None;
            };
            label_matches(&element_text(*label), field).then(|| element_text(*value))
        })
}

fn table_row(scope: Scope<'_>, field: &FieldLabel) -> Option<String> {
    scope
        .select(&TABLE_ROW)
        .filter(|row| field.label.is_match(&element_text(*row)))
        .find_map(|row| {
            let cell = row.select(&TABLE_COL).nth(1)?;
            let hint = cell
                .select(&HINT)
                .map(element_text)
                .find(|text| !text.is_empty());
            let text = hint
                .or_else(|| cell.select(&PARAGRAPH).last().map(element_text))
                .unwrap_or_else(|| element_text(cell));
            (!text.is_empty()).then_some(text)
        })
}

fn definition_list(scope: Scope<'_>, field: &FieldLabel) -> Option<String> {
    scope
        .select(&DT)
        .filter(|dt| field.label.is_match(&element_text(*dt)))
        .find_map(|dt| {
            let dd = next_element_sibling(dt)?;
            (dd.value().name() == "dd").then(|| element_text(dd))
        })
}

fn table_cell(scope: Scope<'_>, field: &FieldLabel) -> Option<String> {
    scope
        .select(&LABEL_CELL)
        .filter(|cell| {
            let text = element_text(*cell);
            text.chars().count() < MAX_LABEL_CELL_CHARS && field.label.is_match(&text)
        })
        .find_map(|cell| {
            let next = next_element_sibling(cell)?;
            matches!(next.value().name(), "td" | "th").then(|| element_text(next))
        })
}

fn next_element_sibling(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.next_siblings().find_map(ElementRef::wrap)
}
