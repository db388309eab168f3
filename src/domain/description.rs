//! Human-readable project description built from the structured fields.
//!
//! Output is a badge line, a blank line and a fixed-structure paragraph. The
//! function depends on nothing but the record, so identical records always
//! render to identical bytes.

use crate::domain::declension::declense_bedroom;
use crate::domain::project::{ProjectRecord, format_area};

const KITCHEN_LIVING_BADGE: &str = "Кухня-гостиная";
const BADGE_SEPARATOR: &str = " · ";
const CLOSING_SENTENCE: &str = "Уютный дом для жизни за городом круглый год.";

pub fn render_description(record: &ProjectRecord) -> String {
    let badges = render_badges(record);
    let prose = render_prose(record);
    format!("{badges}\n\n{prose}")
}

/// Badge line, e.g. "3 спальни · Газобетон · Кухня-гостиная · Терраса".
pub fn render_badges(record: &ProjectRecord) -> String {
    let mut badges: Vec<String> = Vec::new();
    if let Some(bedrooms) = record.bedrooms.filter(|n| *n > 0) {
        badges.push(declense_bedroom(bedrooms));
    }
    if let Some(material) = record.material {
        badges.push(material.title().to_string());
    }
    badges.push(KITCHEN_LIVING_BADGE.to_string());
    if record.has_terrace {
        badges.push("Терраса".to_string());
    }
    if record.has_garage {
        badges.push("Гараж".to_string());
    }
    if record.has_second_floor {
        badges.push("Второй этаж".to_string());
    }
    badges.join(BADGE_SEPARATOR)
}

fn render_prose(record: &ProjectRecord) -> String {
    let mut sentences: Vec<String> = Vec::new();

    let mut opening = String::from(if record.has_second_floor {
        "Двухэтажный дом"
    } else {
        "Одноэтажный дом"
    });
    if let Some(material) = record.material {
        opening.push_str(" из ");
        opening.push_str(material.genitive());
    }
    if let Some(area) = record.area {
        opening.push_str(" площадью ");
        opening.push_str(&format_area(area));
        opening.push_str(" м²");
    }
    opening.push('.');
    sentences.push(opening);

    let mut layout: Vec<String> = Vec::new();
    if let Some(bedrooms) = record.bedrooms.filter(|n| *n > 0) {
        layout.push(declense_bedroom(bedrooms));
    }
    if record.has_kitchen_living {
        layout.push("светлая кухня-гостиная".to_string());
    }
    if !layout.is_empty() {
        sentences.push(format!("Планировка: {}.", layout.join(", ")));
    }

    if record.has_terrace {
        sentences.push("Терраса подходит для семейных завтраков на свежем воздухе.".to_string());
    }
    if record.has_garage {
        sentences.push("Гараж пристроен к дому.".to_string());
    }
    if record.has_second_floor {
        sentences.push("Второй этаж отведён под тихую зону отдыха.".to_string());
    }

    sentences.push(CLOSING_SENTENCE.to_string());
    sentences.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::project::Material;
    use pretty_assertions::assert_eq;

    fn sample() -> ProjectRecord {
        let mut record = ProjectRecord::new(77279, "https://строим.дом.рф/project/77279");
        record.area = Some(120.5);
        record.material = Some(Material::GasConcrete);
        record.bedrooms = Some(3);
        record.has_kitchen_living = true;
        record.has_terrace = true;
        record.has_second_floor = true;
        record
    }

    #[test]
    fn golden_full_record() {
        let expected = "3 спальни · Газобетон · Кухня-гостиная · Терраса · Второй этаж\n\n\
            Двухэтажный дом из газобетона площадью 120,5 м². \
            Планировка: 3 спальни, светлая кухня-гостиная. \
            Терраса подходит для семейных завтраков на свежем воздухе. \
            Второй этаж отведён под тихую зону отдыха. \
            Уютный дом для жизни за городом круглый год.";
        assert_eq!(render_description(&sample()), expected);
    }

    #[test]
    fn golden_empty_record() {
        let record = ProjectRecord::new(1, "u");
        assert_eq!(
            render_description(&record),
            "Кухня-гостиная\n\nОдноэтажный дом. Уютный дом для жизни за городом круглый год."
        );
    }

    #[test]
    fn badge_line_snapshot() {
        let mut record = sample();
        record.has_garage = true;
        record.bedrooms = Some(1);
        record.material = Some(Material::Brus);
        insta::assert_snapshot!(
            render_badges(&record),
            @"1 спальня · Брус · Кухня-гостиная · Терраса · Гараж · Второй этаж"
        );
    }

    #[test]
    fn zero_bedrooms_are_omitted() {
        let mut record = ProjectRecord::new(1, "u");
        record.bedrooms = Some(0);
        assert!(!render_description(&record).contains("спал"));
    }

    #[test]
    fn rendering_is_repeatable() {
        let record = sample();
        let first = render_description(&record);
        for _ in 0..10 {
            assert_eq!(render_description(&record), first);
        }
    }
}
