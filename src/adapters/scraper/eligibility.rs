use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::debug;

use crate::adapters::scraper::scope::PageView;

static CONTRACTOR_ATTR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[data-contractor-id]").expect("invalid selector: contractor attr")
});

static LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("invalid selector: links"));

/// Whether the page belongs to the configured contractor.
///
/// Any one signal is enough: a `data-contractor-id` attribute with the id,
/// the id as a standalone number or a responsible-party name in the visible
/// text, or a link to the contractor's page.
pub fn is_eligible(page: &PageView<'_>, contractor_id: u64, contractor_names: &[String]) -> bool {
    let id = contractor_id.to_string();

    if has_contractor_attr(page.document(), &id) {
        debug!(contractor_id, signal = "attribute", "eligibility matched");
        return true;
    }

    let text = page.text();
    if contains_number_token(text, &id) {
        debug!(contractor_id, signal = "text_id", "eligibility matched");
        return true;
    }
    let lower = text.to_lowercase();
    if contractor_names
        .iter()
        .map(|name| name.trim().to_lowercase())
        .any(|name| !name.is_empty() && lower.contains(&name))
    {
        debug!(contractor_id, signal = "text_name", "eligibility matched");
        return true;
    }

    if has_contractor_link(page.document(), &id) {
        debug!(contractor_id, signal = "link", "eligibility matched");
        return true;
    }
    false
}

fn has_contractor_attr(document: &Html, id: &str) -> bool {
    document
        .select(&CONTRACTOR_ATTR)
        .filter_map(|el| el.value().attr("data-contractor-id"))
        .any(|value| value.trim() == id)
}

fn has_contractor_link(document: &Html, id: &str) -> bool {
    let needle = format!("contractor/{id}");
    document
        .select(&LINKS)
        .filter_map(|a| a.value().attr("href"))
        .any(|href| {
            href.find(&needle).is_some_and(|pos| {
                !href[pos + needle.len()..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_digit())
            })
        })
}

/// `needle` occurs in `text` not glued to other digits.
fn contains_number_token(text: &str, needle: &str) -> bool {
    text.match_indices(needle).any(|(pos, _)| {
        let before = text[..pos].chars().next_back();
        let after = text[pos + needle.len()..].chars().next();
        !before.is_some_and(|c| c.is_ascii_digit()) && !after.is_some_and(|c| c.is_ascii_digit())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eligible(html: &str) -> bool {
        let doc = Html::parse_document(html);
        let page = PageView::new(&doc, 4000);
        is_eligible(&page, 9465, &["Юрова Любовь Владимировна".to_string()])
    }

    #[test]
    fn attribute_signal() {
        assert!(eligible(r#"<div data-contractor-id="9465"></div>"#));
        assert!(!eligible(r#"<div data-contractor-id="1234"></div>"#));
    }

    #[test]
    fn text_id_must_be_standalone() {
        assert!(eligible("<p>Подрядчик № 9465</p>"));
        assert!(!eligible("<p>Телефон 8946512</p>"));
    }

    #[test]
    fn name_signal_is_case_insensitive() {
        assert!(eligible("<p>Ответственный: ЮРОВА Любовь Владимировна</p>"));
    }

    #[test]
    fn link_signal() {
        assert!(eligible(r#"<a href="/contractor/9465">Компания</a>"#));
        assert!(!eligible(r#"<a href="/contractor/94651">Компания</a>"#));
    }

    #[test]
    fn no_signal() {
        assert!(!eligible("<h1>Дом 120 м²</h1>"));
    }
}
