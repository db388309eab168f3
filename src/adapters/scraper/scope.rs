//! Narrow query capability handed to every locator strategy.
//!
//! A `Scope` is a subtree of the page. Anything inside a "related / similar
//! projects" block is invisible through it, so listings of other projects on
//! the same page can never leak into this project's fields.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::adapters::scraper::normalize::normalize_text;

/// Primary content anchors, most specific first.
static CONTENT_ANCHORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        r#"[class*="ProjectPage_content"]"#,
        r#"[class*="Project_content"]"#,
        r#"[class*="ProjectContent"]"#,
        r#"[class*="project-content"]"#,
        "main",
        "article",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("invalid selector: content anchor"))
    .collect()
});

/// Class fragments (lower-cased) marking blocks about other projects.
const FOREIGN_BLOCK_MARKERS: &[&str] = &[
    "related",
    "similar",
    "recommend",
    "otherprojects",
    "other-projects",
    "other_projects",
];

const INVISIBLE_TAGS: &[&str] = &["script", "style", "noscript", "template"];

#[derive(Clone, Copy)]
pub struct Scope<'a> {
    root: ElementRef<'a>,
}

impl<'a> Scope<'a> {
    /// The whole document.
    pub fn document(document: &'a Html) -> Self {
        Self {
            root: document.root_element(),
        }
    }

    /// The primary content region, if the page exposes a recognizable anchor.
    pub fn content(document: &'a Html) -> Option<Self> {
        CONTENT_ANCHORS.iter().find_map(|selector| {
            document
                .select(selector)
                .find(|el| !is_in_foreign_block(*el))
                .map(|root| Self { root })
        })
    }

    pub fn root(self) -> ElementRef<'a> {
        self.root
    }

    /// Matching elements in document order, skipping related-project blocks.
    pub fn select<'b>(self, selector: &'b Selector) -> impl Iterator<Item = ElementRef<'a>> + 'b
    where
        'a: 'b,
    {
        self.root
            .select(selector)
            .filter(|el| !is_in_foreign_block(*el))
    }

    /// Visible text of the scope, normalized.
    pub fn text(self) -> String {
        visible_text(self.root)
    }
}

/// Per-extraction view of a parsed page: the scopes to search, most narrow
/// first, and the page's visible text computed once.
pub struct PageView<'a> {
    document: &'a Html,
    content: Option<Scope<'a>>,
    text: String,
    window_end: usize,
}

impl<'a> PageView<'a> {
    pub fn new(document: &'a Html, window_chars: usize) -> Self {
        let text = Scope::document(document).text();
        let window_end = text
            .char_indices()
            .nth(window_chars)
            .map_or(text.len(), |(idx, _)| idx);
        Self {
            document,
            content: Scope::content(document),
            text,
            window_end,
        }
    }

    pub fn document(&self) -> &'a Html {
        self.document
    }

    /// Content region first (when anchored), then the whole document.
    pub fn scopes(&self) -> impl Iterator<Item = Scope<'a>> + use<'a> {
        self.content
            .into_iter()
            .chain(std::iter::once(Scope::document(self.document)))
    }

    /// Visible text of the whole page.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Leading slice of the visible text, before "related projects" blocks
    /// further down the page can interfere.
    pub fn window(&self) -> &str {
        &self.text[..self.window_end]
    }
}

/// True when `element` or any ancestor is a related/similar-projects block.
pub fn is_in_foreign_block(element: ElementRef<'_>) -> bool {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .any(|el| {
            el.value().attr("class").is_some_and(|class| {
                let lower = class.to_lowercase();
                FOREIGN_BLOCK_MARKERS.iter().any(|m| lower.contains(m))
            })
        })
}

/// Text a reader would see: script/style content dropped, nodes space-joined,
/// whitespace and dashes normalized.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| INVISIBLE_TAGS.contains(&el.name()))
        });
        if !hidden {
            parts.push(&**text);
        }
    }
    normalize_text(&parts.join(" "))
}

/// Visible text of a single element (label/value cells).
pub fn element_text(element: ElementRef<'_>) -> String {
    visible_text(element)
}

/// Lower-cased `class` attribute, empty when absent.
pub fn class_of(element: ElementRef<'_>) -> String {
    element
        .value()
        .attr("class")
        .map(str::to_lowercase)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_scope_prefers_project_anchor() {
        let html = Html::parse_document(
            r#"<html><body><main><div class="ProjectPage_content__x1">inner</div></main></body></html>"#,
        );
        let scope = Scope::content(&html).unwrap();
        assert_eq!(scope.text(), "inner");
    }

    #[test]
    fn content_scope_missing_anchor() {
        let html = Html::parse_document("<html><body><div>plain</div></body></html>");
        assert!(Scope::content(&html).is_none());
    }

    #[test]
    fn select_skips_related_blocks() {
        let html = Html::parse_document(
            r#"<html><body>
                <p class="v">mine</p>
                <section class="RelatedProjects_list"><p class="v">theirs</p></section>
            </body></html>"#,
        );
        let selector = Selector::parse("p.v").unwrap();
        let texts: Vec<String> = Scope::document(&html)
            .select(&selector)
            .map(element_text)
            .collect();
        assert_eq!(texts, vec!["mine"]);
    }

    #[test]
    fn page_view_window_is_char_bounded() {
        let html = Html::parse_document("<html><body><p>Площадь дома</p></body></html>");
        let view = PageView::new(&html, 8);
        assert_eq!(view.window(), "Площадь ");
        assert_eq!(view.text(), "Площадь дома");
    }

    #[test]
    fn page_view_scopes_content_first() {
        let html = Html::parse_document(
            "<html><body><main><p>a</p></main><footer><p>b</p></footer></body></html>",
        );
        let view = PageView::new(&html, 100);
        let texts: Vec<String> = view.scopes().map(Scope::text).collect();
        assert_eq!(texts, vec!["a".to_string(), "a b".to_string()]);
    }

    #[test]
    fn visible_text_drops_scripts() {
        let html = Html::parse_document(
            "<html><body><p>Дом</p><script>var x = 'hidden';</script><style>p{}</style></body></html>",
        );
        assert_eq!(Scope::document(&html).text(), "Дом");
    }
}
