//! Image classification: every image reference on the page becomes a photo,
//! a floor plan, or noise.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::adapters::scraper::scope::{Scope, class_of};

pub const MAX_PHOTOS: usize = 30;
pub const MAX_PLANS: usize = 12;

/// Photos narrower or shorter than this are treated as thumbnails.
const THUMBNAIL_MAX_PX: u32 = 400;
/// Ancestors inspected for header/brand/menu classes.
const NOISE_ANCESTOR_DEPTH: usize = 3;
/// Fewer photos than this after the targeted passes widens the search.
const MIN_PHOTOS: usize = 3;

const SOURCE_ATTRS: &[&str] = &["src", "data-src", "data-lazy-src", "data-original"];
const SRCSET_ATTRS: &[&str] = &["srcset", "data-srcset"];

const NOISE_KEYWORDS: &[&str] = &[
    "logo",
    "favicon",
    "icon",
    "watermark",
    "placeholder",
    "sprite",
    "логотип",
    "иконка",
    "водяной знак",
    ".svg",
];
const NOISE_TAGS: &[&str] = &["header", "nav", "footer"];
const NOISE_CLASS_MARKERS: &[&str] = &["header", "brand", "navbar", "navigation", "logo", "menu"];
const COVER_MARKERS: &[&str] = &[
    "cover",
    "mainimage",
    "main-image",
    "main_image",
    "hero",
    "mainphoto",
];
const GALLERY_MARKERS: &[&str] = &["gallery", "slider", "swiper", "carousel", "slide"];
const PLAN_SWITCHER_MARKERS: &[&str] = &["planlist", "plan-switch", "planswitch", "plans"];
const THUMBNAIL_PARAMS: &[&str] = &["w", "width", "h", "height"];
/// Query parameters that only pick a rendition of the same image.
const RENDITION_PARAMS: &[&str] = &["w", "width", "h", "height", "q", "quality", "fit"];

static IMAGE_ELEMENTS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img, source").expect("invalid selector: images"));

static PLAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:план|планировк|\bэтаж|floor|layout|чертё?ж|черте?ж|схема|plan)")
        .expect("invalid regex: plan keywords")
});

static ASSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:/resizer/|/upload|/files/|/project|\.(?:jpe?g|png|webp|avif)(?:$|[?#]))")
        .expect("invalid regex: asset path")
});

static LEVEL_DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d)\s*(?:-?\s*(?:го|ого|й|ый))?\s*этаж").expect("invalid regex: level digit")
});

static LEVEL_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:floor|etazh|level)[_\-]?(\d)").expect("invalid regex: level url")
});

/// Output of one classification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedImages {
    pub photos: Vec<String>,
    pub floor_plans: Vec<String>,
}

/// A floor-plan candidate before the one-per-level cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanCandidate {
    pub url: String,
    pub level: Option<u8>,
    pub in_switcher: bool,
}

struct Candidate<'a> {
    url: Url,
    element: ElementRef<'a>,
}

struct Photo {
    url: String,
    thumbnail: bool,
}

/// Dedup state and output lists for a single extraction.
struct ImageContext {
    seen: HashSet<String>,
    photos: Vec<Photo>,
    plans: Vec<PlanCandidate>,
    has_cover: bool,
}

impl ImageContext {
    fn new() -> Self {
        Self {
            seen: HashSet::new(),
            photos: Vec::new(),
            plans: Vec::new(),
            has_cover: false,
        }
    }

    /// Records `url` as emitted; false when an equivalent URL already was.
    fn admit(&mut self, url: &Url) -> bool {
        self.seen.insert(dedup_key(url))
    }

    fn push_photo(&mut self, url: &Url) {
        if self.photos.len() >= MAX_PHOTOS || !self.admit(url) {
            return;
        }
        self.photos.push(Photo {
            url: url.to_string(),
            thumbnail: is_thumbnail(url),
        });
    }

    fn push_plan(&mut self, url: &Url, element: ElementRef<'_>) {
        if self.plans.len() >= MAX_PLANS || !self.admit(url) {
            return;
        }
        self.plans.push(PlanCandidate {
            url: url.to_string(),
            level: plan_level(&alt_text(element), url),
            in_switcher: has_marked_ancestor(element, PLAN_SWITCHER_MARKERS, usize::MAX),
        });
    }

    fn finish(self, has_second_floor: bool) -> ClassifiedImages {
        let mut photos = self.photos;
        let start = usize::from(self.has_cover && !photos.is_empty());
        photos[start..].sort_by_key(|photo| photo.thumbnail);
        ClassifiedImages {
            photos: photos.into_iter().map(|photo| photo.url).collect(),
            floor_plans: select_plan_levels(self.plans, has_second_floor),
        }
    }
}

/// Walk every image on the page and split it into photos and floor plans.
pub fn classify_images(
    document: &Html,
    base_url: &str,
    has_second_floor: bool,
) -> ClassifiedImages {
    let base = Url::parse(base_url).ok();
    let mut ctx = ImageContext::new();
    let mut photo_candidates: Vec<Candidate<'_>> = Vec::new();

    for element in Scope::document(document).select(&IMAGE_ELEMENTS) {
        let Some(url) = candidate_url(element).and_then(|raw| resolve_url(&raw, base.as_ref()))
        else {
            continue;
        };
        if is_noise(element, &url) {
            continue;
        }
        if is_plan(element, &url) {
            ctx.push_plan(&url, element);
        } else {
            photo_candidates.push(Candidate { url, element });
        }
    }

    if let Some(cover) = photo_candidates
        .iter()
        .find(|c| has_marked_ancestor(c.element, COVER_MARKERS, usize::MAX))
    {
        ctx.push_photo(&cover.url);
        ctx.has_cover = true;
    }

    for candidate in photo_candidates
        .iter()
        .filter(|c| has_marked_ancestor(c.element, GALLERY_MARKERS, usize::MAX))
    {
        ctx.push_photo(&candidate.url);
    }

    if ctx.photos.len() <= usize::from(ctx.has_cover) {
        for candidate in photo_candidates
            .iter()
            .filter(|c| ASSET_RE.is_match(c.url.as_str()))
        {
            ctx.push_photo(&candidate.url);
        }
    }

    if ctx.photos.len() < MIN_PHOTOS {
        for candidate in &photo_candidates {
            ctx.push_photo(&candidate.url);
        }
    }

    let images = ctx.finish(has_second_floor);
    debug!(
        photos = images.photos.len(),
        floor_plans = images.floor_plans.len(),
        "images classified"
    );
    images
}

/// Keep one plan for level 1 and, with a second floor, one for level 2.
///
/// Tagged plans claim their level first; untagged ones fill the remaining
/// levels in order, plan-switcher entries before loose images.
pub fn select_plan_levels(plans: Vec<PlanCandidate>, has_second_floor: bool) -> Vec<String> {
    let mut levels: [Option<String>; 2] = [None, None];
    let mut untagged: Vec<PlanCandidate> = Vec::new();

    for plan in plans {
        match plan.level {
            Some(level @ 1..=2) => {
                let slot = &mut levels[usize::from(level - 1)];
                if slot.is_none() {
                    *slot = Some(plan.url);
                }
            }
            Some(_) => {}
            None => untagged.push(plan),
        }
    }

    untagged.sort_by_key(|plan| !plan.in_switcher);
    for plan in untagged {
        if let Some(slot) = levels.iter_mut().find(|slot| slot.is_none()) {
            *slot = Some(plan.url);
        }
    }

    let [ground, upper] = levels;
    ground
        .into_iter()
        .chain(upper.filter(|_| has_second_floor))
        .collect()
}

/// Absolute URL for `raw`: protocol-relative gets `https:`, relative paths
/// are joined to `base`. Only http(s) URLs survive.
pub fn resolve_url(raw: &str, base: Option<&Url>) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("data:") {
        return None;
    }
    let resolved = if let Some(rest) = raw.strip_prefix("//") {
        Url::parse(&format!("https://{rest}")).ok()?
    } else {
        match Url::parse(raw) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => base?.join(raw).ok()?,
            Err(_) => return None,
        }
    };
    matches!(resolved.scheme(), "http" | "https").then_some(resolved)
}

/// Dedup identity: the resolved URL without fragment or rendition parameters.
/// Identifying parameters such as an image proxy's `url` are kept.
pub fn dedup_key(url: &Url) -> String {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !RENDITION_PARAMS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    let mut key = url.clone();
    key.set_fragment(None);
    if kept.is_empty() {
        key.set_query(None);
    } else {
        key.query_pairs_mut().clear().extend_pairs(kept);
    }
    key.to_string()
}

fn candidate_url(element: ElementRef<'_>) -> Option<String> {
    let value = element.value();
    SOURCE_ATTRS
        .iter()
        .filter_map(|attr| value.attr(attr))
        .map(str::trim)
        .find(|src| !src.is_empty() && !src.starts_with("data:"))
        .map(String::from)
        .or_else(|| {
            SRCSET_ATTRS
                .iter()
                .filter_map(|attr| value.attr(attr))
                .filter_map(|srcset| srcset.split(',').next()?.split_whitespace().next())
                .find(|src| !src.starts_with("data:"))
                .map(String::from)
        })
}

fn alt_text(element: ElementRef<'_>) -> String {
    let value = element.value();
    let mut text = String::new();
    for attr in ["alt", "title"] {
        if let Some(part) = value.attr(attr) {
            text.push_str(part);
            text.push(' ');
        }
    }
    text.to_lowercase()
}

fn is_noise(element: ElementRef<'_>, url: &Url) -> bool {
    let haystack = format!("{} {}", url.as_str().to_lowercase(), alt_text(element));
    if NOISE_KEYWORDS.iter().any(|kw| haystack.contains(kw)) {
        return true;
    }
    let in_chrome = element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|el| NOISE_TAGS.contains(&el.value().name()));
    in_chrome || has_marked_ancestor(element, NOISE_CLASS_MARKERS, NOISE_ANCESTOR_DEPTH)
}

fn is_plan(element: ElementRef<'_>, url: &Url) -> bool {
    PLAN_RE.is_match(&alt_text(element)) || PLAN_RE.is_match(url.path())
}

fn is_thumbnail(url: &Url) -> bool {
    url.query_pairs().any(|(key, value)| {
        THUMBNAIL_PARAMS.contains(&key.as_ref())
            && value
                .parse::<u32>()
                .is_ok_and(|px| px <= THUMBNAIL_MAX_PX)
    })
}

/// Building level named by a plan's alt text, or failing that its URL.
fn plan_level(alt: &str, url: &Url) -> Option<u8> {
    if alt.contains("мансард") || alt.contains("второго этаж") || alt.contains("второй этаж") {
        return Some(2);
    }
    if alt.contains("первого этаж") || alt.contains("первый этаж") {
        return Some(1);
    }
    LEVEL_DIGIT_RE
        .captures(alt)
        .or_else(|| LEVEL_URL_RE.captures(url.path()))
        .and_then(|caps| caps.get(1)?.as_str().parse().ok())
}

/// True when `element` or one of its first `depth` element ancestors has a
/// class containing any of `markers`.
fn has_marked_ancestor(element: ElementRef<'_>, markers: &[&str], depth: usize) -> bool {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .take(depth.saturating_add(1))
        .any(|el| {
            let class = class_of(el);
            !class.is_empty() && markers.iter().any(|m| class.contains(m))
        })
}
