use scraper::Html;
use tracing::{debug, info};

use crate::adapters::scraper::eligibility::is_eligible;
use crate::adapters::scraper::hydration::{
    hydrated_floor_plans, hydrated_material, hydrated_project,
};
use crate::adapters::scraper::images::{classify_images, select_plan_levels};
use crate::adapters::scraper::locators::{
    locate_amenities, locate_area, locate_bedrooms, locate_description, locate_floor_count,
    locate_material, locate_name, locate_price,
};
use crate::adapters::scraper::scope::PageView;
use crate::domain::project::{Material, ProjectRecord};

pub const DEFAULT_BASE_URL: &str = "https://строим.дом.рф";
pub const DEFAULT_CONTRACTOR_ID: u64 = 9465;
pub const DEFAULT_CONTRACTOR_NAME: &str = "Юрова Любовь Владимировна";
pub const DEFAULT_TEXT_WINDOW_CHARS: usize = 4000;

/// Knobs for a single extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Extract even when the page shows no sign of the configured contractor.
    pub skip_eligibility_check: bool,
    /// Site origin used for project URLs and relative image paths.
    pub base_url: String,
    pub contractor_id: u64,
    pub contractor_names: Vec<String>,
    /// Length of the leading text slice searched by the regex fallbacks.
    pub text_window_chars: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            skip_eligibility_check: false,
            base_url: DEFAULT_BASE_URL.to_string(),
            contractor_id: DEFAULT_CONTRACTOR_ID,
            contractor_names: vec![DEFAULT_CONTRACTOR_NAME.to_string()],
            text_window_chars: DEFAULT_TEXT_WINDOW_CHARS,
        }
    }
}

impl ExtractOptions {
    #[must_use]
    pub fn skipping_eligibility(mut self, skip: bool) -> Self {
        self.skip_eligibility_check = skip;
        self
    }
}

/// Canonical page URL of a project.
pub fn project_url(base_url: &str, project_id: u64) -> String {
    format!("{}/project/{project_id}", base_url.trim_end_matches('/'))
}

/// Turn a project page into a record.
///
/// Returns `None` only when the eligibility gate rejects the page; every
/// field that cannot be found is left empty instead.
pub fn extract_project(
    html: &str,
    project_id: u64,
    options: &ExtractOptions,
) -> Option<ProjectRecord> {
    let document = Html::parse_document(html);
    let page = PageView::new(&document, options.text_window_chars);

    if !options.skip_eligibility_check
        && !is_eligible(&page, options.contractor_id, &options.contractor_names)
    {
        info!(
            project_id,
            contractor_id = options.contractor_id,
            "project does not belong to contractor, skipping"
        );
        return None;
    }

    let mut record = ProjectRecord::new(project_id, project_url(&options.base_url, project_id));
    if let Some(name) = locate_name(&page) {
        record.name = name;
    }
    record.description = locate_description(&page);
    record.area = locate_area(&page);
    record.price = locate_price(&page);
    record.bedrooms = locate_bedrooms(&page);

    let amenities = locate_amenities(&page, locate_floor_count(&page));
    record.has_kitchen_living = amenities.kitchen_living;
    record.has_garage = amenities.garage;
    record.has_terrace = amenities.terrace;
    record.has_second_floor = amenities.second_floor;

    let hydrated = hydrated_project(&document);
    record.material = material_of(hydrated.as_ref(), &page);

    let images = classify_images(&document, &options.base_url, record.has_second_floor);
    record.photos = images.photos;
    record.floor_plans = if images.floor_plans.is_empty() {
        hydrated
            .as_ref()
            .map(|project| {
                select_plan_levels(
                    hydrated_floor_plans(project, &options.base_url),
                    record.has_second_floor,
                )
            })
            .unwrap_or_default()
    } else {
        images.floor_plans
    };

    info!(
        project_id,
        name = %record.name,
        material = ?record.material,
        photos = record.photos.len(),
        floor_plans = record.floor_plans.len(),
        "project extracted"
    );
    Some(record.with_generated_description())
}

/// Wall material alone, as `extract_project` would report it.
pub fn extract_material(html: &str) -> Option<Material> {
    let document = Html::parse_document(html);
    let page = PageView::new(&document, DEFAULT_TEXT_WINDOW_CHARS);
    material_of(hydrated_project(&document).as_ref(), &page)
}

/// Floor plans alone, as `extract_project` would report them with default
/// options.
pub fn extract_floor_plans(html: &str) -> Vec<String> {
    extract_project(
        html,
        0,
        &ExtractOptions::default().skipping_eligibility(true),
    )
    .map(|record| record.floor_plans)
    .unwrap_or_default()
}

/// The hydration payload's material code wins over DOM labels.
fn material_of(hydrated: Option<&serde_json::Value>, page: &PageView<'_>) -> Option<Material> {
    if let Some(material) = hydrated.and_then(hydrated_material) {
        debug!(material = %material, source = "hydration", "material located");
        return Some(material);
    }
    locate_material(page)
}
