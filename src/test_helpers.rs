use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::domain::project::{Material, ProjectRecord};
use crate::error::Result;
use crate::ports::image_fetcher::{FetchedImage, ImageFetcher};
use crate::ports::project_source::ProjectSource;

type FetchProjectFn = Box<dyn Fn(u64, bool) -> Result<Option<ProjectRecord>> + Send + Sync>;
type FetchImageFn = Box<dyn Fn(&str) -> Result<Option<FetchedImage>> + Send + Sync>;

pub struct MockProjectSource {
    fetch_fn: Mutex<FetchProjectFn>,
    invalidations: AtomicUsize,
}

impl Default for MockProjectSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProjectSource {
    pub fn new() -> Self {
        Self {
            fetch_fn: Mutex::new(Box::new(|id, _| Ok(Some(make_record(id))))),
            invalidations: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_fetch(
        self,
        f: impl Fn(u64, bool) -> Result<Option<ProjectRecord>> + Send + Sync + 'static,
    ) -> Self {
        *self.fetch_fn.lock().unwrap() = Box::new(f);
        self
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProjectSource for MockProjectSource {
    async fn fetch_project(
        &self,
        project_id: u64,
        skip_eligibility_check: bool,
    ) -> Result<Option<ProjectRecord>> {
        let f = self.fetch_fn.lock().unwrap();
        f(project_id, skip_eligibility_check)
    }

    fn invalidate(&self, _project_id: u64) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockImageFetcher {
    fetch_fn: Mutex<FetchImageFn>,
}

impl Default for MockImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockImageFetcher {
    pub fn new() -> Self {
        Self {
            fetch_fn: Mutex::new(Box::new(|url| Ok(Some(make_image(url))))),
        }
    }

    #[must_use]
    pub fn with_fetch(
        self,
        f: impl Fn(&str) -> Result<Option<FetchedImage>> + Send + Sync + 'static,
    ) -> Self {
        *self.fetch_fn.lock().unwrap() = Box::new(f);
        self
    }
}

#[async_trait]
impl ImageFetcher for MockImageFetcher {
    async fn fetch_image(&self, url: &str) -> Result<Option<FetchedImage>> {
        let f = self.fetch_fn.lock().unwrap();
        f(url)
    }
}

// --- Factory functions ---

pub fn make_record(project_id: u64) -> ProjectRecord {
    let mut record = ProjectRecord::new(
        project_id,
        format!("https://строим.дом.рф/project/{project_id}"),
    );
    record.name = format!("Дом {project_id}");
    record.area = Some(120.5);
    record.material = Some(Material::GasConcrete);
    record.price = Some(5_500_000);
    record.bedrooms = Some(3);
    record.has_second_floor = true;
    record.photos = vec![format!("https://img.example.com/{project_id}/cover.jpg")];
    record.floor_plans = vec![format!("https://img.example.com/{project_id}/plan-1.jpg")];
    record.with_generated_description()
}

pub fn make_image(url: &str) -> FetchedImage {
    FetchedImage {
        bytes: url.as_bytes().to_vec(),
        content_type: "image/jpeg".to_string(),
    }
}
