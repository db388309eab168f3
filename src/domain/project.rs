use serde::{Deserialize, Serialize};

use crate::domain::description::render_description;

/// Wall material, restricted to the two families the catalog tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Material {
    #[serde(rename = "брус")]
    Brus,
    #[serde(rename = "газобетон")]
    GasConcrete,
}

impl Material {
    /// Lower-case catalog name, as stored and filtered on.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Brus => "брус",
            Self::GasConcrete => "газобетон",
        }
    }

    /// Badge form: "Брус", "Газобетон".
    pub fn title(self) -> &'static str {
        match self {
            Self::Brus => "Брус",
            Self::GasConcrete => "Газобетон",
        }
    }

    /// Genitive form used in "дом из ...".
    pub fn genitive(self) -> &'static str {
        match self {
            Self::Brus => "бруса",
            Self::GasConcrete => "газобетона",
        }
    }
}

impl std::fmt::Display for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub project_id: u64,
    pub name: String,
    pub area: Option<f64>,
    pub material: Option<Material>,
    pub price: Option<u64>,
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub has_kitchen_living: bool,
    #[serde(default)]
    pub has_garage: bool,
    #[serde(default)]
    pub has_second_floor: bool,
    #[serde(default)]
    pub has_terrace: bool,
    #[serde(default)]
    pub description: String,
    /// Derived from the other fields; never trusted when read back.
    #[serde(default, skip_deserializing)]
    pub generated_description: String,
    #[serde(default, alias = "images")]
    pub photos: Vec<String>,
    #[serde(default)]
    pub floor_plans: Vec<String>,
    pub url: String,
}

impl ProjectRecord {
    /// Empty record for `project_id`, with the fallback name and no data.
    pub fn new(project_id: u64, url: impl Into<String>) -> Self {
        Self {
            project_id,
            name: fallback_name(project_id),
            area: None,
            material: None,
            price: None,
            bedrooms: None,
            has_kitchen_living: false,
            has_garage: false,
            has_second_floor: false,
            has_terrace: false,
            description: String::new(),
            generated_description: String::new(),
            photos: Vec::new(),
            floor_plans: Vec::new(),
            url: url.into(),
        }
    }

    /// Recompute `generated_description` from the current fields.
    #[must_use]
    pub fn with_generated_description(mut self) -> Self {
        self.generated_description = render_description(&self);
        self
    }

    pub fn cover(&self) -> Option<&str> {
        self.photos.first().map(String::as_str)
    }
}

pub fn fallback_name(project_id: u64) -> String {
    format!("Проект {project_id}")
}

/// Area formatted the Russian way: "120", "120,5".
pub fn format_area(area: f64) -> String {
    if area.fract().abs() < f64::EPSILON {
        format!("{area:.0}")
    } else {
        area.to_string().replace('.', ",")
    }
}

/// Price with thin grouping: 5500000 -> "5 500 000".
pub fn format_price(price: u64) -> String {
    let digits = price.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

impl std::fmt::Display for ProjectRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "# {}", self.name)?;
        writeln!(f, "Project ID: {}", self.project_id)?;
        if let Some(area) = self.area {
            writeln!(f, "Площадь: {} м²", format_area(area))?;
        }
        if let Some(material) = self.material {
            writeln!(f, "Материал: {material}")?;
        }
        if let Some(price) = self.price {
            writeln!(f, "Цена: {} ₽", format_price(price))?;
        }
        if let Some(bedrooms) = self.bedrooms {
            writeln!(f, "Спальни: {bedrooms}")?;
        }
        let mut features = Vec::new();
        if self.has_kitchen_living {
            features.push("кухня-гостиная");
        }
        if self.has_garage {
            features.push("гараж");
        }
        if self.has_second_floor {
            features.push("второй этаж");
        }
        if self.has_terrace {
            features.push("терраса");
        }
        if !features.is_empty() {
            writeln!(f, "Особенности: {}", features.join(", "))?;
        }
        if !self.generated_description.is_empty() {
            writeln!(f, "\n## Описание\n{}", self.generated_description)?;
        } else if !self.description.is_empty() {
            writeln!(f, "\n## Описание\n{}", self.description)?;
        }
        if !self.photos.is_empty() {
            writeln!(f, "\n## Фото ({})", self.photos.len())?;
            for photo in &self.photos {
                writeln!(f, "- {photo}")?;
            }
        }
        if !self.floor_plans.is_empty() {
            writeln!(f, "\n## Планировки ({})", self.floor_plans.len())?;
            for plan in &self.floor_plans {
                writeln!(f, "- {plan}")?;
            }
        }
        writeln!(f, "\nURL: {}", self.url)?;
        Ok(())
    }
}
