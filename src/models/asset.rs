//! Catalog resources and their normalized gallery shape.
//!
//! Each category endpoint returns its own record layout. `Asset::from_record`
//! flattens any of them into `{id, name, image_url, type}` and keeps the
//! original record in `raw`.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "places")]
    Places,
    #[serde(rename = "football-clubs")]
    FootballClubs,
    #[serde(rename = "thing-icos")]
    ThingIcons,
    #[serde(rename = "companies")]
    Companies,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Places,
        Category::FootballClubs,
        Category::ThingIcons,
        Category::Companies,
    ];

    /// API slug, also the listing endpoint path.
    pub fn slug(&self) -> &'static str {
        match self {
            Category::Places => "places",
            Category::FootballClubs => "football-clubs",
            Category::ThingIcons => "thing-icos",
            Category::Companies => "companies",
        }
    }

    /// Value of `Asset::kind` for records of this category.
    pub fn asset_type(&self) -> &'static str {
        match self {
            Category::Places => "place",
            Category::FootballClubs => "club",
            Category::ThingIcons => "icon",
            Category::Companies => "company",
        }
    }

    /// Record fields holding the image, most specific first.
    fn image_fields(&self) -> &'static [&'static str] {
        match self {
            Category::Places => &["image_url", "image", "photo", "url"],
            Category::FootballClubs => &["logo_url", "logo", "badge", "image_url", "image"],
            Category::ThingIcons => &["icon_url", "icon", "svg", "image_url", "url"],
            Category::Companies => &["logo_url", "logo", "image_url", "image"],
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

impl std::str::FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.slug() == s.trim())
            .ok_or_else(|| AppError::InvalidInput(format!("unknown category '{}'", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub last_page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub total: u64,
}

impl PageMeta {
    pub fn has_more(&self) -> bool {
        self.current_page < self.last_page
    }
}

/// `{ data: [...], meta: {...} }` listing envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Asset {
    pub id: String,
    pub name: String,
    pub image_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub raw: serde_json::Value,
}

impl Asset {
    pub fn from_record(category: Category, record: serde_json::Value) -> Self {
        let id = match record.get("id") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };

        let name = ["name", "title", "label"]
            .iter()
            .find_map(|k| record.get(*k).and_then(|v| v.as_str()))
            .unwrap_or_default()
            .to_string();

        let image_url = category
            .image_fields()
            .iter()
            .find_map(|k| record.get(*k).and_then(|v| v.as_str()))
            .filter(|s| !s.is_empty())
            .map(String::from);

        Self {
            id,
            name,
            image_url,
            kind: category.asset_type(),
            raw: record,
        }
    }
}
