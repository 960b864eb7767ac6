use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Kind of catalog entry a source serves.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Series,
    Film,
    Comic,
    Novel,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Series => "series",
            ContentType::Film => "film",
            ContentType::Comic => "comic",
            ContentType::Novel => "novel",
        }
    }

    /// Episodes for video content, chapters for text/image content.
    pub fn unit_label(&self) -> &'static str {
        match self {
            ContentType::Series | ContentType::Film => "episode",
            ContentType::Comic | ContentType::Novel => "chapter",
        }
    }
}

/// One entry of a listing or search page.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub source: String,
    pub slug: String,
    pub title: String,
    pub poster: String,
    pub content_type: ContentType,
    pub status: String,
    pub rating: String,
    pub latest_unit: String,
    pub genres: Vec<String>,
    pub source_url: String,
}

impl CatalogItem {
    pub fn new(source: &str, slug: String, content_type: ContentType) -> Self {
        Self {
            source: source.to_string(),
            slug,
            title: String::new(),
            poster: String::new(),
            content_type,
            status: String::new(),
            rating: String::new(),
            latest_unit: String::new(),
            genres: Vec::new(),
            source_url: String::new(),
        }
    }
}

/// Episode or chapter belonging to a [`ContentDetail`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub source: String,
    pub slug: String,
    /// Label as printed by the site; not guaranteed numeric or contiguous.
    pub number: String,
    pub title: String,
    pub source_url: String,
    pub date: Option<String>,
}

/// Full page for a series, film, comic or novel.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentDetail {
    #[serde(flatten)]
    pub item: CatalogItem,
    pub synopsis: String,
    pub alternate_titles: Vec<String>,
    pub studio: String,
    pub author: String,
    pub release_info: String,
    /// Ascending by number.
    pub units: Vec<Unit>,
}

/// A resolved playback candidate for a unit.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct StreamServer {
    pub name: String,
    pub url: String,
    pub quality: Option<String>,
}

/// Playback candidates for one unit. `servers` may be empty.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnitStream {
    pub source: String,
    pub unit_slug: String,
    pub title: String,
    pub servers: Vec<StreamServer>,
    /// Page images for chapters of comic sources.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<String>,
    /// Reader text for chapters of novel sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl UnitStream {
    pub fn empty(source: &str, unit_slug: &str) -> Self {
        Self {
            source: source.to_string(),
            unit_slug: unit_slug.to_string(),
            title: String::new(),
            servers: Vec::new(),
            pages: Vec::new(),
            text: None,
        }
    }
}

/// Paged envelope handed to the API layer.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub data: Vec<T>,
    /// Inferred from pagination controls, may be approximate.
    pub has_next: bool,
}

impl<T> PagedResult<T> {
    pub fn new(data: Vec<T>, has_next: bool) -> Self {
        Self { data, has_next }
    }

    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            has_next: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub source: String,
    pub title: String,
    pub slug: String,
    /// HH:MM in the source's local time, empty when unknown.
    pub release_time: String,
    pub day: Weekday,
    pub poster: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    pub day: Weekday,
    pub entries: Vec<ScheduleEntry>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Genre {
    pub name: String,
    pub slug: String,
}

/// Describes one registered source for the API layer.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub name: String,
    pub content_type: ContentType,
    pub base_url: String,
    pub rendered: bool,
}
