use serde::{Deserialize, Deserializer, Serialize};

use crate::entities::resource;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ViewKind {
    Images,
    Titles,
}

impl ViewKind {
    pub fn from_param(s: &str) -> Option<Self> {
        match s {
            "images" => Some(ViewKind::Images),
            "titles" => Some(ViewKind::Titles),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ListParams {
    pub page: u64,
    pub limit: u64,
    pub search: String,
    pub view: Option<ViewKind>,
}

impl ListParams {
    pub fn new(page: Option<u64>, limit: Option<u64>, search: String, view: Option<ViewKind>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(12).max(1),
            search,
            view,
        }
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewResource {
    pub movie_name: String,
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub views: i32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum TitleEntry {
    Plain(String),
    Detailed {
        title: String,
        #[serde(default, deserialize_with = "lenient_views")]
        views: i32,
    },
}

impl TitleEntry {
    pub fn title(&self) -> &str {
        match self {
            TitleEntry::Plain(s) => s,
            TitleEntry::Detailed { title, .. } => title,
        }
    }

    pub fn views(&self) -> i32 {
        match self {
            TitleEntry::Plain(_) => 0,
            TitleEntry::Detailed { views, .. } => *views,
        }
    }
}

// Clients send view counts as numbers, numeric strings, or garbage; anything
// unparseable counts as zero rather than failing the whole batch.
fn lenient_views<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_i64().unwrap_or(0) as i32,
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub total: u64,
    pub data: Vec<resource::Model>,
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Serialize)]
pub struct SavedImage {
    pub url: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub movie_name: String,
    pub titles_count: usize,
    pub images_count: usize,
    pub images: Vec<SavedImage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetResponse {
    pub message: String,
    pub titles_count: usize,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_entries_parse_from_mixed_json() {
        let raw = r#"["plain one", {"title": "detailed", "views": 7}, {"title": "no views"}]"#;
        let entries: Vec<TitleEntry> = serde_json::from_str(raw).unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].title(), "plain one");
        assert_eq!(entries[0].views(), 0);
        assert_eq!(entries[1].title(), "detailed");
        assert_eq!(entries[1].views(), 7);
        assert_eq!(entries[2].views(), 0);
    }

    #[test]
    fn non_numeric_views_default_to_zero() {
        let raw = r#"[{"title": "a", "views": "42"}, {"title": "b", "views": "lots"}, {"title": "c", "views": null}]"#;
        let entries: Vec<TitleEntry> = serde_json::from_str(raw).unwrap();

        assert_eq!(entries[0].views(), 42);
        assert_eq!(entries[1].views(), 0);
        assert_eq!(entries[2].views(), 0);
    }

    #[test]
    fn list_params_clamp_to_sane_defaults() {
        let p = ListParams::new(None, None, String::new(), None);
        assert_eq!((p.page, p.limit, p.offset()), (1, 12, 0));

        let p = ListParams::new(Some(0), Some(0), String::new(), None);
        assert_eq!((p.page, p.limit), (1, 1));

        let p = ListParams::new(Some(3), Some(12), String::new(), None);
        assert_eq!(p.offset(), 24);
    }

    #[test]
    fn offset_saturates_on_extreme_pagination() {
        let p = ListParams::new(Some(u64::MAX), Some(12), String::new(), None);
        assert_eq!(p.offset(), u64::MAX);

        let p = ListParams::new(Some(2), Some(u64::MAX), String::new(), None);
        assert_eq!(p.offset(), u64::MAX);
    }

    #[test]
    fn view_kind_parses_known_values_only() {
        assert_eq!(ViewKind::from_param("images"), Some(ViewKind::Images));
        assert_eq!(ViewKind::from_param("titles"), Some(ViewKind::Titles));
        assert_eq!(ViewKind::from_param(""), None);
        assert_eq!(ViewKind::from_param("all"), None);
    }
}
