use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use tracing::{debug, warn};

use crate::{
    error::{AppError, AppResult},
    models::{NewResource, TitleEntry},
    store::ResourceStore,
};

// Titles carry their movie name in 《》 brackets, e.g. "《Foo Bar》 Episode 1".
// The first bracketed segment wins; no brackets means no name.
pub fn extract_movie_name(title: &str) -> &str {
    let Some(start) = title.find('《') else {
        return "";
    };
    let rest = &title[start + '《'.len_utf8()..];
    let Some(end) = rest.find('》') else {
        return "";
    };
    &rest[..end]
}

pub struct Batch {
    pub rows: Vec<NewResource>,
    pub skipped_titles: usize,
}

pub fn build_batch(movie_name: &str, titles: &[TitleEntry], image_urls: &[String]) -> Batch {
    let mut rows = Vec::with_capacity(image_urls.len() + titles.len());
    let mut skipped = 0;

    for url in image_urls {
        if movie_name.is_empty() {
            warn!(url = %url, "storing image without a movie name");
        }
        rows.push(NewResource {
            movie_name: movie_name.to_string(),
            title: None,
            image_url: Some(url.clone()),
            views: 0,
        });
    }

    for entry in titles {
        let text = entry.title().trim();
        if text.is_empty() {
            skipped += 1;
            continue;
        }

        // An explicit movie name covers every title in the batch; otherwise
        // each title must carry its own.
        let name = if movie_name.is_empty() { extract_movie_name(text) } else { movie_name };
        if name.is_empty() {
            debug!(title = %text, "no movie name derivable, skipping title");
            skipped += 1;
            continue;
        }

        rows.push(NewResource {
            movie_name: name.to_string(),
            title: Some(text.to_string()),
            image_url: None,
            views: entry.views(),
        });
    }

    Batch { rows, skipped_titles: skipped }
}

pub async fn ingest_upload(
    store: &ResourceStore,
    movie_name: &str,
    titles: &[TitleEntry],
    image_urls: &[String],
) -> AppResult<usize> {
    let batch = build_batch(movie_name, titles, image_urls);
    if batch.skipped_titles > 0 {
        debug!(skipped = batch.skipped_titles, "titles skipped during ingest");
    }
    store.insert_batch(batch.rows).await
}

pub async fn ingest_spreadsheet(store: &ResourceStore, path: &Path) -> AppResult<usize> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| AppError::Invalid(format!("could not read spreadsheet: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::Invalid("spreadsheet has no worksheets".to_string()))?
        .map_err(|e| AppError::Invalid(format!("could not read spreadsheet: {e}")))?;

    let mut rows = Vec::new();
    let mut skipped = 0;

    for cells in range.rows() {
        let Some((title, views)) = row_candidate(cells) else {
            skipped += 1;
            continue;
        };
        let name = extract_movie_name(&title).to_string();
        if name.is_empty() {
            debug!(title = %title, "no movie name derivable, skipping spreadsheet row");
            skipped += 1;
            continue;
        }
        rows.push(NewResource { movie_name: name, title: Some(title), image_url: None, views });
    }

    debug!(rows = rows.len(), skipped = skipped, "parsed spreadsheet");
    store.insert_batch(rows).await
}

fn row_candidate(cells: &[Data]) -> Option<(String, i32)> {
    let title = match cells.first() {
        None | Some(Data::Empty) => return None,
        Some(cell) => cell.to_string().trim().to_string(),
    };
    if title.is_empty() {
        return None;
    }

    // Anything that does not fit a view counter falls back to zero, same as
    // unparseable strings.
    let views = match cells.get(1) {
        Some(Data::Int(i)) => i32::try_from(*i).unwrap_or(0),
        Some(Data::Float(f)) => {
            if f.is_finite() && (i32::MIN as f64..=i32::MAX as f64).contains(f) {
                *f as i32
            } else {
                0
            }
        }
        Some(Data::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    };

    Some((title, views))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListParams;

    #[test]
    fn extracts_bracketed_movie_name() {
        assert_eq!(extract_movie_name("《Foo Bar》 Episode 1"), "Foo Bar");
        assert_eq!(extract_movie_name("intro 《X》 Ep2 《Y》"), "X");
        assert_eq!(extract_movie_name("no brackets"), "");
        assert_eq!(extract_movie_name("《unclosed"), "");
        assert_eq!(extract_movie_name("《》 empty"), "");
    }

    #[test]
    fn explicit_movie_name_overrides_extraction() {
        let titles = vec![
            TitleEntry::Plain("《Other》 Ep1".to_string()),
            TitleEntry::Plain("plain title".to_string()),
        ];
        let batch = build_batch("Chosen", &titles, &[]);

        assert_eq!(batch.rows.len(), 2);
        assert!(batch.rows.iter().all(|r| r.movie_name == "Chosen"));
        assert_eq!(batch.skipped_titles, 0);
    }

    #[test]
    fn titles_without_derivable_name_are_skipped() {
        let titles = vec![
            TitleEntry::Plain("《Foo》 Ep1".to_string()),
            TitleEntry::Plain("no name here".to_string()),
            TitleEntry::Plain("   ".to_string()),
        ];
        let batch = build_batch("", &titles, &[]);

        assert_eq!(batch.rows.len(), 1);
        assert_eq!(batch.rows[0].movie_name, "Foo");
        assert_eq!(batch.rows[0].title.as_deref(), Some("《Foo》 Ep1"));
        assert_eq!(batch.skipped_titles, 2);
    }

    #[test]
    fn image_rows_keep_empty_movie_name() {
        let urls = vec!["/uploads/a.png".to_string(), "/uploads/b.png".to_string()];
        let batch = build_batch("", &[], &urls);

        assert_eq!(batch.rows.len(), 2);
        assert!(batch.rows.iter().all(|r| r.movie_name.is_empty()));
        assert_eq!(batch.rows[0].image_url.as_deref(), Some("/uploads/a.png"));
    }

    #[test]
    fn structured_views_are_carried_through() {
        let raw = r#"[{"title": "《X》 Ep1", "views": 42}, "《X》 Ep2"]"#;
        let titles: Vec<TitleEntry> = serde_json::from_str(raw).unwrap();
        let batch = build_batch("", &titles, &[]);

        assert_eq!(batch.rows[0].views, 42);
        assert_eq!(batch.rows[1].views, 0);
    }

    #[test]
    fn spreadsheet_rows_filter_on_first_cell() {
        let row = vec![Data::String("《X》 Ep1".to_string()), Data::String("42".to_string())];
        assert_eq!(row_candidate(&row), Some(("《X》 Ep1".to_string(), 42)));

        let row = vec![Data::String("".to_string()), Data::String("5".to_string())];
        assert_eq!(row_candidate(&row), None);

        let row = vec![Data::Empty, Data::Int(5)];
        assert_eq!(row_candidate(&row), None);

        let row = vec![Data::String("  《Y》 Ep2  ".to_string())];
        assert_eq!(row_candidate(&row), Some(("《Y》 Ep2".to_string(), 0)));

        let row = vec![Data::String("《Z》".to_string()), Data::Float(7.0)];
        assert_eq!(row_candidate(&row), Some(("《Z》".to_string(), 7)));

        let row = vec![Data::String("《W》".to_string()), Data::String("many".to_string())];
        assert_eq!(row_candidate(&row), Some(("《W》".to_string(), 0)));
    }

    #[test]
    fn oversized_view_counts_fall_back_to_zero() {
        let row = vec![Data::String("《X》 Ep1".to_string()), Data::Int(i64::MAX)];
        assert_eq!(row_candidate(&row), Some(("《X》 Ep1".to_string(), 0)));

        let row = vec![Data::String("《X》 Ep2".to_string()), Data::Float(1e12)];
        assert_eq!(row_candidate(&row), Some(("《X》 Ep2".to_string(), 0)));

        let row = vec![Data::String("《X》 Ep3".to_string()), Data::Float(f64::NAN)];
        assert_eq!(row_candidate(&row), Some(("《X》 Ep3".to_string(), 0)));
    }

    #[tokio::test]
    async fn upload_ingest_is_atomic_per_request() {
        let db = crate::db::connect_and_migrate("sqlite::memory:").await.unwrap();
        let store = ResourceStore::new(db);

        let titles = vec![
            TitleEntry::Plain("《Foo》 Ep1".to_string()),
            TitleEntry::Plain("a plain episode title".to_string()),
        ];
        let urls = vec!["/uploads/poster.png".to_string()];
        let inserted = ingest_upload(&store, "Foo", &titles, &urls).await.unwrap();

        // The explicit name covers the title without brackets too.
        assert_eq!(inserted, 3);

        let (total, _) =
            store.list(&ListParams::new(None, None, String::new(), None)).await.unwrap();
        assert_eq!(total, 3);
    }
}
