use std::{
    path::{Path as FsPath, PathBuf},
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    AppState,
    error::{AppError, AppResult},
    ingest,
    models::{
        ListParams, ListResponse, MessageResponse, SavedImage, SpreadsheetResponse, TitleEntry,
        UploadResponse, ViewKind,
    },
};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];
const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls"];

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    page: Option<u64>,
    limit: Option<u64>,
    search: Option<String>,
    view: Option<String>,
}

pub async fn list_resources(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<ListResponse>> {
    let view = q.view.as_deref().and_then(ViewKind::from_param);
    let params = ListParams::new(q.page, q.limit, q.search.unwrap_or_default(), view);

    let (total, data) = state.store.list(&params).await?;

    Ok(Json(ListResponse { total, data, page: params.page, limit: params.limit }))
}

pub async fn create_resources(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let mut movie_name = String::new();
    let mut titles: Vec<TitleEntry> = Vec::new();
    let mut saved: Vec<SavedImage> = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "movieName" => {
                movie_name = field.text().await?.trim().to_string();
            }
            "titles" => {
                let raw = field.text().await?;
                if !raw.trim().is_empty() {
                    titles = serde_json::from_str(&raw).map_err(|e| {
                        AppError::Invalid(format!("titles must be a JSON array: {e}"))
                    })?;
                }
            }
            "images" => {
                let original = field.file_name().unwrap_or_default().to_string();
                let ext = checked_extension(&original, IMAGE_EXTENSIONS)
                    .ok_or_else(|| AppError::Invalid("only image files are allowed".to_string()))?;

                let bytes = field.bytes().await?;
                if bytes.len() > state.config.max_file_bytes {
                    return Err(AppError::Invalid(format!(
                        "image {original} exceeds the {} byte limit",
                        state.config.max_file_bytes
                    )));
                }

                let filename = unique_filename(&ext);
                tokio::fs::write(state.config.upload_dir.join(&filename), &bytes).await?;
                debug!(file = %filename, original = %original, size = bytes.len(), "stored image");

                saved.push(SavedImage { url: format!("/uploads/{filename}"), name: original });
            }
            _ => {}
        }
    }

    let urls: Vec<String> = saved.iter().map(|img| img.url.clone()).collect();
    let inserted = ingest::ingest_upload(&state.store, &movie_name, &titles, &urls).await?;
    info!(
        movie_name = %movie_name,
        titles = titles.len(),
        images = saved.len(),
        inserted = inserted,
        "upload ingested"
    );

    Ok(Json(UploadResponse {
        message: "upload complete".to_string(),
        movie_name,
        titles_count: titles.len(),
        images_count: saved.len(),
        images: saved,
    }))
}

pub async fn upload_spreadsheet(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<SpreadsheetResponse>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("xlsx") {
            continue;
        }

        let original = field.file_name().unwrap_or_default().to_string();
        let ext = checked_extension(&original, SPREADSHEET_EXTENSIONS).ok_or_else(|| {
            AppError::Invalid("only .xlsx and .xls files are allowed".to_string())
        })?;

        let bytes = field.bytes().await?;
        let spool = TempSpool(std::env::temp_dir().join(unique_filename(&ext)));
        tokio::fs::write(&spool.0, &bytes).await?;

        let inserted = ingest::ingest_spreadsheet(&state.store, &spool.0).await?;
        info!(original = %original, inserted = inserted, "spreadsheet ingested");

        return Ok(Json(SpreadsheetResponse {
            message: "spreadsheet imported".to_string(),
            titles_count: inserted,
        }));
    }

    Err(AppError::Invalid("an xlsx file field is required".to_string()))
}

pub async fn delete_resource(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<Json<MessageResponse>> {
    state.store.delete_by_id(id).await?;
    info!(id = id, "resource deleted");
    Ok(Json(MessageResponse { message: "deleted".to_string() }))
}

// The spooled spreadsheet must disappear on every exit path, including parse
// and mid-transaction failures.
struct TempSpool(PathBuf);

impl Drop for TempSpool {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.0) {
            warn!(path = %self.0.display(), error = %err, "failed to remove temp spreadsheet");
        }
    }
}

fn checked_extension(filename: &str, allowed: &[&str]) -> Option<String> {
    let ext = FsPath::new(filename).extension()?.to_str()?.to_ascii_lowercase();
    allowed.contains(&ext.as_str()).then_some(ext)
}

fn unique_filename(ext: &str) -> String {
    let millis = jiff::Timestamp::now().as_millisecond();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default();
    format!("{millis}-{nanos}.{ext}")
}
