//! Paper ingestion handlers

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use super::papers::PaperView;
use super::required;
use crate::AppState;
use papercast_common::errors::{AppError, Result};
use papercast_ingestion::UploadedPaper;

/// Request naming a document or page by URL
#[derive(Debug, Deserialize, Validate)]
pub struct UrlRequest {
    #[validate(url)]
    pub url: Option<String>,
}

/// Request naming a paper by DOI
#[derive(Debug, Deserialize, Validate)]
pub struct DoiRequest {
    #[validate(length(min = 1, max = 512))]
    pub doi: Option<String>,
}

fn invalid_body(rejection: JsonRejection) -> AppError {
    AppError::InvalidFormat {
        message: rejection.body_text(),
    }
}

fn invalid_multipart(e: MultipartError) -> AppError {
    AppError::InvalidFormat {
        message: e.body_text(),
    }
}

fn validate<T: Validate>(request: &T, field: &str) -> Result<()> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some(field.to_string()),
    })
}

/// Ingest an uploaded document (`file` part, optional `title` part)
pub async fn upload(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<PaperView>)> {
    let mut multipart = multipart.map_err(|rejection| AppError::InvalidFormat {
        message: rejection.body_text(),
    })?;

    let mut file = None;
    let mut title = None;

    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload.pdf").to_string();
                let bytes = field.bytes().await.map_err(invalid_multipart)?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("title") => {
                title = Some(field.text().await.map_err(invalid_multipart)?);
            }
            _ => {}
        }
    }

    let (filename, bytes) = file.ok_or_else(|| AppError::MissingField {
        field: "file".to_string(),
    })?;

    let paper = state
        .pipeline
        .ingest_upload(UploadedPaper {
            filename,
            bytes,
            title,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(paper.into())))
}

/// Ingest the document behind a URL
pub async fn process_url(
    State(state): State<AppState>,
    payload: std::result::Result<Json<UrlRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PaperView>)> {
    let Json(request) = payload.map_err(invalid_body)?;
    let url = required(request.url.clone(), "url")?;
    validate(&request, "url")?;

    let paper = state.pipeline.ingest_url(&url).await?;

    Ok((StatusCode::CREATED, Json(paper.into())))
}

/// Ingest the paper a DOI resolves to
pub async fn process_doi(
    State(state): State<AppState>,
    payload: std::result::Result<Json<DoiRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PaperView>)> {
    let Json(request) = payload.map_err(invalid_body)?;
    let doi = required(request.doi.clone(), "doi")?;
    validate(&request, "doi")?;

    let paper = state.pipeline.ingest_doi(&doi).await?;

    Ok((StatusCode::CREATED, Json(paper.into())))
}

/// Ingest the article text of an academic web page
pub async fn process_academic_url(
    State(state): State<AppState>,
    payload: std::result::Result<Json<UrlRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PaperView>)> {
    let Json(request) = payload.map_err(invalid_body)?;
    let url = required(request.url.clone(), "url")?;
    validate(&request, "url")?;

    let paper = state.pipeline.ingest_academic_page(&url).await?;

    Ok((StatusCode::CREATED, Json(paper.into())))
}
