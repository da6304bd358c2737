//! Paper retrieval handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::AppState;
use papercast_common::{
    db::models::Paper,
    errors::{AppError, Result},
};

/// Serialized view of a paper record
#[derive(Debug, Serialize)]
pub struct PaperView {
    pub id: i32,
    pub title: String,
    pub doi: Option<String>,
    /// Uploaded document, relative to the media root
    pub file: Option<String>,
    pub uploaded_at: String,
    pub topic: String,
    pub summary: Option<String>,
    /// Narration, relative to the media root
    pub audio: Option<String>,
    pub source_url: Option<String>,
    pub citation: Option<String>,
}

impl From<Paper> for PaperView {
    fn from(paper: Paper) -> Self {
        Self {
            id: paper.id,
            title: paper.title,
            doi: paper.doi,
            file: paper.file,
            uploaded_at: paper.uploaded_at.to_rfc3339(),
            topic: paper.topic,
            summary: paper.summary,
            audio: paper.audio,
            source_url: paper.source_url,
            citation: paper.citation,
        }
    }
}

/// List every paper
pub async fn list_papers(State(state): State<AppState>) -> Result<Json<Vec<PaperView>>> {
    let papers = state.pipeline.repository().list_papers().await?;

    Ok(Json(papers.into_iter().map(PaperView::from).collect()))
}

/// Get a paper by ID; an id that is not a number names no paper
pub async fn get_paper(
    State(state): State<AppState>,
    Path(paper_id): Path<String>,
) -> Result<Json<PaperView>> {
    let not_found = || AppError::PaperNotFound {
        id: paper_id.clone(),
    };

    let id: i32 = paper_id.trim().parse().map_err(|_| not_found())?;
    let paper = state
        .pipeline
        .repository()
        .find_paper_by_id(id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(paper.into()))
}
