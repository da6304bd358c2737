//! Search-and-ingest handler

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::papers::PaperView;
use super::required;
use crate::AppState;
use papercast_common::errors::Result;

/// `?topic=` query shared by search and synthesis
#[derive(Debug, Deserialize)]
pub struct TopicQuery {
    pub topic: Option<String>,
}

/// Discover papers for a topic and ingest every result
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<TopicQuery>,
) -> Result<(StatusCode, Json<Vec<PaperView>>)> {
    let topic = required(query.topic, "topic")?;

    let papers = state.pipeline.ingest_search(&topic).await?;
    tracing::info!(topic = %topic, count = papers.len(), "Search results ingested");

    Ok((
        StatusCode::CREATED,
        Json(papers.into_iter().map(PaperView::from).collect()),
    ))
}
