//! Topic synthesis handler

use axum::{
    extract::{Query, State},
    Json,
};

use super::required;
use super::search::TopicQuery;
use crate::AppState;
use papercast_common::errors::Result;
use papercast_ingestion::TopicSynthesis;

/// Re-summarize and narrate every stored summary under a topic
pub async fn synthesize(
    State(state): State<AppState>,
    Query(query): Query<TopicQuery>,
) -> Result<Json<TopicSynthesis>> {
    let topic = required(query.topic, "topic")?;

    let synthesis = state.pipeline.synthesize_topic(&topic).await?;

    Ok(Json(synthesis))
}
