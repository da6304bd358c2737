//! Paper entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "papers")]
pub struct Model {
    /// Assigned by storage on insert
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub doi: Option<String>,

    /// Uploaded document, relative to the media root
    #[sea_orm(column_type = "Text", nullable)]
    pub file: Option<String>,

    pub uploaded_at: DateTimeWithTimeZone,

    /// One of the configured topic labels, or empty
    #[sea_orm(column_type = "Text")]
    pub topic: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub summary: Option<String>,

    /// Narration, relative to the media root
    #[sea_orm(column_type = "Text", nullable)]
    pub audio: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub source_url: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub citation: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
