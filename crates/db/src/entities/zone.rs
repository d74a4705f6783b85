//! Zone entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Admin-managed service zone with a boundary polygon.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "zone")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub name: String,

    /// Boundary polygon as a JSON array of `[latitude, longitude]` pairs.
    #[sea_orm(column_type = "JsonBinary")]
    pub polygon: Json,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
