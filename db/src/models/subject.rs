use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use strum::EnumIter;

/// Subject model representing the `subjects` table.
///
/// `criteria` holds the grouped-form pass/fail document (one PASS group and
/// one FAIL group of chained rules) as raw JSON. The transcript engine owns
/// the schema and parses it at calculation time; `services` validates it at
/// write time.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subjects")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub block_id: i64,
    pub name: String,
    /// Non-negative multiplier applied to the sum of the subject's weighted marks.
    pub coefficient: f64,
    pub criteria: Json,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::block::Entity",
        from = "Column::BlockId",
        to = "super::block::Column::Id"
    )]
    Block,
    #[sea_orm(has_many = "super::test::Entity")]
    Test,
}

impl Related<super::block::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Block.def()
    }
}

impl Related<super::test::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Test.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &DatabaseConnection,
        block_id: i64,
        name: &str,
        coefficient: f64,
        criteria: Json,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = ActiveModel {
            block_id: Set(block_id),
            name: Set(name.to_string()),
            coefficient: Set(coefficient),
            criteria: Set(criteria),
            deleted: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        active.insert(db).await
    }

    pub async fn get_by_id(db: &DatabaseConnection, id: i64) -> Result<Option<Self>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    /// Batched lookup: all non-deleted subjects whose id is in `ids`, one query.
    pub async fn get_by_ids(db: &DatabaseConnection, ids: &[i64]) -> Result<Vec<Self>, DbErr> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Entity::find()
            .filter(Column::Id.is_in(ids.iter().copied()))
            .filter(Column::Deleted.eq(false))
            .all(db)
            .await
    }

    /// Get all non-deleted subjects for a block.
    pub async fn get_by_block_id(
        db: &DatabaseConnection,
        block_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(Column::BlockId.eq(block_id))
            .filter(Column::Deleted.eq(false))
            .all(db)
            .await
    }
}
