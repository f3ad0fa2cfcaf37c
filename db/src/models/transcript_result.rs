use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use strum::EnumIter;

/// Transcript result model representing the `transcript_results` table.
///
/// One row per transcript calculation, written by the worker on both success
/// and failure. On success `transcript` carries the full computed tree as
/// JSON; on failure `error` carries the reason. This is the queryable record
/// of the worker's fire-and-forget outcome message.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transcript_results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_id: i64,
    pub success: bool,
    pub message: Option<String>,
    pub error: Option<String>,
    pub transcript: Option<Json>,
    pub calculated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id"
    )]
    Student,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &DatabaseConnection,
        student_id: i64,
        success: bool,
        message: Option<String>,
        error: Option<String>,
        transcript: Option<Json>,
    ) -> Result<Self, DbErr> {
        let active = ActiveModel {
            student_id: Set(student_id),
            success: Set(success),
            message: Set(message),
            error: Set(error),
            transcript: Set(transcript),
            calculated_at: Set(Utc::now()),
            ..Default::default()
        };
        active.insert(db).await
    }

    /// Most recent calculation outcome for a student, if any.
    pub async fn get_latest_by_student_id(
        db: &DatabaseConnection,
        student_id: i64,
    ) -> Result<Option<Self>, DbErr> {
        Entity::find()
            .filter(Column::StudentId.eq(student_id))
            .order_by_desc(Column::CalculatedAt)
            .order_by_desc(Column::Id)
            .one(db)
            .await
    }

    /// Full calculation history for a student, newest first.
    pub async fn get_by_student_id(
        db: &DatabaseConnection,
        student_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(Column::StudentId.eq(student_id))
            .order_by_desc(Column::CalculatedAt)
            .order_by_desc(Column::Id)
            .all(db)
            .await
    }
}
