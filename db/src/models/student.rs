use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use strum::EnumIter;

/// Student model representing the `students` table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "students")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub school_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::school::Entity",
        from = "Column::SchoolId",
        to = "super::school::Column::Id"
    )]
    School,
    #[sea_orm(has_many = "super::student_test_result::Entity")]
    StudentTestResult,
}

impl Related<super::school::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::School.def()
    }
}

impl Related<super::student_test_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudentTestResult.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &DatabaseConnection,
        school_id: i64,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = ActiveModel {
            school_id: Set(school_id),
            first_name: Set(first_name.to_string()),
            last_name: Set(last_name.to_string()),
            email: Set(email.to_string()),
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

    /// Get all non-deleted students for a school.
    pub async fn get_by_school_id(
        db: &DatabaseConnection,
        school_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(Column::SchoolId.eq(school_id))
            .filter(Column::Deleted.eq(false))
            .all(db)
            .await
    }

    /// Soft-delete a student.
    pub async fn mark_deleted(db: &DatabaseConnection, id: i64) -> Result<Self, DbErr> {
        let student = Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("Student ID {id} not found")))?;
        let mut active = student.into_active_model();
        active.deleted = Set(true);
        active.updated_at = Set(Utc::now());
        active.update(db).await
    }
}
