use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use strum::EnumIter;

/// Where a correction task currently sits in its workflow.
///
/// Tasks only ever move forward: assign_corrector → enter_marks →
/// validate_marks → done. The guarded transitions live in `services`.
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "task_status_enum")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[sea_orm(string_value = "assign_corrector")]
    AssignCorrector,
    #[sea_orm(string_value = "enter_marks")]
    EnterMarks,
    #[sea_orm(string_value = "validate_marks")]
    ValidateMarks,
    #[sea_orm(string_value = "done")]
    Done,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::AssignCorrector
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status_str = match self {
            TaskStatus::AssignCorrector => "assign_corrector",
            TaskStatus::EnterMarks => "enter_marks",
            TaskStatus::ValidateMarks => "validate_marks",
            TaskStatus::Done => "done",
        };
        write!(f, "{}", status_str)
    }
}

/// Task model representing the `tasks` table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tasks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_test_result_id: i64,
    pub corrector_id: Option<i64>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::student_test_result::Entity",
        from = "Column::StudentTestResultId",
        to = "super::student_test_result::Column::Id"
    )]
    StudentTestResult,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CorrectorId",
        to = "super::user::Column::Id"
    )]
    Corrector,
}

impl Related<super::student_test_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudentTestResult.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Corrector.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Open a new correction task for a result, awaiting corrector assignment.
    pub async fn create(
        db: &DatabaseConnection,
        student_test_result_id: i64,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = ActiveModel {
            student_test_result_id: Set(student_test_result_id),
            corrector_id: Set(None),
            status: Set(TaskStatus::AssignCorrector),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        active.insert(db).await
    }

    pub async fn get_by_id(db: &DatabaseConnection, id: i64) -> Result<Option<Self>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    pub async fn get_by_result_id(
        db: &DatabaseConnection,
        student_test_result_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(Column::StudentTestResultId.eq(student_test_result_id))
            .all(db)
            .await
    }

    pub async fn set_corrector(
        db: &DatabaseConnection,
        id: i64,
        corrector_id: i64,
    ) -> Result<Self, DbErr> {
        let task = Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("Task ID {id} not found")))?;
        let mut active = task.into_active_model();
        active.corrector_id = Set(Some(corrector_id));
        active.updated_at = Set(Utc::now());
        active.update(db).await
    }

    pub async fn set_status(
        db: &DatabaseConnection,
        id: i64,
        status: TaskStatus,
    ) -> Result<Self, DbErr> {
        let task = Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("Task ID {id} not found")))?;
        let mut active = task.into_active_model();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        active.update(db).await
    }
}
