use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use strum::EnumIter;

/// Review status of a student's result for one test.
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "result_status_enum")]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// Marks may still be entered or corrected.
    #[sea_orm(string_value = "pending_review")]
    PendingReview,
    /// Marks are final; only `mark_validated_date` is ever written after this.
    #[sea_orm(string_value = "validated")]
    Validated,
}

impl Default for ResultStatus {
    fn default() -> Self {
        ResultStatus::PendingReview
    }
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status_str = match self {
            ResultStatus::PendingReview => "pending_review",
            ResultStatus::Validated => "validated",
        };
        write!(f, "{}", status_str)
    }
}

/// The mark a corrector entered for one notation of the test.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotationMark {
    pub notation: String,
    pub mark: f64,
}

/// Student test result model representing the `student_test_results` table.
///
/// Holds the per-notation marks and the precomputed `average_mark` (mean of
/// the notation marks). Invariant: every result references an existing,
/// non-deleted test.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "student_test_results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_id: i64,
    pub test_id: i64,
    pub marks: Json,
    pub average_mark: f64,
    pub status: ResultStatus,
    pub mark_validated_date: Option<DateTime<Utc>>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id"
    )]
    Student,
    #[sea_orm(
        belongs_to = "super::test::Entity",
        from = "Column::TestId",
        to = "super::test::Column::Id"
    )]
    Test,
    #[sea_orm(has_many = "super::task::Entity")]
    Task,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::test::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Test.def()
    }
}

impl Related<super::task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Task.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Create an empty result awaiting correction.
    pub async fn create(
        db: &DatabaseConnection,
        student_id: i64,
        test_id: i64,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = ActiveModel {
            student_id: Set(student_id),
            test_id: Set(test_id),
            marks: Set(serde_json::json!([])),
            average_mark: Set(0.0),
            status: Set(ResultStatus::PendingReview),
            mark_validated_date: Set(None),
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

    /// All non-deleted results for a student, in one query.
    pub async fn get_by_student_id(
        db: &DatabaseConnection,
        student_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::Deleted.eq(false))
            .all(db)
            .await
    }

    /// Record the corrector's marks and the precomputed average.
    ///
    /// Rejected once the result has left `pending_review`.
    pub async fn record_marks(
        db: &DatabaseConnection,
        id: i64,
        marks: &[NotationMark],
        average_mark: f64,
    ) -> Result<Self, DbErr> {
        let result = Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("Result ID {id} not found")))?;

        if result.status != ResultStatus::PendingReview {
            return Err(DbErr::Custom(format!(
                "Result ID {id} is {} and can no longer be edited",
                result.status
            )));
        }

        let marks = serde_json::to_value(marks)
            .map_err(|e| DbErr::Custom(format!("Failed to serialize marks: {e}")))?;

        let mut active = result.into_active_model();
        active.marks = Set(marks);
        active.average_mark = Set(average_mark);
        active.updated_at = Set(Utc::now());
        active.update(db).await
    }

    /// Finalize the result: stamp `mark_validated_date` and move to `validated`.
    pub async fn validate(db: &DatabaseConnection, id: i64) -> Result<Self, DbErr> {
        let result = Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("Result ID {id} not found")))?;

        let now = Utc::now();
        let mut active = result.into_active_model();
        active.status = Set(ResultStatus::Validated);
        active.mark_validated_date = Set(Some(now));
        active.updated_at = Set(now);
        active.update(db).await
    }

    /// The per-notation marks, parsed from the JSON column.
    pub fn mark_list(&self) -> Result<Vec<NotationMark>, serde_json::Error> {
        serde_json::from_value(self.marks.clone())
    }
}
