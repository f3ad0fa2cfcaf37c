use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use strum::EnumIter;

/// One gradable criterion within a test, with its maximum point value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notation {
    pub name: String,
    pub max_points: f64,
}

/// Test model representing the `tests` table.
///
/// `weight` is the test's contribution fraction within its subject, 0 to 1.
/// The per-subject sum across non-deleted tests must not exceed 1; that is
/// enforced at write time by `services`, never re-checked by the transcript
/// engine. `criteria` holds the flat-form pass/fail document as raw JSON.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub subject_id: i64,
    pub name: String,
    pub weight: f64,
    pub notations: Json,
    pub criteria: Json,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::subject::Entity",
        from = "Column::SubjectId",
        to = "super::subject::Column::Id"
    )]
    Subject,
    #[sea_orm(has_many = "super::student_test_result::Entity")]
    StudentTestResult,
}

impl Related<super::subject::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subject.def()
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
        subject_id: i64,
        name: &str,
        weight: f64,
        notations: &[Notation],
        criteria: Json,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let notations = serde_json::to_value(notations)
            .map_err(|e| DbErr::Custom(format!("Failed to serialize notations: {e}")))?;
        let active = ActiveModel {
            subject_id: Set(subject_id),
            name: Set(name.to_string()),
            weight: Set(weight),
            notations: Set(notations),
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

    /// Batched lookup: all non-deleted tests whose id is in `ids`, one query.
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

    /// Get all non-deleted tests for a subject.
    pub async fn get_by_subject_id(
        db: &DatabaseConnection,
        subject_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(Column::SubjectId.eq(subject_id))
            .filter(Column::Deleted.eq(false))
            .all(db)
            .await
    }

    /// The test's notation list, parsed from its JSON column.
    pub fn notation_list(&self) -> Result<Vec<Notation>, serde_json::Error> {
        serde_json::from_value(self.notations.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{block, school, subject};
    use crate::test_utils::setup_test_db;
    use sea_orm::{IntoActiveModel, Set};
    use serde_json::json;

    async fn seed_subject(db: &DatabaseConnection) -> i64 {
        let school = school::Model::create(db, "School", "SC").await.unwrap();
        let blk = block::Model::create(db, school.id, "Year 1").await.unwrap();
        subject::Model::create(db, blk.id, "Maths", 1.0, json!([]))
            .await
            .unwrap()
            .id
    }

    /// One query serves any id set; deleted tests and unknown ids are absent.
    #[tokio::test]
    async fn test_get_by_ids_batched() {
        let db = setup_test_db().await;
        let subject_id = seed_subject(&db).await;

        let a = Model::create(&db, subject_id, "A", 0.3, &[], json!({})).await.unwrap();
        let b = Model::create(&db, subject_id, "B", 0.3, &[], json!({})).await.unwrap();
        let c = Model::create(&db, subject_id, "C", 0.3, &[], json!({})).await.unwrap();

        let mut active = c.clone().into_active_model();
        active.deleted = Set(true);
        active.update(&db).await.unwrap();

        let found = Model::get_by_ids(&db, &[a.id, b.id, c.id, 9999]).await.unwrap();
        let mut ids: Vec<i64> = found.iter().map(|t| t.id).collect();
        ids.sort();
        assert_eq!(ids, vec![a.id, b.id]);

        assert!(Model::get_by_ids(&db, &[]).await.unwrap().is_empty());
    }
}
