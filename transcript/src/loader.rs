//! # Loader Module
//!
//! Batched reference lookups for the entities a calculation needs. Ids are
//! deduplicated and each kind is fetched in a single `IS IN` query instead
//! of repeated point reads. Missing or soft-deleted ids are simply absent
//! from the result; the aggregator decides whether that is an error.
//!
//! A loader instance is scoped to one calculation and holds no cache, so
//! nothing leaks between concurrent worker contexts.

use std::collections::BTreeSet;

use async_trait::async_trait;
use db::models::{block, subject, test};
use sea_orm::{DatabaseConnection, DbErr};

/// Batched-by-id access to the reference entities of the hierarchy.
#[async_trait]
pub trait ReferenceLoader {
    async fn load_tests(&self, ids: &[i64]) -> Result<Vec<test::Model>, DbErr>;
    async fn load_subjects(&self, ids: &[i64]) -> Result<Vec<subject::Model>, DbErr>;
    async fn load_blocks(&self, ids: &[i64]) -> Result<Vec<block::Model>, DbErr>;
}

/// [`ReferenceLoader`] backed by the worker's own store connection.
pub struct DbLoader<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> DbLoader<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }
}

fn dedup(ids: &[i64]) -> Vec<i64> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

#[async_trait]
impl ReferenceLoader for DbLoader<'_> {
    async fn load_tests(&self, ids: &[i64]) -> Result<Vec<test::Model>, DbErr> {
        test::Model::get_by_ids(self.db, &dedup(ids)).await
    }

    async fn load_subjects(&self, ids: &[i64]) -> Result<Vec<subject::Model>, DbErr> {
        subject::Model::get_by_ids(self.db, &dedup(ids)).await
    }

    async fn load_blocks(&self, ids: &[i64]) -> Result<Vec<block::Model>, DbErr> {
        block::Model::get_by_ids(self.db, &dedup(ids)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_sorts_and_removes_duplicates() {
        assert_eq!(dedup(&[3, 1, 3, 2, 1]), vec![1, 2, 3]);
        assert_eq!(dedup(&[]), Vec::<i64>::new());
    }
}
