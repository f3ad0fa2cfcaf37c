use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202607150001_create_users::Migration),
            Box::new(migrations::m202607150002_create_schools::Migration),
            Box::new(migrations::m202607150003_create_students::Migration),
            Box::new(migrations::m202607150004_create_blocks::Migration),
            Box::new(migrations::m202607150005_create_subjects::Migration),
            Box::new(migrations::m202607150006_create_tests::Migration),
            Box::new(migrations::m202607150007_create_student_test_results::Migration),
            Box::new(migrations::m202607150008_create_tasks::Migration),
            Box::new(migrations::m202608010009_create_transcript_results::Migration),
        ]
    }
}
