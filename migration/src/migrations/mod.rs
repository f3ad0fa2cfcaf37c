pub mod m202607150001_create_users;
pub mod m202607150002_create_schools;
pub mod m202607150003_create_students;
pub mod m202607150004_create_blocks;
pub mod m202607150005_create_subjects;
pub mod m202607150007_create_student_test_results;
pub mod m202607150008_create_tasks;
pub mod m202608010009_create_transcript_results;
