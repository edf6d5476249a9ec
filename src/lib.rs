pub mod cache;
pub mod columnar;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod etl;
pub mod output;
pub mod query;
pub mod record;
pub mod report;
pub mod storage;
