pub mod charts;
pub mod dashboard;
pub mod insights_client;
pub mod summary;
