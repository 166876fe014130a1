pub mod decisions;
pub mod dispatch;
pub mod flow;
pub mod ingest;
pub mod prefilter;
pub mod reliability;
