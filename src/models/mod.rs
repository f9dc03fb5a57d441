pub mod report;
pub mod trip;
