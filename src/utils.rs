pub mod logs;
pub mod report;
