pub mod analyze;
pub mod canvas;
pub mod charts;
pub mod report;
