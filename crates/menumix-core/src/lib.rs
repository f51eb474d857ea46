pub mod aggregation;
pub mod cache;
pub mod calendar;
pub mod chart;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod filters;
pub mod keys;
pub mod kpi;
pub mod options;
pub mod pipeline;
pub mod ranking;
pub mod report;
pub mod table_io;
