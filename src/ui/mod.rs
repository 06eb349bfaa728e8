//! Presentation: console summaries and the record log.
pub mod output;
pub mod sink;
