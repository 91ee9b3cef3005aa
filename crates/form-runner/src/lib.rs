//! Navigation and validation engine for multi-page data-collection forms.
//!
//! A [`forms::Form`] is a directed graph of pages joined by conditional edges. The
//! engine validates and converts submitted field values, picks the next page from
//! branching conditions, rebuilds back links by replaying the graph from the start
//! page, and manages repeating "add another" groups.

pub mod config;
pub mod error;
pub mod forms;
pub mod telemetry;
