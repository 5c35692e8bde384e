//! Reusable view components.

pub mod format;
pub mod line_graph;
pub mod store_details;

pub use line_graph::LineGraph;
pub use store_details::{all_details, store_details};
