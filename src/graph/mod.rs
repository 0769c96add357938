//! Risk graph data model

mod edge;
mod node;
mod row;

pub use edge::Relationship;
pub use node::{property, NodeKey, NodeLabel, Properties};
pub use row::{ImportRow, MergePlan, COLUMNS};
