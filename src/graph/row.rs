//! One validated row of risk-governance data and the merges it implies

use super::edge::Relationship;
use super::node::NodeKey;
use serde::{Deserialize, Serialize};

/// Column names of the tabular source, in their canonical order
pub const COLUMNS: [&str; 8] = [
    "application",
    "purpose",
    "sector",
    "risk_name",
    "risk_phase",
    "ctms_name",
    "ctms_phase",
    "stakeholder",
];

/// A complete import row. Every field is an opaque, non-blank string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRow {
    pub application: String,
    pub purpose: String,
    pub sector: String,
    pub risk_name: String,
    pub risk_phase: String,
    pub ctms_name: String,
    pub ctms_phase: String,
    pub stakeholder: String,
}

/// Indices into [`MergePlan::nodes`]
pub const CONTEXT: usize = 0;
pub const RISK: usize = 1;
pub const TREATMENT: usize = 2;
pub const STAKEHOLDER: usize = 3;

/// Nodes to merge and the edges to merge between them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePlan {
    pub nodes: [NodeKey; 4],
    /// (source index, relationship, target index)
    pub edges: [(usize, Relationship, usize); 4],
}

impl ImportRow {
    /// Node keys and links for this row, in merge order
    pub fn merge_plan(&self) -> MergePlan {
        MergePlan {
            nodes: [
                NodeKey::context(&self.application, &self.purpose, &self.sector),
                NodeKey::risk(&self.risk_name, &self.risk_phase),
                NodeKey::treatment(&self.ctms_name, &self.ctms_phase),
                NodeKey::stakeholder(&self.stakeholder),
            ],
            edges: [
                (RISK, Relationship::Affects, CONTEXT),
                (TREATMENT, Relationship::Modifies, RISK),
                (TREATMENT, Relationship::RelatesTo, CONTEXT),
                (STAKEHOLDER, Relationship::ResponsibleFor, TREATMENT),
            ],
        }
    }
}
