//! Relationship kinds between risk-graph nodes

use super::node::NodeLabel;
use serde::{Deserialize, Serialize};

/// Directed relationship kinds created by the importer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Relationship {
    /// Risk -> Context
    Affects,
    /// Treatment -> Risk
    Modifies,
    /// Treatment -> Context
    RelatesTo,
    /// Stakeholder -> Treatment
    ResponsibleFor,
}

impl Relationship {
    pub const ALL: [Relationship; 4] = [
        Relationship::Affects,
        Relationship::Modifies,
        Relationship::RelatesTo,
        Relationship::ResponsibleFor,
    ];

    /// Relationship type as written in the graph
    pub fn as_str(&self) -> &'static str {
        match self {
            Relationship::Affects => "AFFECTS",
            Relationship::Modifies => "MODIFIES",
            Relationship::RelatesTo => "RELATES_TO",
            Relationship::ResponsibleFor => "RESPONSIBLE_FOR",
        }
    }

    /// (source label, target label) this relationship connects
    pub fn endpoints(&self) -> (NodeLabel, NodeLabel) {
        match self {
            Relationship::Affects => (NodeLabel::Risk, NodeLabel::Context),
            Relationship::Modifies => (NodeLabel::Treatment, NodeLabel::Risk),
            Relationship::RelatesTo => (NodeLabel::Treatment, NodeLabel::Context),
            Relationship::ResponsibleFor => (NodeLabel::Stakeholder, NodeLabel::Treatment),
        }
    }
}

impl std::fmt::Display for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
