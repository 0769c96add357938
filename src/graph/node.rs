//! Node kinds and their merge identities

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Property names as they appear on graph nodes
pub mod property {
    pub const APPLICATION: &str = "Application";
    pub const PURPOSE: &str = "Purpose";
    pub const SECTOR: &str = "Sector";
    pub const NAME: &str = "Name";
    pub const LC_PHASE: &str = "LC_Phase";
}

/// The four entity kinds stored in the risk graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeLabel {
    /// A deployment scenario for an AI application
    Context,
    /// A named risk category tied to a lifecycle phase
    Risk,
    /// A countermeasure applied at a lifecycle phase
    Treatment,
    /// A role responsible for applying a treatment
    Stakeholder,
}

impl NodeLabel {
    pub const ALL: [NodeLabel; 4] = [
        NodeLabel::Context,
        NodeLabel::Risk,
        NodeLabel::Treatment,
        NodeLabel::Stakeholder,
    ];

    /// Graph label string
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::Context => "Context",
            NodeLabel::Risk => "Risk",
            NodeLabel::Treatment => "Treatment",
            NodeLabel::Stakeholder => "Stakeholder",
        }
    }

    /// Property names that together identify a node of this kind
    pub fn key_properties(&self) -> &'static [&'static str] {
        match self {
            NodeLabel::Context => &[property::APPLICATION, property::PURPOSE, property::SECTOR],
            NodeLabel::Risk | NodeLabel::Treatment => &[property::NAME, property::LC_PHASE],
            NodeLabel::Stakeholder => &[property::NAME],
        }
    }
}

impl std::fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Properties collection, ordered so the serialized form is stable
pub type Properties = BTreeMap<String, String>;

/// Merge identity of a node: its label plus all key properties.
///
/// Two keys are equal exactly when a MERGE would reuse the same node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeKey {
    pub label: NodeLabel,
    pub properties: Properties,
}

impl NodeKey {
    fn new(label: NodeLabel, values: &[&str]) -> Self {
        let properties = label
            .key_properties()
            .iter()
            .zip(values)
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { label, properties }
    }

    pub fn context(application: &str, purpose: &str, sector: &str) -> Self {
        Self::new(NodeLabel::Context, &[application, purpose, sector])
    }

    pub fn risk(name: &str, lc_phase: &str) -> Self {
        Self::new(NodeLabel::Risk, &[name, lc_phase])
    }

    pub fn treatment(name: &str, lc_phase: &str) -> Self {
        Self::new(NodeLabel::Treatment, &[name, lc_phase])
    }

    pub fn stakeholder(name: &str) -> Self {
        Self::new(NodeLabel::Stakeholder, &[name])
    }

    /// Look up one key property
    pub fn get(&self, property: &str) -> Option<&str> {
        self.properties.get(property).map(String::as_str)
    }
}
