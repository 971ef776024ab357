use crate::state::ChartId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// How a sub-filter chart's place aggregate merges with the primary's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Operation {
    Divide,
    Subtract,
}

impl Operation {
    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "/" | "divide" => Some(Self::Divide),
            "-" | "subtract" | "minus" => Some(Self::Subtract),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::Divide => "/",
            Self::Subtract => "-",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl TryFrom<String> for Operation {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_token(&s).ok_or_else(|| format!("unknown relation operation: {s}"))
    }
}

impl From<Operation> for String {
    fn from(op: Operation) -> Self {
        op.token().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationEdge {
    pub child: ChartId,
    pub operation: Operation,
}

/// Declared parent -> child sub-filter edges. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct RelationTable {
    by_parent: HashMap<ChartId, Vec<RelationEdge>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("No relation declared between parent chart {parent} and child chart {child}")]
pub struct RelationNotFound {
    pub child: ChartId,
    pub parent: ChartId,
}

impl RelationTable {
    pub fn new(edges: impl IntoIterator<Item = (ChartId, ChartId, Operation)>) -> Self {
        let mut by_parent: HashMap<ChartId, Vec<RelationEdge>> = HashMap::new();
        for (parent, child, operation) in edges {
            let list = by_parent.entry(parent).or_default();
            // Last declaration wins for a repeated pair.
            match list.iter_mut().find(|e| e.child == child) {
                Some(edge) => edge.operation = operation,
                None => list.push(RelationEdge { child, operation }),
            }
        }
        Self { by_parent }
    }

    pub fn lookup_operation(
        &self,
        child: ChartId,
        parent: ChartId,
    ) -> Result<Operation, RelationNotFound> {
        self.by_parent
            .get(&parent)
            .and_then(|edges| edges.iter().find(|e| e.child == child))
            .map(|e| e.operation)
            .ok_or(RelationNotFound { child, parent })
    }

    pub fn is_child_of(&self, child: ChartId, parent: ChartId) -> bool {
        self.lookup_operation(child, parent).is_ok()
    }

    pub fn children_of(&self, parent: ChartId) -> &[RelationEdge] {
        self.by_parent.get(&parent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.by_parent.values().all(Vec::is_empty)
    }
}
