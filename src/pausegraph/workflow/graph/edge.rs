// SPDX-License-Identifier: MIT

//! Edge table: fixed and conditional transitions between nodes

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::adk::error::BuildError;
use crate::pausegraph::workflow::state::WorkflowState;

/// Reserved name of the virtual entry point
pub const START: &str = "__start__";
/// Reserved name of the terminal marker
pub const END: &str = "__end__";

/// Destination of an edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Node(String),
    End,
}

impl Target {
    pub fn node(name: impl Into<String>) -> Self {
        Self::Node(name.into())
    }

    /// `__end__` (or `END`) maps to [`Target::End`], anything else to a node
    pub fn parse(name: &str) -> Self {
        if name == END || name == "END" {
            Self::End
        } else {
            Self::Node(name.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Node(name) => name,
            Self::End => END,
        }
    }
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of labels a typed router can return
///
/// Implemented by a small enum per conditional edge. Every variant listed in
/// `ALL` must be mapped when the edge is added, so a router can never produce
/// a label the graph does not know.
pub trait RouteLabel: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Every label the router can return
    const ALL: &'static [Self];

    fn name(&self) -> &'static str;
}

type RouteFn = dyn Fn(&WorkflowState) -> Result<Target, String> + Send + Sync;

/// Outgoing transition of a node
pub enum Edge {
    /// Always followed
    Fixed(Target),
    /// Router picks the target from the updated state
    Conditional(ConditionalEdge),
}

impl Edge {
    /// Every target this edge can select
    pub fn targets(&self) -> Vec<&Target> {
        match self {
            Edge::Fixed(target) => vec![target],
            Edge::Conditional(cond) => cond.routes.iter().map(|(_, t)| t).collect(),
        }
    }

    /// Select the next target. `Err` carries the router's unmapped label.
    pub fn resolve(&self, state: &WorkflowState) -> Result<Target, String> {
        match self {
            Edge::Fixed(target) => Ok(target.clone()),
            Edge::Conditional(cond) => (cond.route)(state),
        }
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Fixed(target) => f.debug_tuple("Fixed").field(target).finish(),
            Edge::Conditional(cond) => f
                .debug_tuple("Conditional")
                .field(&cond.routes)
                .finish(),
        }
    }
}

/// Conditional edge: router function plus label mapping
pub struct ConditionalEdge {
    routes: Vec<(String, Target)>,
    route: Box<RouteFn>,
}

impl ConditionalEdge {
    /// Router returning an enum label; every variant must be mapped
    pub fn typed<L, F>(
        node: &str,
        router: F,
        mapping: impl IntoIterator<Item = (L, Target)>,
    ) -> Result<Self, BuildError>
    where
        L: RouteLabel,
        F: Fn(&WorkflowState) -> L + Send + Sync + 'static,
    {
        let mapping: HashMap<L, Target> = mapping.into_iter().collect();
        let missing: Vec<String> = L::ALL
            .iter()
            .filter(|label| !mapping.contains_key(*label))
            .map(|label| label.name().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(BuildError::UnmappedLabels {
                node: node.to_string(),
                labels: missing,
            });
        }

        let routes = L::ALL
            .iter()
            .map(|label| (label.name().to_string(), mapping[label].clone()))
            .collect();
        Ok(Self {
            routes,
            route: Box::new(move |state| {
                let label = router(state);
                mapping
                    .get(&label)
                    .cloned()
                    .ok_or_else(|| label.name().to_string())
            }),
        })
    }

    /// Router returning a free-form label, checked against the mapping at run time
    pub fn dynamic<F>(router: F, mapping: impl IntoIterator<Item = (String, Target)>) -> Self
    where
        F: Fn(&WorkflowState) -> String + Send + Sync + 'static,
    {
        let mapping: HashMap<String, Target> = mapping.into_iter().collect();
        let mut routes: Vec<(String, Target)> = mapping
            .iter()
            .map(|(label, target)| (label.clone(), target.clone()))
            .collect();
        routes.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            routes,
            route: Box::new(move |state| {
                let label = router(state);
                mapping.get(&label).cloned().ok_or(label)
            }),
        }
    }

    /// Router that computes the target itself; `routes` lists every target it can pick
    pub fn from_fn<F>(routes: Vec<(String, Target)>, route: F) -> Self
    where
        F: Fn(&WorkflowState) -> Result<Target, String> + Send + Sync + 'static,
    {
        Self {
            routes,
            route: Box::new(route),
        }
    }

    /// `(label, target)` pairs this edge can select
    pub fn routes(&self) -> &[(String, Target)] {
        &self.routes
    }
}
