//! Role inheritance graph with cycle detection
//!
//! Edges point from a role to the parents it inherits from. Parents that are
//! not part of the role set are treated as leaves.

use super::types::RoleSet;
use crate::error::AuthzError;
use crate::types::RoleId;
use std::collections::BTreeMap;
use thiserror::Error;

/// Graph-related errors
#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    /// Inheritance cycle, reported as `a -> b -> a`
    #[error("{0}")]
    CircularDependency(String),
}

impl From<GraphError> for AuthzError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::CircularDependency(path) => AuthzError::CircularInheritance(path),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Visiting,
    Done,
}

/// Inheritance graph over a role snapshot
#[derive(Debug, Clone, Default)]
pub struct InheritanceGraph {
    /// role id -> parent role ids
    edges: BTreeMap<RoleId, Vec<RoleId>>,
}

impl InheritanceGraph {
    /// Build the graph from a snapshot
    pub fn from_roles(roles: &RoleSet) -> Self {
        let edges = roles
            .iter()
            .map(|role| {
                let parents = role
                    .inherits
                    .iter()
                    .filter(|parent| roles.contains(parent))
                    .cloned()
                    .collect();
                (role.id.clone(), parents)
            })
            .collect();
        Self { edges }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Parents of a role inside the graph
    pub fn parents(&self, role_id: &str) -> &[RoleId] {
        self.edges.get(role_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Fail on the first inheritance cycle found
    ///
    /// Depth-first search with white/gray/black marking; reaching a gray node
    /// means the current path loops back on itself.
    pub fn detect_cycle(&self) -> Result<(), GraphError> {
        let mut state: BTreeMap<&str, VisitState> = BTreeMap::new();
        let mut path: Vec<&str> = Vec::new();

        for start in self.edges.keys() {
            if !state.contains_key(start.as_str()) {
                self.visit(start, &mut state, &mut path)?;
            }
        }

        Ok(())
    }

    fn visit<'a>(
        &'a self,
        node: &'a str,
        state: &mut BTreeMap<&'a str, VisitState>,
        path: &mut Vec<&'a str>,
    ) -> Result<(), GraphError> {
        match state.get(node) {
            Some(VisitState::Visiting) => {
                let start = path.iter().position(|n| *n == node).unwrap_or(0);
                let mut cycle: Vec<&str> = path[start..].to_vec();
                cycle.push(node);
                return Err(GraphError::CircularDependency(cycle.join(" -> ")));
            }
            Some(VisitState::Done) => return Ok(()),
            None => {}
        }

        state.insert(node, VisitState::Visiting);
        path.push(node);

        for parent in self.parents(node) {
            self.visit(parent, state, path)?;
        }

        path.pop();
        state.insert(node, VisitState::Done);
        Ok(())
    }
}
