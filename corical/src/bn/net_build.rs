use super::network::{Network, Node};
use super::xdsl::CptDecl;
use super::{NamedList, Proba};
use crate::{Config, NormalizationPolicy};
use itertools::Itertools;
use ndarray::{ArrayD, IxDyn};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Malformed model description: {0}.")]
    Parse(String),
    #[error("Invalid model description: {0}.")]
    Schema(String),
    #[error("Node {0} is declared more than once.")]
    DuplicateNode(String),
    #[error("Node {node} declares state {state} more than once.")]
    DuplicateState { node: String, state: String },
    #[error("Node {node} has unknown parent {parent}.")]
    UnknownParent { node: String, parent: String },
    #[error("Node {node}: {len} probabilities cannot be shaped as {shape:?}.")]
    ShapeMismatch {
        node: String,
        shape: Vec<usize>,
        len: usize,
    },
    #[error("Node {node}: probabilities for parent states {parent_states:?} sum to {sum}.")]
    NotNormalized {
        node: String,
        parent_states: Vec<usize>,
        sum: Proba,
    },
}

impl Network {
    fn build(tolerance: Proba) -> Self {
        Self {
            nodes: NamedList::new(),
            tolerance,
        }
    }
}

/// Cardinality of every declared node, checking that names and states are unique.
fn cardinalities(decls: &[CptDecl]) -> Result<NamedList<usize>, ModelError> {
    let mut cards = NamedList::with_capacity(decls.len());
    for decl in decls {
        if decl.states.is_empty() {
            return Err(ModelError::Schema(format!("node {}: no states", decl.id)));
        }
        if let Some(state) = decl.states.iter().duplicates().next() {
            return Err(ModelError::DuplicateState {
                node: decl.id.clone(),
                state: state.clone(),
            });
        }
        if cards.insert(decl.id.clone(), decl.states.len()).is_some() {
            return Err(ModelError::DuplicateNode(decl.id.clone()));
        }
    }
    Ok(cards)
}

fn build_node(decl: CptDecl, cards: &NamedList<usize>) -> Result<Node, ModelError> {
    if let Some(parent) = decl.parents.iter().duplicates().next() {
        return Err(ModelError::Schema(format!(
            "node {}: parent {} listed twice",
            decl.id, parent
        )));
    }
    let parents = decl
        .parents
        .iter()
        .map(|p| {
            cards
                .get_index_of(p)
                .ok_or_else(|| ModelError::UnknownParent {
                    node: decl.id.clone(),
                    parent: p.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    // Parent axes in declared order, own state last (fastest varying).
    let shape = parents
        .iter()
        .map(|p| cards[*p])
        .chain(std::iter::once(decl.states.len()))
        .collect_vec();
    let len = decl.probabilities.len();
    let cpt = ArrayD::from_shape_vec(IxDyn(&shape), decl.probabilities).map_err(|_| {
        ModelError::ShapeMismatch {
            node: decl.id.clone(),
            shape: shape.clone(),
            len,
        }
    })?;
    Ok(Node {
        states: decl.states,
        parents,
        cpt,
    })
}

pub(super) fn build_network(decls: Vec<CptDecl>, config: &Config) -> Result<Network, ModelError> {
    let cards = cardinalities(&decls)?;
    let mut network = Network::build(config.tolerance);
    for decl in decls {
        let name = decl.id.clone();
        let node = build_node(decl, &cards)?;
        network.nodes.insert(name, node);
    }
    match config.normalization {
        NormalizationPolicy::Reject => network.check_normalized(config.tolerance)?,
        NormalizationPolicy::Warn => {
            for defect in network.unnormalized(config.tolerance) {
                tracing::warn!(%defect, "loading non-normalized table");
            }
        }
        NormalizationPolicy::Ignore => {}
    }
    if network.is_cyclic() {
        tracing::warn!("network contains a directed cycle");
    }
    Ok(network)
}
