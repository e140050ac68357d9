use ndarray::{Array1, ArrayView1};
use thiserror::Error;

use super::{NamedList, Network, Proba};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvidenceError {
    #[error("No node named {0}.")]
    UnknownNode(String),
    #[error("Node {node} has no state named {state}.")]
    UnknownState { node: String, state: String },
    #[error("Invalid distribution for node {node}: {reason}.")]
    InvalidDistribution { node: String, reason: String },
    #[error("Node {0} has parents, it has no unconditional prior.")]
    NotRoot(String),
}

type Result<T> = std::result::Result<T, EvidenceError>;

/// Facts known or assumed during one inference session: a probability vector per node.
///
/// A node present here is treated as fixed by inference, its parents are not consulted. Removing
/// it with [`Evidence::clear`] makes inference derive it from its ancestors again.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evidence {
    values: NamedList<Array1<Proba>>,
}

impl Network {
    /// Indicator vector of `state` over the states of `node`.
    pub fn one_hot(&self, node: &str, state: &str) -> Result<Array1<Proba>> {
        let n = self
            .get(node)
            .ok_or_else(|| EvidenceError::UnknownNode(node.to_owned()))?;
        let idx = n
            .state_index(state)
            .ok_or_else(|| EvidenceError::UnknownState {
                node: node.to_owned(),
                state: state.to_owned(),
            })?;
        let mut v = Array1::zeros(n.cardinality());
        v[idx] = 1.0;
        Ok(v)
    }

    fn check_distribution(&self, node: &str, v: ArrayView1<Proba>) -> Result<()> {
        let n = self
            .get(node)
            .ok_or_else(|| EvidenceError::UnknownNode(node.to_owned()))?;
        let invalid = |reason: String| EvidenceError::InvalidDistribution {
            node: node.to_owned(),
            reason,
        };
        if v.len() != n.cardinality() {
            return Err(invalid(format!(
                "got {} values for {} states",
                v.len(),
                n.cardinality()
            )));
        }
        if let Some(x) = v.iter().find(|x| !(**x >= 0.0) || !x.is_finite()) {
            return Err(invalid(format!("invalid weight {}", x)));
        }
        let sum = v.sum();
        if (sum - 1.0).abs() > self.tolerance {
            return Err(invalid(format!("weights sum to {}", sum)));
        }
        Ok(())
    }
}

impl Evidence {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn get(&self, node: &str) -> Option<ArrayView1<Proba>> {
        self.values.get(node).map(|v| v.view())
    }
    pub fn contains(&self, node: &str) -> bool {
        self.values.contains_key(node)
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, ArrayView1<Proba>)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v.view()))
    }

    /// Bind `node` to certainly be in `state`.
    pub fn bind_hard(&mut self, net: &Network, node: &str, state: &str) -> Result<()> {
        let v = net.one_hot(node, state)?;
        self.values.insert(node.to_owned(), v);
        Ok(())
    }

    /// Bind `node` to a weighted belief over its states. States not listed get weight zero,
    /// a state listed twice accumulates its weights.
    pub fn bind_soft<'a>(
        &mut self,
        net: &Network,
        node: &str,
        weights: impl IntoIterator<Item = (&'a str, Proba)>,
    ) -> Result<()> {
        let n = net
            .get(node)
            .ok_or_else(|| EvidenceError::UnknownNode(node.to_owned()))?;
        let mut v = Array1::<Proba>::zeros(n.cardinality());
        for (state, w) in weights {
            if !(w >= 0.0) || !w.is_finite() {
                return Err(EvidenceError::InvalidDistribution {
                    node: node.to_owned(),
                    reason: format!("invalid weight {} for state {}", w, state),
                });
            }
            v.scaled_add(w, &net.one_hot(node, state)?);
        }
        net.check_distribution(node, v.view())?;
        self.values.insert(node.to_owned(), v);
        Ok(())
    }

    /// Bind `node` to a probability vector given in state order (virtual evidence).
    pub fn bind_vector(&mut self, net: &Network, node: &str, vector: Array1<Proba>) -> Result<()> {
        net.check_distribution(node, vector.view())?;
        self.values.insert(node.to_owned(), vector);
        Ok(())
    }

    /// Bind a root node to its own prior table.
    pub fn bind_prior(&mut self, net: &Network, node: &str) -> Result<()> {
        let n = net
            .get(node)
            .ok_or_else(|| EvidenceError::UnknownNode(node.to_owned()))?;
        if !n.is_root() {
            return Err(EvidenceError::NotRoot(node.to_owned()));
        }
        let prior = n.cpt().iter().copied().collect::<Array1<_>>();
        self.values.insert(node.to_owned(), prior);
        Ok(())
    }

    /// Unbind `node`, returning its previous value.
    pub fn clear(&mut self, node: &str) -> Option<Array1<Proba>> {
        self.values.shift_remove(node)
    }

    /// Store a value without validation, e.g. a previously inferred marginal.
    pub(crate) fn store(&mut self, node: &str, value: Array1<Proba>) {
        self.values.insert(node.to_owned(), value);
    }
}
