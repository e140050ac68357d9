use std::path::Path;
use std::sync::Arc;

use ndarray::Array1;

use crate::bn::{self, Evidence, EvidenceError, InferError, Marginals, ModelError, Network, Proba};
use crate::{Config, CoricalError};

/// A loaded network together with the evidence and inference operations on it.
///
/// The network is immutable and shared: cloning a `ProbabilityModel` is cheap, and any number of
/// sessions may query it concurrently, each with its own [`Evidence`].
#[derive(Debug, Clone)]
pub struct ProbabilityModel {
    network: Arc<Network>,
}

impl ProbabilityModel {
    /// Load a model from an `.xdsl` file.
    pub fn load(path: impl AsRef<Path>, config: &Config) -> crate::Result<Self> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|source| CoricalError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model = Self::from_description(&src, config)?;
        tracing::info!(
            path = %path.display(),
            nodes = model.network.len(),
            "loaded model"
        );
        Ok(model)
    }

    pub fn from_description(description: &str, config: &Config) -> Result<Self, ModelError> {
        Ok(Self::from_network(bn::build_network(description, config)?))
    }

    pub fn from_network(network: Network) -> Self {
        Self {
            network: Arc::new(network),
        }
    }

    pub fn network(&self) -> &Arc<Network> {
        &self.network
    }

    pub fn new_evidence(&self) -> Evidence {
        Evidence::new()
    }

    pub fn bind_hard(
        &self,
        evidence: &mut Evidence,
        node: &str,
        state: &str,
    ) -> Result<(), EvidenceError> {
        evidence.bind_hard(&self.network, node, state)
    }

    pub fn bind_soft<'a>(
        &self,
        evidence: &mut Evidence,
        node: &str,
        weights: impl IntoIterator<Item = (&'a str, Proba)>,
    ) -> Result<(), EvidenceError> {
        evidence.bind_soft(&self.network, node, weights)
    }

    pub fn bind_vector(
        &self,
        evidence: &mut Evidence,
        node: &str,
        vector: Array1<Proba>,
    ) -> Result<(), EvidenceError> {
        evidence.bind_vector(&self.network, node, vector)
    }

    pub fn bind_prior(&self, evidence: &mut Evidence, node: &str) -> Result<(), EvidenceError> {
        evidence.bind_prior(&self.network, node)
    }

    pub fn clear(&self, evidence: &mut Evidence, node: &str) -> Option<Array1<Proba>> {
        evidence.clear(node)
    }

    pub fn infer(&self, evidence: &Evidence, node: &str) -> Result<Array1<Proba>, InferError> {
        bn::infer(&self.network, evidence, node)
    }

    pub fn infer_many<'a>(
        &self,
        evidence: &Evidence,
        nodes: impl IntoIterator<Item = &'a str>,
    ) -> Result<Marginals, InferError> {
        bn::infer_many(&self.network, evidence, nodes)
    }

    /// Infer `node` and keep the result in `evidence`, so later queries use it without
    /// recomputing. The node then stays fixed until cleared, even if its ancestors are rebound.
    pub fn infer_and_store(
        &self,
        evidence: &mut Evidence,
        node: &str,
    ) -> Result<Array1<Proba>, InferError> {
        let res = self.infer(evidence, node)?;
        evidence.store(node, res.clone());
        Ok(res)
    }

    /// Marginals of `targets` with `node` bound to `state`, everything else in `evidence` held
    /// fixed. `evidence` is restored before returning, whether or not inference succeeds.
    pub fn what_if<'a>(
        &self,
        evidence: &mut Evidence,
        node: &str,
        state: &str,
        targets: impl IntoIterator<Item = &'a str>,
    ) -> crate::Result<Marginals> {
        let previous = evidence.get(node).map(|v| v.to_owned());
        self.bind_hard(evidence, node, state)?;
        let res = self.infer_many(evidence, targets);
        match previous {
            Some(v) => evidence.store(node, v),
            None => {
                evidence.clear(node);
            }
        }
        Ok(res?)
    }
}
