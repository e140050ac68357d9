//! The evidence/query contract shared by inference engines.

use ndarray::Array1;

use crate::bn::{Evidence, EvidenceError, Marginals, Proba};
use crate::query::Fact;
use crate::{CoricalError, ProbabilityModel};

/// An inference engine: binds named facts into an [`Evidence`] context and answers marginal
/// queries on named nodes.
///
/// [`ProbabilityModel`] implements it with recursive CPT contraction. Another engine (e.g. a
/// general junction-tree solver) can be used behind the same query layer by implementing this
/// trait.
pub trait InferenceBackend: Send + Sync {
    /// States of `node`, in distribution order.
    fn states(&self, node: &str) -> Option<&[String]>;
    fn bind(&self, evidence: &mut Evidence, node: &str, fact: &Fact) -> crate::Result<()>;
    fn marginal(&self, evidence: &Evidence, node: &str) -> crate::Result<Array1<Proba>>;
    fn marginals(&self, evidence: &Evidence, nodes: &[String]) -> crate::Result<Marginals> {
        nodes
            .iter()
            .map(|n| Ok((n.clone(), self.marginal(evidence, n)?)))
            .collect()
    }
}

impl InferenceBackend for ProbabilityModel {
    fn states(&self, node: &str) -> Option<&[String]> {
        self.network().get(node).map(|n| n.states())
    }
    fn bind(&self, evidence: &mut Evidence, node: &str, fact: &Fact) -> crate::Result<()> {
        let res: Result<(), EvidenceError> = match fact {
            Fact::State(state) => self.bind_hard(evidence, node, state),
            Fact::Weights(weights) => self.bind_soft(
                evidence,
                node,
                weights.iter().map(|(s, w)| (s.as_str(), *w)),
            ),
            Fact::Vector(v) => self.bind_vector(evidence, node, Array1::from(v.clone())),
        };
        res.map_err(CoricalError::from)
    }
    fn marginal(&self, evidence: &Evidence, node: &str) -> crate::Result<Array1<Proba>> {
        Ok(self.infer(evidence, node)?)
    }
    fn marginals(&self, evidence: &Evidence, nodes: &[String]) -> crate::Result<Marginals> {
        Ok(self.infer_many(evidence, nodes.iter().map(String::as_str))?)
    }
}
