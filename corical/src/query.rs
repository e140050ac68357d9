//! Query contract between the inference core and its callers.
//!
//! A [`Query`] names facts and target nodes; [`run_query`] binds the facts into a fresh context
//! and returns the marginal of each target, for the base facts and for every named scenario.
//! Scenarios override some facts on a copy of the base context, e.g. to compare "no vaccine"
//! with "two doses", or to condition on infection.

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::backend::InferenceBackend;
use crate::bn::{Evidence, Proba};

/// A fact bound to one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fact {
    /// The node is known to be in this state.
    State(String),
    /// Weighted belief over named states.
    Weights(IndexMap<String, Proba>),
    /// Probability vector in state order.
    Vector(Vec<Proba>),
}

impl From<&str> for Fact {
    fn from(state: &str) -> Self {
        Fact::State(state.to_owned())
    }
}

pub type Facts = IndexMap<String, Fact>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub facts: Facts,
    pub targets: Vec<String>,
    #[serde(default)]
    pub scenarios: IndexMap<String, Facts>,
}

impl Query {
    pub fn new<S: Into<String>>(targets: impl IntoIterator<Item = S>) -> Self {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
    pub fn fact(mut self, node: impl Into<String>, fact: impl Into<Fact>) -> Self {
        self.facts.insert(node.into(), fact.into());
        self
    }
    pub fn scenario(mut self, name: impl Into<String>, overrides: Facts) -> Self {
        self.scenarios.insert(name.into(), overrides);
        self
    }
}

/// Marginal of each target node, in target order.
pub type Outcomes = IndexMap<String, Vec<Proba>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub baseline: Outcomes,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub scenarios: IndexMap<String, Outcomes>,
}

impl QueryResult {
    pub fn marginal(&self, node: &str) -> Option<&[Proba]> {
        self.baseline.get(node).map(Vec::as_slice)
    }
    /// Probability of the first state of `node` ("Yes" by convention).
    pub fn risk(&self, node: &str) -> Option<Proba> {
        self.marginal(node).and_then(|m| m.first().copied())
    }
    pub fn scenario_risk(&self, scenario: &str, node: &str) -> Option<Proba> {
        self.scenarios
            .get(scenario)?
            .get(node)
            .and_then(|m| m.first().copied())
    }
}

fn bind_all(
    backend: &dyn InferenceBackend,
    evidence: &mut Evidence,
    facts: &Facts,
) -> crate::Result<()> {
    for (node, fact) in facts {
        backend.bind(evidence, node, fact)?;
    }
    Ok(())
}

fn outcomes(
    backend: &dyn InferenceBackend,
    evidence: &Evidence,
    targets: &[String],
) -> crate::Result<Outcomes> {
    Ok(backend
        .marginals(evidence, targets)?
        .into_iter()
        .map(|(node, m)| (node, m.to_vec()))
        .collect())
}

/// Evaluate `query` in its own evidence context.
pub fn run_query(backend: &dyn InferenceBackend, query: &Query) -> crate::Result<QueryResult> {
    let _span = tracing::debug_span!(
        "query",
        facts = query.facts.len(),
        targets = query.targets.len(),
        scenarios = query.scenarios.len()
    )
    .entered();
    let mut evidence = Evidence::new();
    bind_all(backend, &mut evidence, &query.facts)?;
    let baseline = outcomes(backend, &evidence, &query.targets)?;
    let scenarios = query
        .scenarios
        .iter()
        .map(|(name, overrides)| {
            let mut evidence = evidence.clone();
            bind_all(backend, &mut evidence, overrides)?;
            Ok((name.clone(), outcomes(backend, &evidence, &query.targets)?))
        })
        .collect::<crate::Result<_>>()?;
    Ok(QueryResult {
        baseline,
        scenarios,
    })
}

/// Evaluate independent queries in parallel against a shared backend.
pub fn run_batch(
    backend: &dyn InferenceBackend,
    queries: &[Query],
) -> Vec<crate::Result<QueryResult>> {
    queries.par_iter().map(|q| run_query(backend, q)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fact_json() {
        let q: Query = serde_json::from_str(
            r#"{
                "facts": {
                    "Sex": "Female",
                    "Age": {"Young": 0.5, "Old": 0.5},
                    "Transmission": [0.1, 0.9]
                },
                "targets": ["Infection"],
                "scenarios": {"infected": {"Infection": "Yes"}}
            }"#,
        )
        .unwrap();
        assert_eq!(q.facts["Sex"], Fact::State("Female".to_owned()));
        assert!(matches!(&q.facts["Age"], Fact::Weights(w) if w.len() == 2));
        assert_eq!(q.facts["Transmission"], Fact::Vector(vec![0.1, 0.9]));
        assert_eq!(q.scenarios["infected"]["Infection"], Fact::from("Yes"));

        let q: Query = serde_json::from_str(r#"{"targets": ["A"]}"#).unwrap();
        assert_eq!(q, Query::new(["A"]));
    }

    #[test]
    fn result_risk() {
        let mut res = QueryResult::default();
        res.baseline.insert("A".to_owned(), vec![0.25, 0.75]);
        assert_eq!(res.risk("A"), Some(0.25));
        assert_eq!(res.risk("B"), None);
        assert_eq!(res.scenario_risk("s", "A"), None);
        let json = serde_json::to_string(&res).unwrap();
        assert_eq!(json, r#"{"baseline":{"A":[0.25,0.75]}}"#);
    }
}
