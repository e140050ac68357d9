//! Command-line fact syntax.
//!
//! `node=State` is a hard fact, `node=A:0.2,B:0.8` weighs named states and `node=[0.2,0.8]`
//! gives the vector in state order. A scenario override is prefixed with its name:
//! `infected:n5_Infection=Yes`.

use corical::query::Facts;
use corical::{Fact, Proba, Query};
use indexmap::IndexMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FactSyntaxError {
    #[error("expected NODE=VALUE, got '{0}'")]
    MissingValue(String),
    #[error("expected SCENARIO:NODE=VALUE, got '{0}'")]
    MissingScenario(String),
    #[error("'{0}' is not a number")]
    Number(String),
    #[error("expected STATE:WEIGHT, got '{0}'")]
    Weight(String),
}

fn number(s: &str) -> Result<Proba, FactSyntaxError> {
    s.trim()
        .parse()
        .map_err(|_| FactSyntaxError::Number(s.trim().to_owned()))
}

/// Parse the value part of an assignment.
pub fn parse_fact(value: &str) -> Result<Fact, FactSyntaxError> {
    let value = value.trim();
    if let Some(inner) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
        return inner
            .split(',')
            .map(number)
            .collect::<Result<_, _>>()
            .map(Fact::Vector);
    }
    if value.contains(':') {
        return value
            .split(',')
            .map(|item| {
                let (state, weight) = item
                    .split_once(':')
                    .ok_or_else(|| FactSyntaxError::Weight(item.to_owned()))?;
                Ok((state.trim().to_owned(), number(weight)?))
            })
            .collect::<Result<IndexMap<_, _>, _>>()
            .map(Fact::Weights);
    }
    Ok(Fact::State(value.to_owned()))
}

/// Parse `NODE=VALUE`.
pub fn parse_assignment(s: &str) -> Result<(String, Fact), FactSyntaxError> {
    let (node, value) = s
        .split_once('=')
        .filter(|(n, v)| !n.trim().is_empty() && !v.trim().is_empty())
        .ok_or_else(|| FactSyntaxError::MissingValue(s.to_owned()))?;
    Ok((node.trim().to_owned(), parse_fact(value)?))
}

/// Parse `SCENARIO:NODE=VALUE`.
pub fn parse_override(s: &str) -> Result<(String, String, Fact), FactSyntaxError> {
    let (scenario, assignment) = s
        .split_once(':')
        .filter(|(name, a)| !name.trim().is_empty() && !name.contains('=') && a.contains('='))
        .ok_or_else(|| FactSyntaxError::MissingScenario(s.to_owned()))?;
    let (node, fact) = parse_assignment(assignment)?;
    Ok((scenario.trim().to_owned(), node, fact))
}

/// Assemble a query, grouping overrides by scenario in order of first appearance.
pub fn build_query(
    facts: Vec<(String, Fact)>,
    overrides: Vec<(String, String, Fact)>,
    targets: Vec<String>,
) -> Query {
    let mut scenarios: IndexMap<String, Facts> = IndexMap::new();
    for (scenario, node, fact) in overrides {
        scenarios.entry(scenario).or_default().insert(node, fact);
    }
    Query {
        facts: facts.into_iter().collect(),
        targets,
        scenarios,
    }
}
