use std::collections::HashMap;

use ndarray::{Array1, ArrayD, ArrayView1, ArrayViewD, Axis, Ix1};
use thiserror::Error;

use super::{Evidence, Marginals, Network, NodeId, Proba};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferError {
    #[error("No node named {0}.")]
    UnknownNode(String),
    #[error("Cycle detected: {}.", .0.join(" -> "))]
    CycleDetected(Vec<String>),
    #[error("Node {node}: table expects a vector of length {expected} for {parent}, got {got}.")]
    ShapeMismatch {
        node: String,
        parent: String,
        expected: usize,
        got: usize,
    },
    #[error("Node {0} has no parents and no evidence bound.")]
    UnresolvedRoot(String),
}

type Result<T> = std::result::Result<T, InferError>;

/// Marginal distribution of `node` given `evidence`.
///
/// A node bound in `evidence` is returned as is. Otherwise its parents are resolved recursively
/// and contracted into its CPT, last parent first. Parents are treated as independent given the
/// evidence, which is exact for tree-shaped dependencies and an approximation when two parents
/// share an unobserved ancestor.
pub fn infer(net: &Network, evidence: &Evidence, node: &str) -> Result<Array1<Proba>> {
    let id = net
        .node_id(node)
        .ok_or_else(|| InferError::UnknownNode(node.to_owned()))?;
    Resolver::new(net, evidence).resolve(id)
}

/// Marginals of all `nodes` given `evidence`. Ancestors shared between them are resolved once.
pub fn infer_many<'a>(
    net: &Network,
    evidence: &Evidence,
    nodes: impl IntoIterator<Item = &'a str>,
) -> Result<Marginals> {
    let mut resolver = Resolver::new(net, evidence);
    nodes
        .into_iter()
        .map(|node| {
            let id = net
                .node_id(node)
                .ok_or_else(|| InferError::UnknownNode(node.to_owned()))?;
            Ok((node.to_owned(), resolver.resolve(id)?))
        })
        .collect()
}

struct Resolver<'a> {
    net: &'a Network,
    evidence: &'a Evidence,
    // marginals computed during this call, valid as long as evidence is unchanged
    memo: HashMap<NodeId, Array1<Proba>>,
    // nodes being resolved, from the query down to the current node
    path: Vec<NodeId>,
}

impl<'a> Resolver<'a> {
    fn new(net: &'a Network, evidence: &'a Evidence) -> Self {
        Self {
            net,
            evidence,
            memo: HashMap::new(),
            path: Vec::new(),
        }
    }

    fn resolve(&mut self, id: NodeId) -> Result<Array1<Proba>> {
        let net = self.net;
        let name = net.name_at(id);
        if let Some(v) = self.evidence.get(name) {
            return Ok(v.to_owned());
        }
        if let Some(v) = self.memo.get(&id) {
            return Ok(v.clone());
        }
        if let Some(start) = self.path.iter().position(|n| *n == id) {
            let cycle = self.path[start..]
                .iter()
                .chain(std::iter::once(&id))
                .map(|n| net.name_at(*n).to_owned())
                .collect::<Vec<_>>();
            tracing::error!(cycle = ?cycle, "cyclic network");
            return Err(InferError::CycleDetected(cycle));
        }
        let node = net.node_at(id);
        if node.is_root() {
            tracing::error!(node = name, "root node without evidence");
            return Err(InferError::UnresolvedRoot(name.to_owned()));
        }
        self.path.push(id);
        let mut cur = node.cpt.clone();
        for &parent in node.parents.iter().rev() {
            let parent_state = self.resolve(parent)?;
            cur = contract_last_parent(cur.view(), parent_state.view()).ok_or_else(|| {
                InferError::ShapeMismatch {
                    node: name.to_owned(),
                    parent: net.name_at(parent).to_owned(),
                    expected: cur.shape()[cur.ndim() - 2],
                    got: parent_state.len(),
                }
            })?;
        }
        self.path.pop();
        let res = cur
            .into_dimensionality::<Ix1>()
            .map_err(|_| InferError::ShapeMismatch {
                node: name.to_owned(),
                parent: name.to_owned(),
                expected: node.cardinality(),
                got: node.cpt.len(),
            })?;
        self.memo.insert(id, res.clone());
        Ok(res)
    }
}

/// Contract the second-to-last axis of `tensor` (the last remaining parent axis) against
/// `parent`: `res[.., s] = sum_p parent[p] * tensor[.., p, s]`.
/// Returns None if the axis length does not match `parent`.
fn contract_last_parent(
    tensor: ArrayViewD<Proba>,
    parent: ArrayView1<Proba>,
) -> Option<ArrayD<Proba>> {
    let axis = Axis(tensor.ndim().checked_sub(2)?);
    if tensor.len_of(axis) != parent.len() || parent.is_empty() {
        return None;
    }
    let mut res = ArrayD::zeros(tensor.index_axis(axis, 0).raw_dim());
    for (p, slice) in parent.iter().zip(tensor.axis_iter(axis)) {
        res.scaled_add(*p, &slice);
    }
    Some(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array3};

    #[test]
    fn contraction_matches_sum() {
        let t = Array3::from_shape_fn((3, 2, 2), |(i, j, k)| (i * 4 + j * 2 + k) as Proba);
        let b = array![0.25, 0.75];
        let a = array![0.5, 0.3, 0.2];
        let step = contract_last_parent(t.view().into_dyn(), b.view()).unwrap();
        assert_eq!(step.shape(), &[3, 2]);
        let res = contract_last_parent(step.view(), a.view()).unwrap();
        for k in 0..2 {
            let mut expected = 0.0;
            for i in 0..3 {
                for j in 0..2 {
                    expected += a[i] * b[j] * t[(i, j, k)];
                }
            }
            assert_abs_diff_eq!(res[[k]], expected, epsilon = 1e-12);
        }
        assert!(contract_last_parent(t.view().into_dyn(), a.view()).is_none());
        assert!(contract_last_parent(array![0.5, 0.5].into_dyn().view(), b.view()).is_none());
    }

    const CHAIN: &str = r#"<smile><nodes>
        <cpt id="R"><state id="Yes"/><state id="No"/>
            <probabilities>0.3 0.7</probabilities></cpt>
        <cpt id="C"><state id="Yes"/><state id="No"/><parents>R</parents>
            <probabilities>0.8 0.2 0.1 0.9</probabilities></cpt>
        <cpt id="D"><state id="Yes"/><state id="No"/><parents>C</parents>
            <probabilities>0.5 0.5 0.0 1.0</probabilities></cpt>
        </nodes></smile>"#;

    #[test]
    fn chain() {
        let net = crate::bn::build_network(CHAIN, &Config::default()).unwrap();
        let mut ev = Evidence::new();
        assert_eq!(
            infer(&net, &ev, "C"),
            Err(InferError::UnresolvedRoot("R".to_owned()))
        );
        ev.bind_hard(&net, "R", "Yes").unwrap();
        assert_eq!(infer(&net, &ev, "C").unwrap()[0], 0.8);
        ev.bind_hard(&net, "R", "No").unwrap();
        assert_eq!(infer(&net, &ev, "C").unwrap()[0], 0.1);
        ev.bind_prior(&net, "R").unwrap();
        assert_abs_diff_eq!(infer(&net, &ev, "C").unwrap()[0], 0.31, epsilon = 1e-12);
        assert_abs_diff_eq!(infer(&net, &ev, "D").unwrap()[0], 0.155, epsilon = 1e-12);
        // evidence on C shadows R
        ev.bind_hard(&net, "C", "No").unwrap();
        assert_eq!(infer(&net, &ev, "D").unwrap(), array![0.0, 1.0]);
        assert_eq!(
            infer(&net, &ev, "E"),
            Err(InferError::UnknownNode("E".to_owned()))
        );

        // evidence bound against a network where R has three states
        let other = crate::bn::build_network(
            r#"<smile><nodes><cpt id="R"><state id="a"/><state id="b"/><state id="c"/>
                <probabilities>0.2 0.3 0.5</probabilities></cpt></nodes></smile>"#,
            &Config::default(),
        )
        .unwrap();
        let mut ev = Evidence::new();
        ev.bind_hard(&other, "R", "c").unwrap();
        assert_eq!(
            infer(&net, &ev, "C"),
            Err(InferError::ShapeMismatch {
                node: "C".to_owned(),
                parent: "R".to_owned(),
                expected: 2,
                got: 3,
            })
        );
    }

    #[test]
    fn many_shares_ancestors() {
        let net = crate::bn::build_network(CHAIN, &Config::default()).unwrap();
        let mut ev = Evidence::new();
        ev.bind_prior(&net, "R").unwrap();
        let res = infer_many(&net, &ev, ["D", "C", "R"]).unwrap();
        assert_eq!(res.keys().collect::<Vec<_>>(), vec!["D", "C", "R"]);
        assert_eq!(res["C"], infer(&net, &ev, "C").unwrap());
        assert_eq!(res["D"], infer(&net, &ev, "D").unwrap());
        assert_eq!(res["R"], array![0.3, 0.7]);
    }

    #[test]
    fn cycle() {
        let src = r#"<smile><nodes>
            <cpt id="Z"><state id="a"/><state id="b"/><probabilities>0.5 0.5</probabilities></cpt>
            <cpt id="X"><state id="a"/><state id="b"/><parents>Y Z</parents>
                <probabilities>1 0 0 1 0 1 1 0</probabilities></cpt>
            <cpt id="Y"><state id="a"/><state id="b"/><parents>X</parents>
                <probabilities>1 0 0 1</probabilities></cpt>
            </nodes></smile>"#;
        let net = crate::bn::build_network(src, &Config::default()).unwrap();
        let mut ev = Evidence::new();
        ev.bind_hard(&net, "Z", "a").unwrap();
        assert_eq!(
            infer(&net, &ev, "X"),
            Err(InferError::CycleDetected(vec![
                "X".to_owned(),
                "Y".to_owned(),
                "X".to_owned()
            ]))
        );
        // binding a node of the cycle breaks it
        ev.bind_hard(&net, "Y", "b").unwrap();
        assert_eq!(infer(&net, &ev, "X").unwrap(), array![0.0, 1.0]);
    }
}
