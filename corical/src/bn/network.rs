use ndarray::{ArrayViewD, Axis};

use super::{ModelError, NamedList, Proba};

pub type NodeId = usize;

/// A categorical variable and its conditional probability table.
#[derive(Debug, Clone)]
pub struct Node {
    pub(super) states: Vec<String>,
    pub(super) parents: Vec<NodeId>,
    // shape: parent cardinalities in declared order, then own cardinality
    pub(super) cpt: ndarray::ArrayD<Proba>,
}

impl Node {
    pub fn states(&self) -> &[String] {
        self.states.as_slice()
    }
    pub fn cardinality(&self) -> usize {
        self.states.len()
    }
    pub fn state_index(&self, state: &str) -> Option<usize> {
        self.states.iter().position(|s| s == state)
    }
    pub fn parents(&self) -> &[NodeId] {
        self.parents.as_slice()
    }
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
    pub fn cpt(&self) -> ArrayViewD<'_, Proba> {
        self.cpt.view()
    }
}

/// Immutable set of nodes, in declaration order. A `NodeId` is the position of a node in that
/// order.
#[derive(Debug, Clone)]
pub struct Network {
    pub(super) nodes: NamedList<Node>,
    pub(super) tolerance: Proba,
}

impl Network {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.nodes.get_index_of(name)
    }
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get_index(id).map(|(_, n)| n)
    }
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get_index(id).map(|(n, _)| n.as_str())
    }
    // ids held by nodes and resolvers always come from this network
    pub(crate) fn node_at(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }
    pub(crate) fn name_at(&self, id: NodeId) -> &str {
        self.nodes.get_index(id).map_or("", |(n, _)| n.as_str())
    }
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.nodes.iter().map(|(n, v)| (n.as_str(), v))
    }
    pub fn parent_names(&self, id: NodeId) -> impl Iterator<Item = &str> {
        self.node(id)
            .into_iter()
            .flat_map(|n| n.parents.iter())
            .map(|p| self.name_at(*p))
    }
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .values()
            .enumerate()
            .filter(move |(_, n)| n.parents.contains(&id))
            .map(|(child, _)| child)
    }
    /// Tolerance the network was loaded with, also used to validate evidence.
    pub fn tolerance(&self) -> Proba {
        self.tolerance
    }

    /// True if following parent links from some node leads back to it.
    pub fn is_cyclic(&self) -> bool {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Open,
            Done,
        }
        let mut marks = vec![Mark::New; self.len()];
        for start in 0..self.len() {
            if marks[start] != Mark::New {
                continue;
            }
            // (node, index of next parent to visit)
            let mut stack = vec![(start, 0)];
            marks[start] = Mark::Open;
            while let Some((node, next)) = stack.pop() {
                if let Some(&parent) = self.nodes[node].parents.get(next) {
                    stack.push((node, next + 1));
                    match marks[parent] {
                        Mark::Open => return true,
                        Mark::New => {
                            marks[parent] = Mark::Open;
                            stack.push((parent, 0));
                        }
                        Mark::Done => {}
                    }
                } else {
                    marks[node] = Mark::Done;
                }
            }
        }
        false
    }

    /// Check that every CPT slice along the own-state axis sums to one within `tolerance`.
    pub fn check_normalized(&self, tolerance: Proba) -> Result<(), ModelError> {
        match self.unnormalized(tolerance).into_iter().next() {
            Some(defect) => Err(defect),
            None => Ok(()),
        }
    }

    /// All CPT slices that do not sum to one within `tolerance`.
    pub fn unnormalized(&self, tolerance: Proba) -> Vec<ModelError> {
        let mut defects = Vec::new();
        for (name, node) in self.nodes.iter() {
            let last = Axis(node.cpt.ndim() - 1);
            let parent_shape = &node.cpt.shape()[..node.cpt.ndim() - 1];
            for (flat, lane) in node.cpt.lanes(last).into_iter().enumerate() {
                let sum = lane.sum();
                if (sum - 1.0).abs() > tolerance || !sum.is_finite() {
                    defects.push(ModelError::NotNormalized {
                        node: name.clone(),
                        parent_states: unravel(flat, parent_shape),
                        sum,
                    });
                }
            }
        }
        defects
    }
}

/// Row-major multi-index of the flat position `flat` in an array of the given shape.
fn unravel(mut flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut index = vec![0; shape.len()];
    for (i, d) in shape.iter().enumerate().rev() {
        index[i] = flat % d;
        flat /= d;
    }
    index
}
