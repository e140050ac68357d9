mod evidence;
mod inference;
mod net_build;
mod network;
mod xdsl;

use crate::Config;

pub type Proba = f64;
type NamedList<T> = indexmap::IndexMap<String, T>;

/// Marginal distributions keyed by node name, in query order.
pub type Marginals = NamedList<ndarray::Array1<Proba>>;

pub use evidence::{Evidence, EvidenceError};
pub use inference::{infer, infer_many, InferError};
pub use net_build::ModelError;
pub use network::{Network, Node, NodeId};

/// Parse an `.xdsl` network description and build the CPT tensors of all its nodes.
pub fn build_network(description: &str, config: &Config) -> Result<Network, ModelError> {
    let decls = xdsl::parse(description)?;
    net_build::build_network(decls, config)
}
