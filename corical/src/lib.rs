//! Personalised risk estimates from discrete Bayesian networks.
//!
//! A network is loaded once from a GeNIe/SMILE `.xdsl` description, its conditional probability
//! tables are shaped into tensors, and marginals are computed per session against an
//! [`Evidence`] context owned by the caller.

pub mod backend;
pub mod bn;
pub mod catalog;
pub mod model;
pub mod query;

pub use backend::InferenceBackend;
pub use bn::{Evidence, EvidenceError, InferError, ModelError, Network, Node, NodeId, Proba};
pub use catalog::ModelCatalog;
pub use model::ProbabilityModel;
pub use query::{Fact, Query, QueryResult};

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoricalError>;

/// Default tolerance for sum-to-one checks.
pub const DEFAULT_TOLERANCE: Proba = 1e-9;

#[derive(Error, Debug)]
pub enum CoricalError {
    #[error("Cannot read model file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Evidence(#[from] EvidenceError),
    #[error(transparent)]
    Infer(#[from] InferError),
    #[error("No model named {0}.")]
    UnknownModel(String),
}

impl CoricalError {
    /// True for errors caused by the caller's request (bad node, state, weights or model name),
    /// false for defects of the model files or of the evidence the caller is required to bind.
    pub fn is_invalid_argument(&self) -> bool {
        match self {
            CoricalError::Evidence(_) | CoricalError::UnknownModel(_) => true,
            CoricalError::Infer(InferError::UnknownNode(_)) => true,
            CoricalError::Io { .. } | CoricalError::Model(_) | CoricalError::Infer(_) => false,
        }
    }
}

/// What to do with a CPT slice that does not sum to one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationPolicy {
    /// Fail the load with [`ModelError::NotNormalized`].
    #[default]
    Reject,
    /// Log a warning and load the table as is.
    Warn,
    Ignore,
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Absolute tolerance used when checking that probability vectors sum to one, both for CPT
    /// slices at load time and for caller-supplied evidence.
    pub tolerance: Proba,
    pub normalization: NormalizationPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            normalization: NormalizationPolicy::Reject,
        }
    }
}

impl Config {
    /// Accept non-normalized tables with a warning, as GeNIe-exported files are sometimes
    /// rounded beyond the default tolerance.
    pub fn lenient() -> Self {
        Self {
            normalization: NormalizationPolicy::Warn,
            ..Self::default()
        }
    }
    pub fn with_tolerance(mut self, tolerance: Proba) -> Self {
        self.tolerance = tolerance;
        self
    }
}
