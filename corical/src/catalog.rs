use std::path::Path;

use indexmap::IndexMap;

use crate::{Config, CoricalError, ProbabilityModel};

/// Named models loaded at start-up, e.g. one per vaccine product.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    models: IndexMap<String, ProbabilityModel>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `(name, path)` entry. Fails on the first model that cannot be loaded.
    pub fn load<N, P>(
        entries: impl IntoIterator<Item = (N, P)>,
        config: &Config,
    ) -> crate::Result<Self>
    where
        N: Into<String>,
        P: AsRef<Path>,
    {
        let mut catalog = Self::new();
        for (name, path) in entries {
            let name = name.into();
            let model = ProbabilityModel::load(path.as_ref(), config).inspect_err(|e| {
                tracing::error!(model = %name, error = %e, "cannot load model");
            })?;
            catalog.insert(name, model);
        }
        Ok(catalog)
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        model: ProbabilityModel,
    ) -> Option<ProbabilityModel> {
        self.models.insert(name.into(), model)
    }

    pub fn get(&self, name: &str) -> crate::Result<&ProbabilityModel> {
        self.models
            .get(name)
            .ok_or_else(|| CoricalError::UnknownModel(name.to_owned()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProbabilityModel)> {
        self.models.iter().map(|(n, m)| (n.as_str(), m))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
