//! Client-side CI state rebuilt after a transfer.
//!
//! The transfer workflow returns this value instead of writing into shared
//! caches; the caller decides where it lives.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{App, BranchConfiguration};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RehydratedCiState {
    /// The app as seen in the destination owner's namespace.
    pub app: App,
    /// Configured branches by name.
    pub branches: BTreeMap<String, BranchConfiguration>,
}

impl RehydratedCiState {
    pub fn new(app: App, configs: impl IntoIterator<Item = BranchConfiguration>) -> Self {
        Self {
            app,
            branches: configs
                .into_iter()
                .map(|config| (config.branch.clone(), config))
                .collect(),
        }
    }

    pub fn branch(&self, name: &str) -> Option<&BranchConfiguration> {
        self.branches.get(name)
    }
}
