//
// state.rs
//
// Server state shared by the LSP handlers
//

use std::path::PathBuf;

use tower_lsp::lsp_types::Url;

use crate::include_link::{IncludeLinkConfig, SessionRegistry};

/// Global server state
pub struct WorldState {
    pub registry: SessionRegistry,
    pub workspace_folders: Vec<Url>,
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new(IncludeLinkConfig::default())
    }
}

impl WorldState {
    pub fn new(config: IncludeLinkConfig) -> Self {
        Self {
            registry: SessionRegistry::new(config),
            workspace_folders: Vec::new(),
        }
    }

    /// Replace the workspace folders. The first `file://` folder becomes the
    /// root for '/'-prefixed include paths.
    pub fn set_workspace_folders(&mut self, folders: Vec<Url>) {
        self.workspace_folders = folders;
        let root = self.workspace_root();
        self.registry.set_workspace_root(root);
    }

    pub fn workspace_root(&self) -> Option<PathBuf> {
        self.workspace_folders
            .iter()
            .find_map(|folder| folder.to_file_path().ok())
    }
}
