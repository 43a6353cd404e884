//
// backend.rs
//
// LSP server wiring for include links
//

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::Client;
use tower_lsp::LanguageServer;
use tower_lsp::LspService;
use tower_lsp::Server;

use crate::handlers;
use crate::include_link::{
    parse_include_link_config, IncludeLinkConfig, InitialScan, Modifiers, PointerFeedback,
    ScanMessage,
};
use crate::state::WorldState;

/// Parameters for the tplink/pointerMoved and tplink/pointerClicked requests
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PointerEventParams {
    text_document: TextDocumentIdentifier,
    position: Position,
    #[serde(default)]
    modifiers: Modifiers,
    #[serde(default = "single_click")]
    click_count: u32,
}

fn single_click() -> u32 {
    1
}

/// Parameters for the tplink/keyReleased request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyReleasedParams {
    text_document: TextDocumentIdentifier,
    #[serde(default)]
    modifiers: Modifiers,
}

fn log_config(config: &IncludeLinkConfig) {
    log::info!("Include link configuration:");
    log::info!("  enabled: {}", config.enabled);
    log::info!("  keyword: {}", config.keyword);
    log::info!("  extensions: {:?}", config.extensions);
    log::info!("  navigation_modifier: {:?}", config.navigation_modifier);
    log::info!("  initial_scan: {}", config.initial_scan);
}

pub struct Backend {
    client: Client,
    state: Arc<RwLock<WorldState>>,
    scan_results: UnboundedSender<ScanMessage>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        let state = Arc::new(RwLock::new(WorldState::default()));
        let (scan_results, receiver) = mpsc::unbounded_channel();
        tokio::spawn(apply_scan_results(state.clone(), receiver));

        Self {
            client,
            state,
            scan_results,
        }
    }

    /// Start a background scan of the open documents, replacing any running one
    async fn start_initial_scan(&self) {
        let request = self.state.write().await.registry.begin_initial_scan();
        let Some(request) = request else {
            log::trace!("Initial include scan skipped");
            return;
        };
        InitialScan::spawn(
            request.snapshots,
            request.matcher,
            self.scan_results.clone(),
            request.token,
        );
    }

    /// Ask the client for change notifications on include target files
    async fn register_file_watcher(&self) {
        let extensions = self.state.read().await.registry.config().extensions.join(",");
        let options = DidChangeWatchedFilesRegistrationOptions {
            watchers: vec![FileSystemWatcher {
                glob_pattern: GlobPattern::String(format!("**/*.{{{}}}", extensions)),
                kind: None,
            }],
        };
        let registration = Registration {
            id: String::from("tplink-watched-files"),
            method: String::from("workspace/didChangeWatchedFiles"),
            register_options: serde_json::to_value(options).ok(),
        };
        if let Err(e) = self.client.register_capability(vec![registration]).await {
            log::warn!("Failed to register file watcher: {}", e);
        }
    }

    async fn handle_pointer_moved(&self, params: PointerEventParams) -> Result<Option<PointerFeedback>> {
        let mut state = self.state.write().await;
        Ok(handlers::pointer_moved(
            &mut state,
            &params.text_document.uri,
            params.position,
            params.modifiers,
        ))
    }

    async fn handle_pointer_clicked(&self, params: PointerEventParams) -> Result<Option<Location>> {
        let location = {
            let state = self.state.read().await;
            handlers::pointer_clicked(
                &state,
                &params.text_document.uri,
                params.position,
                params.modifiers,
                params.click_count,
            )
        };

        if let Some(location) = &location {
            log::info!("Opening include target {}", location.uri);
            let show = ShowDocumentParams {
                uri: location.uri.clone(),
                external: Some(false),
                take_focus: Some(true),
                selection: None,
            };
            if let Err(e) = self.client.show_document(show).await {
                log::warn!("Failed to open {}: {}", location.uri, e);
            }
        }
        Ok(location)
    }

    async fn handle_key_released(&self, params: KeyReleasedParams) -> Result<Option<PointerFeedback>> {
        let mut state = self.state.write().await;
        Ok(handlers::key_released(
            &mut state,
            &params.text_document.uri,
            params.modifiers,
        ))
    }
}

/// Apply background scan results on the state as they arrive
async fn apply_scan_results(
    state: Arc<RwLock<WorldState>>,
    mut receiver: UnboundedReceiver<ScanMessage>,
) {
    while let Some(message) = receiver.recv().await {
        let uri = message.uri.clone();
        let mut state = state.write().await;
        if state.registry.apply_scan(message) {
            log::trace!("Applied initial include scan for {}", uri);
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        log::info!("Initializing tplink");

        let mut state = self.state.write().await;

        let mut folders = Vec::new();
        if let Some(workspace_folders) = params.workspace_folders {
            for folder in workspace_folders {
                log::info!("Adding workspace folder: {}", folder.uri);
                folders.push(folder.uri);
            }
        } else if let Some(root_uri) = params.root_uri {
            log::info!("Adding root URI as workspace folder: {}", root_uri);
            folders.push(root_uri);
        }
        state.set_workspace_folders(folders);

        if let Some(options) = params.initialization_options.as_ref() {
            match parse_include_link_config(options, state.registry.config()) {
                Some(config) => state.registry.update_config(config),
                None => log::trace!("No includeLinks section in initialization options"),
            }
        }
        log_config(state.registry.config());

        drop(state);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                document_link_provider: Some(DocumentLinkOptions {
                    resolve_provider: Some(false),
                    work_done_progress_options: Default::default(),
                }),
                workspace: Some(WorkspaceServerCapabilities {
                    workspace_folders: Some(WorkspaceFoldersServerCapabilities {
                        supported: Some(true),
                        change_notifications: Some(OneOf::Left(true)),
                    }),
                    file_operations: None,
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: String::from("tplink"),
                version: Some(String::from(env!("CARGO_PKG_VERSION"))),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        log::info!("tplink initialized");
        self.register_file_watcher().await;
        self.start_initial_scan().await;
    }

    async fn shutdown(&self) -> Result<()> {
        log::info!("tplink shutting down");
        self.state.write().await.registry.shutdown();
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let mut state = self.state.write().await;
        let session = state.registry.open(
            uri.clone(),
            &params.text_document.text,
            Some(params.text_document.version),
        );
        log::trace!(
            "Opened {} ({} include links, {} active)",
            uri,
            session.ranges().len(),
            session.ranges().active().count()
        );
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let mut state = self.state.write().await;
        state.registry.apply_changes(
            &uri,
            params.text_document.version,
            &params.content_changes,
        );
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let mut state = self.state.write().await;
        if !state.registry.close(&params.text_document.uri) {
            log::trace!("Close for unknown document {}", params.text_document.uri);
        }
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        log::trace!("Configuration changed");

        let rescan = {
            let mut state = self.state.write().await;
            let was_enabled = state.registry.is_enabled();
            match parse_include_link_config(&params.settings, state.registry.config()) {
                Some(config) => {
                    state.registry.update_config(config);
                    log_config(state.registry.config());
                }
                None => {
                    log::warn!(
                        "No includeLinks section in settings, keeping existing configuration"
                    );
                }
            }
            !was_enabled && state.registry.is_enabled()
        };

        if rescan {
            self.start_initial_scan().await;
        }
    }

    async fn did_change_workspace_folders(&self, params: DidChangeWorkspaceFoldersParams) {
        let mut state = self.state.write().await;
        let mut folders = state.workspace_folders.clone();
        folders.retain(|folder| {
            !params
                .event
                .removed
                .iter()
                .any(|removed| &removed.uri == folder)
        });
        for added in params.event.added {
            log::info!("Adding workspace folder: {}", added.uri);
            folders.push(added.uri);
        }
        state.set_workspace_folders(folders);
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        log::trace!(
            "Received watched files change: {} changes",
            params.changes.len()
        );
        let mut state = self.state.write().await;
        let active = state.registry.revalidate_all();
        log::trace!("Revalidated include links: {} active", active);
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let state = self.state.read().await;
        Ok(handlers::hover(
            &state,
            &params.text_document_position_params.text_document.uri,
            params.text_document_position_params.position,
        ))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let state = self.state.read().await;
        Ok(handlers::goto_definition(
            &state,
            &params.text_document_position_params.text_document.uri,
            params.text_document_position_params.position,
        ))
    }

    async fn document_link(&self, params: DocumentLinkParams) -> Result<Option<Vec<DocumentLink>>> {
        let state = self.state.read().await;
        Ok(handlers::document_links(&state, &params.text_document.uri))
    }
}

pub async fn start_lsp() -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(Backend::new)
        .custom_method("tplink/pointerMoved", Backend::handle_pointer_moved)
        .custom_method("tplink/pointerClicked", Backend::handle_pointer_clicked)
        .custom_method("tplink/keyReleased", Backend::handle_key_released)
        .finish();
    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}
