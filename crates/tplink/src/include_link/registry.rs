//
// include_link/registry.rs
//
// Open documents and their include link sessions
//

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::{TextDocumentContentChangeEvent, Url};

use super::config::IncludeLinkConfig;
use super::document::LinkDocument;
use super::initial_scan::{ScanMessage, ScanSnapshot};
use super::pattern::LinkPatternMatcher;
use super::session::DocumentSession;

/// Work handed to the background initial scan
pub struct InitialScanRequest {
    pub snapshots: Vec<ScanSnapshot>,
    pub matcher: LinkPatternMatcher,
    pub token: CancellationToken,
}

/// Sessions of all open documents, in open order.
///
/// A session is inserted when its document opens and removed when it closes.
/// While the registry is disabled, sessions keep their documents up to date
/// but hold no ranges.
pub struct SessionRegistry {
    sessions: IndexMap<Url, DocumentSession>,
    config: IncludeLinkConfig,
    matcher: LinkPatternMatcher,
    workspace_root: Option<PathBuf>,
    scan_token: Option<CancellationToken>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(IncludeLinkConfig::default())
    }
}

impl SessionRegistry {
    pub fn new(config: IncludeLinkConfig) -> Self {
        let (config, matcher) = match LinkPatternMatcher::from_config(&config) {
            Ok(matcher) => (config, matcher),
            Err(e) => {
                log::warn!("Invalid include pattern settings, using defaults: {}", e);
                let defaults = IncludeLinkConfig::default();
                let config = IncludeLinkConfig {
                    keyword: defaults.keyword,
                    extensions: defaults.extensions,
                    ..config
                };
                (config, LinkPatternMatcher::default())
            }
        };
        Self {
            sessions: IndexMap::new(),
            config,
            matcher,
            workspace_root: None,
            scan_token: None,
        }
    }

    pub fn config(&self) -> &IncludeLinkConfig {
        &self.config
    }

    pub fn matcher(&self) -> &LinkPatternMatcher {
        &self.matcher
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn workspace_root(&self) -> Option<&Path> {
        self.workspace_root.as_deref()
    }

    /// Set the root for '/'-prefixed include paths and rescan
    pub fn set_workspace_root(&mut self, root: Option<PathBuf>) {
        if self.workspace_root == root {
            return;
        }
        self.workspace_root = root;
        for session in self.sessions.values_mut() {
            session
                .document_mut()
                .set_workspace_root(self.workspace_root.as_deref());
            session.scan_and_activate();
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, uri: &Url) -> bool {
        self.sessions.contains_key(uri)
    }

    pub fn uris(&self) -> impl Iterator<Item = &Url> {
        self.sessions.keys()
    }

    pub fn get(&self, uri: &Url) -> Option<&DocumentSession> {
        self.sessions.get(uri)
    }

    pub fn get_mut(&mut self, uri: &Url) -> Option<&mut DocumentSession> {
        self.sessions.get_mut(uri)
    }

    /// Create the session of a newly visible document and scan it.
    /// Reopening a document replaces its session.
    pub fn open(&mut self, uri: Url, text: &str, version: Option<i32>) -> &DocumentSession {
        if let Some(mut previous) = self.sessions.shift_remove(&uri) {
            previous.close();
        }

        let document = LinkDocument::new(uri.clone(), text, version, self.workspace_root.as_deref());
        let mut session = DocumentSession::new(
            document,
            self.matcher.clone(),
            self.config.navigation_modifier,
        );
        if self.config.enabled {
            session.start_listening();
            let active = session.scan_and_activate();
            log::trace!("Opened {} with {} active include links", uri, active);
        }

        self.sessions.entry(uri).or_insert(session)
    }

    /// Tear down and remove the session of a closed document
    pub fn close(&mut self, uri: &Url) -> bool {
        match self.sessions.shift_remove(uri) {
            Some(mut session) => {
                session.close();
                true
            }
            None => false,
        }
    }

    /// Apply LSP content changes in order. Returns `false` for unknown documents.
    pub fn apply_changes(
        &mut self,
        uri: &Url,
        version: i32,
        changes: &[TextDocumentContentChangeEvent],
    ) -> bool {
        let Some(session) = self.sessions.get_mut(uri) else {
            log::warn!("Change for unknown document {}", uri);
            return false;
        };
        for change in changes {
            session.apply_lsp_change(change);
        }
        session.document_mut().set_version(version);
        true
    }

    /// Project-level switch. Disabling tears every session down; enabling
    /// registers and rescans them.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.config.enabled == enabled {
            return;
        }
        self.config.enabled = enabled;
        if enabled {
            log::info!("Include links enabled");
            for session in self.sessions.values_mut() {
                session.start_listening();
                session.scan_and_activate();
            }
        } else {
            log::info!("Include links disabled");
            self.cancel_initial_scan();
            for session in self.sessions.values_mut() {
                session.teardown();
            }
        }
    }

    /// Apply new settings. Pattern changes rebuild the matcher and rescan every
    /// session; an unusable pattern keeps the current one.
    pub fn update_config(&mut self, config: IncludeLinkConfig) {
        let mut config = config;

        if config.pattern_settings_changed(&self.config) {
            match LinkPatternMatcher::from_config(&config) {
                Ok(matcher) => {
                    log::info!(
                        "Include pattern changed: keyword={:?} extensions={:?}",
                        config.keyword,
                        config.extensions
                    );
                    self.matcher = matcher;
                    for session in self.sessions.values_mut() {
                        session.set_matcher(self.matcher.clone());
                    }
                }
                Err(e) => {
                    log::warn!("Ignoring invalid include pattern settings: {}", e);
                    config.keyword = self.config.keyword.clone();
                    config.extensions = self.config.extensions.clone();
                }
            }
        }

        if config.navigation_modifier != self.config.navigation_modifier {
            for session in self.sessions.values_mut() {
                session.set_navigation_modifier(config.navigation_modifier);
            }
        }

        let enabled = config.enabled;
        config.enabled = self.config.enabled;
        self.config = config;
        self.set_enabled(enabled);
    }

    /// Rescan every listening session. Returns the total of active links.
    pub fn revalidate_all(&mut self) -> usize {
        self.sessions
            .values_mut()
            .map(|session| session.scan_and_activate())
            .sum()
    }

    /// Snapshots of every listening session for the background scan
    pub fn scan_snapshots(&self) -> Vec<ScanSnapshot> {
        self.sessions
            .values()
            .filter(|session| session.is_listening())
            .map(|session| {
                let document = session.document();
                ScanSnapshot {
                    uri: document.uri().clone(),
                    revision: document.revision(),
                    contents: document.contents().clone(),
                    context: document.path_context().clone(),
                }
            })
            .collect()
    }

    /// Prepare a background scan of the open documents, cancelling any scan
    /// still running. Returns `None` when disabled.
    pub fn begin_initial_scan(&mut self) -> Option<InitialScanRequest> {
        self.cancel_initial_scan();
        if !self.config.enabled || !self.config.initial_scan {
            return None;
        }
        let token = CancellationToken::new();
        self.scan_token = Some(token.clone());
        Some(InitialScanRequest {
            snapshots: self.scan_snapshots(),
            matcher: self.matcher.clone(),
            token,
        })
    }

    pub fn cancel_initial_scan(&mut self) {
        if let Some(token) = self.scan_token.take() {
            token.cancel();
        }
    }

    /// Apply a background scan result. A result for a document edited since
    /// its snapshot is replaced by a fresh scan. Returns `false` when the
    /// document is gone or not listening.
    pub fn apply_scan(&mut self, message: ScanMessage) -> bool {
        let Some(session) = self.sessions.get_mut(&message.uri) else {
            log::trace!("Scan result for closed document {}", message.uri);
            return false;
        };
        if !session.is_listening() {
            return false;
        }
        let revision = message.revision;
        if !session.apply_scan(revision, message.candidates) {
            log::warn!(
                "Stale scan result for {} (revision {} vs {}), rescanning",
                message.uri,
                revision,
                session.document().revision()
            );
            session.scan_and_activate();
        }
        true
    }

    /// Cancel background work and close every session
    pub fn shutdown(&mut self) {
        self.cancel_initial_scan();
        for (_, mut session) in self.sessions.drain(..) {
            session.close();
        }
    }
}
