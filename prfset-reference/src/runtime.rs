//! In-process [`LanguageRuntime`] over a set of [`ReferenceServer`]s.

use std::collections::BTreeMap;
use std::sync::Arc;

use prfset_core::errors::HarnessError;
use prfset_core::proxy::{LanguageRuntime, PrfSetChannel};
use prfset_core::template::Language;

use crate::server::ReferenceServer;

/// One server per language, started and stopped together.
#[derive(Debug, Default)]
pub struct InProcessRuntime {
    servers: BTreeMap<Language, Arc<ReferenceServer>>,
}

impl InProcessRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Honest servers for every language in `languages`.
    pub fn honest<I, L>(languages: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Language>,
    {
        languages
            .into_iter()
            .map(ReferenceServer::new)
            .fold(Self::new(), Self::with_server)
    }

    /// Add `server`, replacing any server already registered for its
    /// language.
    pub fn with_server(mut self, server: ReferenceServer) -> Self {
        self.servers
            .insert(server.language().clone(), Arc::new(server));
        self
    }

    pub fn server(&self, language: &Language) -> Option<&Arc<ReferenceServer>> {
        self.servers.get(language)
    }

    pub fn languages(&self) -> impl Iterator<Item = &Language> + '_ {
        self.servers.keys()
    }
}

impl LanguageRuntime for InProcessRuntime {
    fn start_all(&self) -> Result<(), HarnessError> {
        for server in self.servers.values() {
            server.start();
        }
        tracing::info!(servers = self.servers.len(), "reference servers started");
        Ok(())
    }

    fn stop_all(&self) -> Result<(), HarnessError> {
        for server in self.servers.values() {
            server.stop();
        }
        tracing::info!(servers = self.servers.len(), "reference servers stopped");
        Ok(())
    }

    fn client(&self, language: &Language) -> Option<Arc<dyn PrfSetChannel>> {
        self.servers
            .get(language)
            .map(|server| Arc::clone(server) as Arc<dyn PrfSetChannel>)
    }
}
