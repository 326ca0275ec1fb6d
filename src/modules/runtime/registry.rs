//! Environment → logical server → host registry

use sqlwrap_core::Settings;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

type HostTable = HashMap<String, HashMap<String, String>>;

/// Maps logical server names to physical hosts, per environment
///
/// Unknown names resolve to themselves and are remembered, so resolving the
/// same name twice always yields the same host. Shared between wrappers by
/// reference or through an `Arc`.
#[derive(Debug, Default)]
pub struct ServerRegistry {
    hosts: RwLock<HostTable>,
}

impl ServerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry seeded from the `environments` section of a config file
    pub fn from_settings(settings: &Settings) -> Self {
        let hosts = settings
            .environments
            .iter()
            .map(|(env, servers)| {
                let servers = servers
                    .iter()
                    .map(|(server, host)| (server.clone(), host.clone()))
                    .collect();
                (env.clone(), servers)
            })
            .collect();

        Self {
            hosts: RwLock::new(hosts),
        }
    }

    /// Resolve a logical server name, registering it as its own host if unknown
    pub fn resolve(&self, env: &str, server: &str) -> String {
        if let Some(host) = self.lookup(env, server) {
            return host;
        }

        let mut hosts = self.write();
        let host = hosts
            .entry(env.to_string())
            .or_default()
            .entry(server.to_string())
            .or_insert_with(|| {
                debug!(env, server, "registering unknown server as its own host");
                server.to_string()
            });
        host.clone()
    }

    /// Look up a host without registering anything
    pub fn lookup(&self, env: &str, server: &str) -> Option<String> {
        self.read()
            .get(env)
            .and_then(|servers| servers.get(server))
            .cloned()
    }

    /// Register or replace a mapping, returning the previous host
    pub fn insert(
        &self,
        env: impl Into<String>,
        server: impl Into<String>,
        host: impl Into<String>,
    ) -> Option<String> {
        self.write()
            .entry(env.into())
            .or_default()
            .insert(server.into(), host.into())
    }

    /// Known environment names, sorted
    pub fn environments(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered (environment, server) pairs
    pub fn len(&self) -> usize {
        self.read().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave the table half-written:
    // every mutation is a single map insert.
    fn read(&self) -> RwLockReadGuard<'_, HostTable> {
        self.hosts.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HostTable> {
        self.hosts.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_identity_fallback() {
        let registry = ServerRegistry::new();
        assert_eq!(registry.resolve("prd", "apollo"), "apollo");
        assert_eq!(registry.lookup("prd", "apollo").as_deref(), Some("apollo"));
        assert_eq!(registry.environments(), vec!["prd".to_string()]);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let settings = Settings::new().with_host("prd", "apollo", "apollo-prd.db.example.net");
        let registry = ServerRegistry::from_settings(&settings);

        let first = registry.resolve("prd", "apollo");
        let second = registry.resolve("prd", "apollo");
        assert_eq!(first, "apollo-prd.db.example.net");
        assert_eq!(first, second);

        let unknown = registry.resolve("prd", "eagle");
        assert_eq!(unknown, registry.resolve("prd", "eagle"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_environments_are_independent() {
        let registry = ServerRegistry::new();
        registry.insert("uat", "apollo", "apollo-uat");
        assert_eq!(registry.resolve("uat", "apollo"), "apollo-uat");
        assert_eq!(registry.resolve("prd", "apollo"), "apollo");
    }

    #[test]
    fn test_insert_replaces() {
        let registry = ServerRegistry::new();
        assert_eq!(registry.insert("dev", "pgdev", "10.0.0.1"), None);
        assert_eq!(
            registry.insert("dev", "pgdev", "10.0.0.2").as_deref(),
            Some("10.0.0.1")
        );
        assert_eq!(registry.resolve("dev", "pgdev"), "10.0.0.2");
    }

    #[test]
    fn test_shared_across_threads() {
        let registry = Arc::new(ServerRegistry::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.resolve("prd", "eagle"))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), "eagle");
        }
        assert_eq!(registry.len(), 1);
    }
}
