use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error};

use crate::error::RegistryError;
use crate::executor::{Executor, ExecutorProvider};
use crate::features::FeaturesInfo;

static GLOBAL: Lazy<ExecutorRegistry> = Lazy::new(ExecutorRegistry::new);

/// Catalog of executor providers keyed by a unique name.
///
/// Entries are only ever inserted, never replaced or removed. Writers take the
/// single lock exclusively; lookups share it.
#[derive(Default)]
pub struct ExecutorRegistry {
    providers: RwLock<HashMap<String, Arc<dyn ExecutorProvider>>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry backends register into at startup
    pub fn global() -> &'static ExecutorRegistry {
        &GLOBAL
    }

    // The map is insert-only, so a writer that panicked cannot leave it half-updated.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<dyn ExecutorProvider>>> {
        self.providers.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<dyn ExecutorProvider>>> {
        self.providers.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register<P>(&self, name: &str, provider: P) -> Result<(), RegistryError>
    where
        P: ExecutorProvider + 'static,
    {
        self.register_arc(name, Arc::new(provider))
    }

    pub fn register_arc(
        &self,
        name: &str,
        provider: Arc<dyn ExecutorProvider>,
    ) -> Result<(), RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        debug!(executor = name, "Registering executor");

        let mut providers = self.write();
        if providers.contains_key(name) {
            return Err(RegistryError::AlreadyRegistered(name.to_string()));
        }
        providers.insert(name.to_string(), provider);
        Ok(())
    }

    /// Register or abort the process. A duplicate name means two backends were
    /// linked under the same name, which no correct binary does.
    pub fn register_or_abort<P>(&self, name: &str, provider: P)
    where
        P: ExecutorProvider + 'static,
    {
        if let Err(e) = self.register(name, provider) {
            error!(executor = name, error = %e, "Executor registration failed");
            std::process::abort();
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn ExecutorProvider>> {
        let provider = self.read().get(name).cloned();
        if provider.is_none() {
            debug!(executor = name, "Executor not registered");
        }
        provider
    }

    pub fn features(&self, name: &str) -> Option<FeaturesInfo> {
        self.lookup(name).map(|p| p.features())
    }

    /// New executor instance from the named provider. The lock is released
    /// before the provider runs.
    pub fn create(&self, name: &str) -> Option<Box<dyn Executor>> {
        self.lookup(name).map(|p| p.create())
    }

    /// Snapshot of registered names, sorted for readable diagnostics
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Names whose provider passes its host self-check
    pub fn available(&self) -> Vec<String> {
        let providers: Vec<(String, Arc<dyn ExecutorProvider>)> = self
            .read()
            .iter()
            .map(|(name, p)| (name.clone(), p.clone()))
            .collect();
        let mut names: Vec<String> = providers
            .into_iter()
            .filter(|(_, p)| p.can_create())
            .map(|(name, _)| name)
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

pub fn register_executor<P>(name: &str, provider: P) -> Result<(), RegistryError>
where
    P: ExecutorProvider + 'static,
{
    ExecutorRegistry::global().register(name, provider)
}

pub fn get_executor_provider(name: &str) -> Option<Arc<dyn ExecutorProvider>> {
    ExecutorRegistry::global().lookup(name)
}

pub fn get_executor_features(name: &str) -> Option<FeaturesInfo> {
    ExecutorRegistry::global().features(name)
}

pub fn new_executor(name: &str) -> Option<Box<dyn Executor>> {
    ExecutorRegistry::global().create(name)
}

pub fn get_executors() -> Vec<String> {
    ExecutorRegistry::global().list_names()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{NoopProvider, ScriptedProvider};

    #[test]
    fn rejects_empty_name() {
        let registry = ExecutorRegistry::new();
        assert_eq!(registry.register("", NoopProvider::default()), Err(RegistryError::EmptyName));
        assert!(registry.is_empty());
    }

    #[test]
    fn duplicate_keeps_first_provider() {
        let registry = ExecutorRegistry::new();
        registry.register("docker", NoopProvider::with_features(FeaturesInfo::all())).unwrap();

        let err = registry.register("docker", NoopProvider::default()).unwrap_err();
        assert_eq!(err, RegistryError::AlreadyRegistered("docker".to_string()));
        assert_eq!(registry.features("docker"), Some(FeaturesInfo::all()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn available_skips_providers_failing_self_check() {
        let registry = ExecutorRegistry::new();
        registry.register("shell", NoopProvider::default()).unwrap();
        registry.register("parallels", ScriptedProvider::unavailable()).unwrap();

        assert_eq!(registry.list_names(), vec!["parallels", "shell"]);
        assert_eq!(registry.available(), vec!["shell"]);
    }

    #[test]
    fn global_free_functions_share_one_registry() {
        register_executor("registry-unit-global", NoopProvider::default()).unwrap();
        assert!(get_executor_provider("registry-unit-global").is_some());
        assert_eq!(get_executor_features("registry-unit-global"), Some(FeaturesInfo::default()));
        assert!(new_executor("registry-unit-global").is_some());
        assert!(get_executors().contains(&"registry-unit-global".to_string()));
        assert!(register_executor("registry-unit-global", NoopProvider::default()).is_err());
    }
}
