//! The Plugin Lifecycle Manager (§4.4): loads third-party command bundles at
//! runtime, tracks their ownership of registered commands, and unloads them
//! cleanly on request.
//!
//! `load` and `unload` both run to completion under a single lock, so a
//! plugin is only ever observed absent or active — never mid-load or
//! mid-unload. A failed load leaves the registry exactly as it was before
//! the attempt, and the plugin is dropped rather than retained.

pub mod loader;

pub use loader::{PluginArtifact, PluginLoader};

use crate::error::{CliError, Result};
use crate::registry::CommandRegistry;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Identity and dependency declaration for a [`Plugin`].
#[derive(Debug, Clone)]
pub struct PluginMetadata {
    /// Unique name among currently-active plugins.
    pub name: String,
    pub version: String,
    pub description: String,
    /// Names of other plugins that must already be active.
    pub dependencies: Vec<String>,
}

impl PluginMetadata {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self { name: name.into(), version: version.into(), description: String::new(), dependencies: Vec::new() }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }
}

/// The host–plugin boundary (§6): `init` may register commands against the
/// handed-in registry; `unload` runs once, before the manager removes them.
pub trait Plugin: Send + Sync {
    fn metadata(&self) -> PluginMetadata;

    /// Called exactly once per load. Errors abort the load and roll back any
    /// commands registered so far.
    fn init(&self, registry: &mut CommandRegistry) -> Result<()>;

    /// Called at most once per load, before the manager deregisters this
    /// plugin's commands.
    fn unload(&self, registry: &mut CommandRegistry) -> Result<()> {
        let _ = registry;
        Ok(())
    }
}

struct LoadedPlugin {
    plugin: Box<dyn Plugin>,
}

/// Owns the set of currently-loaded plugins and serialises mutation of
/// itself and the [`CommandRegistry`] behind a single lock (§5).
#[derive(Default)]
pub struct PluginManager {
    inner: Mutex<HashMap<String, LoadedPlugin>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }

    /// Load `plugin` against `registry`.
    ///
    /// On success the plugin becomes active. On `init` error, any
    /// commands it managed to register before failing are rolled back and
    /// the plugin is dropped.
    ///
    /// # Errors
    /// `DuplicatePlugin` if a plugin with this name is already active;
    /// `MissingDependency` if a declared dependency is not active.
    pub fn load(&self, plugin: Box<dyn Plugin>, registry: &mut CommandRegistry) -> Result<()> {
        let metadata = plugin.metadata();
        let mut guard = self.inner.lock();

        if guard.contains_key(&metadata.name) {
            return Err(CliError::DuplicatePlugin { name: metadata.name });
        }
        for dep in &metadata.dependencies {
            if !guard.contains_key(dep) {
                return Err(CliError::MissingDependency {
                    plugin: metadata.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }

        let before: Vec<String> = registry.commands().iter().map(|c| c.name.clone()).collect();
        match plugin.init(registry) {
            Ok(()) => {
                guard.insert(metadata.name.clone(), LoadedPlugin { plugin });
                Ok(())
            }
            Err(err) => {
                let after: Vec<String> = registry.commands().iter().map(|c| c.name.clone()).collect();
                for name in after.iter().filter(|n| !before.contains(n)) {
                    registry.remove(name);
                }
                Err(err)
            }
        }
    }

    /// Unload the active plugin named `name`: runs its `unload` hook, then
    /// removes every command it registered (by provenance).
    ///
    /// # Errors
    /// `UnknownPlugin` if no active plugin has this name.
    pub fn unload(&self, name: &str, registry: &mut CommandRegistry) -> Result<()> {
        let mut guard = self.inner.lock();
        let loaded = guard.remove(name).ok_or_else(|| CliError::UnknownPlugin { name: name.to_string() })?;
        let result = loaded.plugin.unload(registry);
        registry.remove_by_provenance(name);
        result
    }

    /// Names of currently-active plugins.
    pub fn list(&self) -> Vec<String> {
        self.inner.lock().keys().cloned().collect()
    }

    /// True if a plugin with this name is active.
    pub fn is_active(&self, name: &str) -> bool {
        self.inner.lock().contains_key(name)
    }
}

/// Convenience for plugins: stamp `provenance` onto a command before
/// registering it, so [`PluginManager::unload`] can find it again.
pub fn owned_by(mut cmd: crate::model::Command, plugin_name: &str) -> crate::model::Command {
    cmd.provenance = Some(plugin_name.to_string());
    cmd
}
