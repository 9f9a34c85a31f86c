//! Resolves a plugin artifact on disk into a loaded [`super::Plugin`].
//!
//! An artifact is a native dynamic library exposing a single C-ABI entry
//! point:
//!
//! ```c
//! void* _stega_plugin_entry(void);
//! ```
//!
//! returning a heap-allocated, `Box`-owned `dyn Plugin` trait object pointer
//! (as produced by `Box::into_raw(Box::new(plugin) as Box<dyn Plugin>)` on
//! the plugin side). The loader takes ownership of that pointer and the
//! backing `Library`, keeping both alive for as long as the plugin is
//! referenced.

use super::Plugin;
use crate::error::{CliError, Result};
use libloading::{Library, Symbol};
use std::path::{Path, PathBuf};

const ENTRY_SYMBOL: &[u8] = b"_stega_plugin_entry";

/// A resolved, integrity-checked plugin artifact: the loaded library plus
/// the `Plugin` instance extracted from it.
///
/// The `Library` must outlive the `Plugin` trait object it produced, so it
/// is kept alongside it rather than dropped after extraction.
pub struct PluginArtifact {
    plugin: Box<dyn Plugin>,
    _library: Library,
}

impl std::fmt::Debug for PluginArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginArtifact").finish_non_exhaustive()
    }
}

impl PluginArtifact {
    /// Consume the artifact, handing ownership of the boxed plugin to the
    /// caller. The backing library is kept alive for the plugin's lifetime
    /// by leaking it — dynamic libraries are not meant to be unloaded from
    /// the process while any code from them may still run.
    pub fn into_plugin(self) -> Box<dyn Plugin> {
        std::mem::forget(self._library);
        self.plugin
    }
}

/// Loads plugin artifacts from disk, verifying an optional integrity digest
/// before linking.
pub struct PluginLoader;

impl PluginLoader {
    /// Load the dynamic library at `path`, verifying its blake3 digest
    /// against `expected_integrity` (lowercase hex) if given, then resolving
    /// and invoking the plugin entry point.
    ///
    /// # Safety contract
    /// This calls into the artifact's exported `_stega_plugin_entry` via
    /// `libloading`; the caller is trusting the artifact to uphold the ABI
    /// contract documented on [`PluginArtifact`].
    ///
    /// # Errors
    /// `IntegrityViolation` if a digest mismatch is detected; wraps any I/O
    /// or dynamic-loading failure as `InvalidDefinition`.
    pub fn load(path: impl AsRef<Path>, expected_integrity: Option<&str>) -> Result<PluginArtifact> {
        let path = path.as_ref();

        if let Some(expected) = expected_integrity {
            let actual = Self::digest(path)?;
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(CliError::IntegrityViolation { artifact: path.display().to_string() });
            }
        }

        let library = unsafe {
            Library::new(path).map_err(|e| CliError::InvalidDefinition {
                reason: format!("failed to load plugin artifact {}: {e}", path.display()),
            })?
        };

        let plugin = unsafe {
            let entry: Symbol<unsafe extern "C" fn() -> *mut dyn Plugin> =
                library.get(ENTRY_SYMBOL).map_err(|e| CliError::InvalidDefinition {
                    reason: format!(
                        "plugin artifact {} is missing entry point '{}': {e}",
                        path.display(),
                        String::from_utf8_lossy(ENTRY_SYMBOL)
                    ),
                })?;
            let raw = entry();
            if raw.is_null() {
                return Err(CliError::InvalidDefinition {
                    reason: format!("plugin artifact {} returned a null entry pointer", path.display()),
                });
            }
            Box::from_raw(raw)
        };

        Ok(PluginArtifact { plugin, _library: library })
    }

    /// Compute the lowercase-hex blake3 digest of the file at `path`.
    pub fn digest(path: &Path) -> Result<String> {
        let bytes = std::fs::read(path)?;
        Ok(hex::encode(blake3::hash(&bytes).as_bytes()))
    }
}

/// Candidate search locations for a plugin name, used by hosts that resolve
/// `plugin load --path <name>` against a conventional plugin directory
/// rather than an absolute path.
pub fn candidate_paths(plugin_dir: &Path, name: &str) -> Vec<PathBuf> {
    let extensions: &[&str] = if cfg!(target_os = "macos") {
        &["dylib"]
    } else if cfg!(target_os = "windows") {
        &["dll"]
    } else {
        &["so"]
    };
    extensions
        .iter()
        .map(|ext| plugin_dir.join(format!("lib{name}.{ext}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_for_same_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.bin");
        std::fs::write(&path, b"plugin bytes").unwrap();
        let first = PluginLoader::digest(&path).unwrap();
        let second = PluginLoader::digest(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn digest_changes_with_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.bin");
        std::fs::write(&path, b"version one").unwrap();
        let first = PluginLoader::digest(&path).unwrap();
        std::fs::write(&path, b"version two").unwrap();
        let second = PluginLoader::digest(&path).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn load_rejects_mismatched_integrity_before_linking() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-a-real-library.so");
        std::fs::write(&path, b"not actually a shared object").unwrap();
        let err = PluginLoader::load(&path, Some("0000000000000000000000000000000000000000000000000000000000000000"))
            .unwrap_err();
        assert!(matches!(err, CliError::IntegrityViolation { .. }));
    }

    #[test]
    fn candidate_paths_use_platform_extension() {
        let dir = PathBuf::from("/plugins");
        let paths = candidate_paths(&dir, "example");
        assert_eq!(paths.len(), 1);
        assert!(paths[0].to_string_lossy().starts_with("/plugins/libexample."));
    }
}
