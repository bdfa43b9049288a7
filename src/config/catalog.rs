use super::{ArchiveConfig, ConfigOptions};
use crate::core::Result;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Registry of every archive configuration in the application.
///
/// Append-only: configurations are looked up by source table name in
/// registration order and the first match wins. Owned by the application
/// and passed by reference; `reset` exists for test isolation.
///
/// The catalog also carries the default configuration that bindings merge
/// their per-entity options onto. The defaults are not part of the lookup list.
#[derive(Debug)]
pub struct Catalog {
    configs: RwLock<Vec<Arc<ArchiveConfig>>>,
    defaults: RwLock<ArchiveConfig>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::with_defaults(ArchiveConfig::new())
    }

    pub fn with_defaults(defaults: ArchiveConfig) -> Self {
        Self {
            configs: RwLock::new(Vec::new()),
            defaults: RwLock::new(defaults),
        }
    }

    /// Appends a configuration and hands back the shared handle.
    pub fn register(&self, config: ArchiveConfig) -> Result<Arc<ArchiveConfig>> {
        let config = Arc::new(config);
        let mut configs = self.configs.write()?;
        configs.push(config.clone());
        debug!(
            source_table = config.source_table_name().unwrap_or("<none>"),
            registered = configs.len(),
            "archive config registered"
        );
        Ok(config)
    }

    /// Builds a configuration from `options` over the built-in defaults and registers it.
    pub fn create(&self, options: &ConfigOptions) -> Result<Arc<ArchiveConfig>> {
        self.register(ArchiveConfig::from_options(options))
    }

    /// First registered configuration whose source type lives in `table_name`.
    pub fn find_by_table(&self, table_name: &str) -> Result<Option<Arc<ArchiveConfig>>> {
        let matches = self.find_all(table_name)?;
        if matches.len() > 1 {
            warn!(
                table = table_name,
                candidates = matches.len(),
                "ambiguous archive config, using the first registered"
            );
        }
        Ok(matches.into_iter().next())
    }

    /// Every registered configuration for `table_name`, in registration order.
    pub fn find_all(&self, table_name: &str) -> Result<Vec<Arc<ArchiveConfig>>> {
        let configs = self.configs.read()?;
        Ok(configs
            .iter()
            .filter(|config| config.source_table_name() == Some(table_name))
            .cloned()
            .collect())
    }

    pub fn is_ambiguous(&self, table_name: &str) -> Result<bool> {
        Ok(self.find_all(table_name)?.len() > 1)
    }

    pub fn configs(&self) -> Result<Vec<Arc<ArchiveConfig>>> {
        Ok(self.configs.read()?.clone())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.configs.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Forgets every registered configuration. Defaults are kept.
    pub fn reset(&self) -> Result<()> {
        self.configs.write()?.clear();
        Ok(())
    }

    /// Snapshot of the default configuration.
    pub fn defaults(&self) -> Result<ArchiveConfig> {
        Ok(self.defaults.read()?.clone())
    }

    /// Adjusts the defaults used by configurations created afterwards.
    pub fn configure<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut ArchiveConfig),
    {
        let mut defaults = self.defaults.write()?;
        f(&mut defaults);
        Ok(())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
