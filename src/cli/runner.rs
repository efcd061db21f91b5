//! CLI runner - executes the selected mode

use crate::catalog::{load_definitions, Catalog};
use crate::cli::commands::Cli;
use crate::config::TapConfig;
use crate::engine::SyncEngine;
use crate::error::{Error, Result};
use crate::output::JsonLinesSink;
use crate::state::StateManager;
use std::io::Write;
use std::sync::Arc;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run against stdout
    pub async fn run(&self) -> Result<()> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        self.run_to(&mut out).await
    }

    /// Run, writing the catalog or the message stream to `out`.
    ///
    /// The config is loaded and validated before anything else, so a bad
    /// config never reaches the network.
    pub async fn run_to<W: Write>(&self, out: &mut W) -> Result<()> {
        let required: Vec<&str> = self.cli.required.iter().map(String::as_str).collect();
        let config = TapConfig::from_file(&self.cli.config, &required)?;

        if self.cli.discover {
            self.discover(out)
        } else {
            self.sync(Arc::new(config), out).await
        }
    }

    /// Print the catalog for the stream definitions
    fn discover<W: Write>(&self, out: &mut W) -> Result<()> {
        let catalog = self.discovered_catalog()?;
        info!("Discovered {} streams", catalog.len());
        serde_json::to_writer_pretty(&mut *out, &catalog)?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }

    fn discovered_catalog(&self) -> Result<Catalog> {
        let path = self
            .cli
            .streams
            .as_ref()
            .ok_or_else(|| Error::config("Discovery needs stream definitions (--streams)"))?;
        Catalog::discover(&load_definitions(path)?)
    }

    /// Catalog file if given, otherwise the discovered catalog with its
    /// default selections applied
    fn catalog(&self) -> Result<Catalog> {
        match &self.cli.catalog {
            Some(path) => Catalog::from_file(path),
            None => {
                let mut catalog = self.discovered_catalog()?;
                catalog.select_defaults();
                Ok(catalog)
            }
        }
    }

    async fn sync<W: Write>(&self, config: Arc<TapConfig>, out: &mut W) -> Result<()> {
        let catalog = self.catalog()?;
        let mut state = match &self.cli.state {
            Some(path) => StateManager::from_file(path)?,
            None => StateManager::in_memory(),
        };

        let mut engine = SyncEngine::from_config(config, JsonLinesSink::new(out))?;
        let stats = engine.sync_catalog(&catalog, &mut state).await?;

        info!(
            "Synced {} records from {} streams ({} checkpoints)",
            stats.records_synced,
            stats.streams_synced,
            state.checkpoint_count()
        );
        Ok(())
    }
}
