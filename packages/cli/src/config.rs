use clap::Args;
use folio_workspace::EngineConfig;
use std::path::Path;

pub use folio_workspace::DEFAULT_CONFIG_NAME;

/// Flags that override individual `folio.config.json` fields
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigOverrides {
    /// Quiet period before a scheduled save (ms)
    #[arg(long, global = true)]
    pub save_debounce_ms: Option<u64>,

    /// Quiet period before structural edits become one undo step (ms)
    #[arg(long, global = true)]
    pub history_debounce_ms: Option<u64>,

    /// Undo depth, 0 for unlimited
    #[arg(long, global = true)]
    pub max_history_levels: Option<usize>,
}

/// Load config from the store root and apply flag overrides
pub fn load(root: &Path, overrides: &ConfigOverrides) -> anyhow::Result<EngineConfig> {
    let mut config = EngineConfig::load(root)?;

    if let Some(ms) = overrides.save_debounce_ms {
        config.save_debounce_ms = ms;
    }
    if let Some(ms) = overrides.history_debounce_ms {
        config.history_debounce_ms = ms;
    }
    if let Some(levels) = overrides.max_history_levels {
        config.max_history_levels = levels;
    }

    Ok(config)
}
