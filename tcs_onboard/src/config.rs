//! Config-directory loading for one on-board unit.
//!
//! A config directory holds `tcs.toml` and, when `[tvm] decoding_table`
//! names one, the TVM decoding table. Loading validates every section and
//! resolves the decoding table once; the result is immutable.

use std::path::Path;

use tcs_common::config::{ConfigError, ConfigLoader};
use tcs_common::tcs::config::TcsConfig;
use tcs_common::tcs::state::TvmKind;

use crate::safety::tvm::table::TvmTable;

/// Parameter file name inside a config directory.
pub const TCS_CONFIG_FILE: &str = "tcs.toml";

/// Validated configuration ready to build an [`crate::cycle::OnboardTcs`].
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub tcs: TcsConfig,
    pub tvm_table: TvmTable,
}

impl LoadedConfig {
    /// Defaults with the built-in table for the default TVM kind.
    pub fn with_defaults() -> Self {
        let tcs = TcsConfig::default();
        let tvm_table = TvmTable::builtin(tcs.general.tvm);
        Self { tcs, tvm_table }
    }

    /// Validate `tcs` and pair it with the built-in TVM table.
    ///
    /// Every timer and odometer of the supervisor is sized from these
    /// values, so an out-of-range delay is rejected here rather than
    /// leaving a primitive unconfigured.
    pub fn from_config(tcs: TcsConfig) -> Result<Self, ConfigError> {
        tcs.validate()?;
        let tvm_table = TvmTable::builtin(tcs.general.tvm);
        Ok(Self { tcs, tvm_table })
    }
}

// ─── Loading Functions ──────────────────────────────────────────────

/// Load and validate `dir/tcs.toml` and its TVM decoding table.
///
/// A decoding table that is configured but missing is fatal
/// ([`ConfigError::TableNotFound`]).
pub fn load_config(dir: &Path) -> Result<LoadedConfig, ConfigError> {
    let tcs = TcsConfig::load(&dir.join(TCS_CONFIG_FILE))?;
    tcs.validate()?;

    let tvm_table = match tcs.tvm.decoding_table.as_deref() {
        Some(file) => {
            let path = dir.join(file);
            let content = std::fs::read_to_string(&path).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConfigError::TableNotFound(path.clone())
                } else {
                    ConfigError::ParseError(format!("{}: {e}", path.display()))
                }
            })?;
            let table = TvmTable::from_toml(&content)?;
            tracing::info!(path = %path.display(), entries = table.len(), "TVM decoding table loaded");
            table
        }
        None => TvmTable::builtin(tcs.general.tvm),
    };
    warn_unused_table(&tcs, &tvm_table);

    Ok(LoadedConfig { tcs, tvm_table })
}

/// Load from in-memory TOML (tests). `table_toml` replaces the built-in
/// decoding table when given.
pub fn load_config_from_str(
    tcs_toml: &str,
    table_toml: Option<&str>,
) -> Result<LoadedConfig, ConfigError> {
    let tcs = TcsConfig::from_toml(tcs_toml)?;
    tcs.validate()?;
    let tvm_table = match table_toml {
        Some(content) => TvmTable::from_toml(content)?,
        None => TvmTable::builtin(tcs.general.tvm),
    };
    Ok(LoadedConfig { tcs, tvm_table })
}

fn warn_unused_table(tcs: &TcsConfig, table: &TvmTable) {
    if tcs.general.tvm == TvmKind::None && !table.is_empty() {
        tracing::warn!("TVM decoding table configured on a unit without TVM");
    }
}
