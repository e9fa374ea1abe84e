//! Stat, placement and wave-set file loading.
//!
//! A config directory holds up to four kinds of JSON file:
//!
//! ```text
//! <base>/buildings.json
//! <base>/enemies.json
//! <base>/placement.json
//! <base>/wave_sets/<id>.json
//! ```
//!
//! The directory is never discovered implicitly. Callers pass an explicit
//! base path, or opt into an ancestor search from a start directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

use td_core::config::SimulationConfig;
use td_core::data::{BuildingStatsFile, EnemyStatsFile, PlacementConfig, WaveSet};
use td_core::error::SimError;
use td_core::providers::{BuildingCatalog, EnemyCatalog};
use td_core::simulation::SimulationRunner;

/// Environment variable the CLI reads for the config directory.
pub const CONFIG_DIR_ENV: &str = "TD_SIM_CONFIG_DIR";

/// Building stats file name.
pub const BUILDINGS_FILE: &str = "buildings.json";
/// Enemy stats file name.
pub const ENEMIES_FILE: &str = "enemies.json";
/// Placement strategy file name.
pub const PLACEMENT_FILE: &str = "placement.json";
/// Wave set subdirectory.
pub const WAVE_SETS_DIR: &str = "wave_sets";

/// Errors that can occur while loading config files.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    /// No candidate directory contained the file.
    #[error("Config file '{file}' not found (searched: {})", display_paths(.searched))]
    NotFound {
        /// File name looked for.
        file: String,
        /// Every path probed, in order.
        searched: Vec<PathBuf>,
    },
    /// Failed to read a file.
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Failed to parse JSON.
    #[error("Failed to parse '{path}': {source}")]
    Json {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// A wave set file whose `setName` is not its file name.
    #[error("Wave set '{path}' is named '{set_name}'; rename the file or set setName to '{expected}'")]
    WaveSetNameMismatch {
        /// File path.
        path: PathBuf,
        /// Name declared inside the file.
        set_name: String,
        /// Name implied by the file name.
        expected: String,
    },
    /// The file parsed but its contents are invalid.
    #[error(transparent)]
    Invalid(#[from] SimError),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Where config files are looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocator {
    candidates: Vec<PathBuf>,
}

impl ConfigLocator {
    /// Look only in `base`.
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            candidates: vec![base.into()],
        }
    }

    /// Look in `start`, then in up to `levels` of its parents.
    #[must_use]
    pub fn with_ancestor_search(start: impl AsRef<Path>, levels: usize) -> Self {
        let candidates = start
            .as_ref()
            .ancestors()
            .take(levels + 1)
            .map(Path::to_path_buf)
            .collect();
        Self { candidates }
    }

    /// Locator from [`CONFIG_DIR_ENV`], if set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        std::env::var_os(CONFIG_DIR_ENV).map(Self::new)
    }

    /// Directories probed, in order.
    #[must_use]
    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// First existing path for `relative`.
    pub fn locate(&self, relative: impl AsRef<Path>) -> Result<PathBuf, ConfigLoadError> {
        let relative = relative.as_ref();
        let searched: Vec<PathBuf> = self.candidates.iter().map(|c| c.join(relative)).collect();
        match searched.iter().find(|p| p.is_file()) {
            Some(found) => {
                debug!(path = %found.display(), "Located config file");
                Ok(found.clone())
            }
            None => Err(ConfigLoadError::NotFound {
                file: relative.display().to_string(),
                searched,
            }),
        }
    }

    /// First candidate containing a `wave_sets` directory.
    fn wave_sets_dir(&self) -> Option<PathBuf> {
        self.candidates
            .iter()
            .map(|c| c.join(WAVE_SETS_DIR))
            .find(|p| p.is_dir())
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigLoadError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigLoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and validate `buildings.json`.
pub fn load_building_catalog(locator: &ConfigLocator) -> Result<BuildingCatalog, ConfigLoadError> {
    let path = locator.locate(BUILDINGS_FILE)?;
    let file: BuildingStatsFile = read_json(&path)?;
    let catalog = BuildingCatalog::from_file(file)?;
    info!(path = %path.display(), buildings = catalog.len(), "Loaded building stats");
    Ok(catalog)
}

/// Load and validate `enemies.json`.
pub fn load_enemy_catalog(locator: &ConfigLocator) -> Result<EnemyCatalog, ConfigLoadError> {
    let path = locator.locate(ENEMIES_FILE)?;
    let file: EnemyStatsFile = read_json(&path)?;
    let catalog = EnemyCatalog::from_file(file)?;
    info!(path = %path.display(), enemies = catalog.keys().count(), "Loaded enemy stats");
    Ok(catalog)
}

/// Load `placement.json`.
pub fn load_placement_config(locator: &ConfigLocator) -> Result<PlacementConfig, ConfigLoadError> {
    let path = locator.locate(PLACEMENT_FILE)?;
    let config: PlacementConfig = read_json(&path)?;
    config.validate()?;
    info!(
        path = %path.display(),
        initial_towers = config.strategies.initial_wave.positions.len(),
        upgrades = config.strategies.wave_upgrades.len(),
        "Loaded placement strategy"
    );
    Ok(config)
}

/// Load and validate `wave_sets/<id>.json`.
///
/// The set's `setName` must equal `id`, since configs select wave sets by
/// that name.
pub fn load_wave_set(locator: &ConfigLocator, id: &str) -> Result<WaveSet, ConfigLoadError> {
    let path = locator.locate(Path::new(WAVE_SETS_DIR).join(format!("{id}.json")))?;
    let set: WaveSet = read_json(&path)?;
    set.validate()?;
    if set.set_name != id {
        return Err(ConfigLoadError::WaveSetNameMismatch {
            path,
            set_name: set.set_name,
            expected: id.to_string(),
        });
    }
    Ok(set)
}

/// Everything a run needs besides its [`SimulationConfig`].
#[derive(Debug, Clone)]
pub struct SimulationData {
    /// Tower stats.
    pub buildings: BuildingCatalog,
    /// Enemy stats and wave scaling.
    pub enemies: EnemyCatalog,
    /// Tower placement rules.
    pub placement: PlacementConfig,
    /// Authored wave sets keyed by set name (equal to the file name).
    pub wave_sets: BTreeMap<String, WaveSet>,
}

impl SimulationData {
    /// Built-in catalogs and placement, no wave sets.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            buildings: BuildingCatalog::builtin(),
            enemies: EnemyCatalog::builtin(),
            placement: PlacementConfig::default(),
            wave_sets: BTreeMap::new(),
        }
    }

    /// Load all files from `locator`.
    ///
    /// The three stat files are required. Every `*.json` in the first
    /// `wave_sets` directory found is loaded as a wave set.
    pub fn load(locator: &ConfigLocator) -> Result<Self, ConfigLoadError> {
        let mut data = Self {
            buildings: load_building_catalog(locator)?,
            enemies: load_enemy_catalog(locator)?,
            placement: load_placement_config(locator)?,
            wave_sets: BTreeMap::new(),
        };

        if let Some(dir) = locator.wave_sets_dir() {
            let entries = fs::read_dir(&dir).map_err(|source| ConfigLoadError::Io {
                path: dir.clone(),
                source,
            })?;
            let mut ids: Vec<String> = entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
                .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .collect();
            ids.sort();
            for id in ids {
                let set = load_wave_set(locator, &id)?;
                data.wave_sets.insert(id, set);
            }
        }

        info!(wave_sets = data.wave_sets.len(), "Simulation data loaded");
        Ok(data)
    }

    /// Load from `locator` when given, otherwise use the built-in data.
    pub fn load_or_builtin(locator: Option<&ConfigLocator>) -> Result<Self, ConfigLoadError> {
        locator.map_or_else(|| Ok(Self::builtin()), Self::load)
    }

    /// Add or replace a wave set.
    #[must_use]
    pub fn with_wave_set(mut self, set: WaveSet) -> Self {
        self.wave_sets.insert(set.set_name.clone(), set);
        self
    }

    /// Build a runner for `config`, registering the wave set it names.
    ///
    /// A wave set that is named but not loaded is left unregistered, so the
    /// run itself reports it as unknown.
    pub fn runner(&self, config: SimulationConfig) -> Result<SimulationRunner, SimError> {
        let wave_set = config
            .wave_set
            .as_ref()
            .and_then(|id| self.wave_sets.get(id))
            .cloned();
        let runner = SimulationRunner::new(
            config,
            self.buildings.clone(),
            self.enemies.clone(),
            self.placement.clone(),
        )?;
        match wave_set {
            Some(set) => runner.with_wave_set(set),
            None => Ok(runner),
        }
    }
}

impl Default for SimulationData {
    fn default() -> Self {
        Self::builtin()
    }
}
