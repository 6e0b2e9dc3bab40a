use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_SENSITIVITY: f64 = 0.5;
const DEFAULT_TEMPORAL_WINDOW_SECS: f64 = 2.0;
const DEFAULT_MOVEMENT_THRESHOLD_PX: f64 = 5.0;
const DEFAULT_SCOOPER_PROXIMITY_PX: f64 = 60.0;
const DEFAULT_EXTENDED_CONTACT_SECS: f64 = 8.0;
const DEFAULT_CROSS_CONTAMINATION_GRACE_SECS: f64 = 5.0;
const DEFAULT_ZONE_HISTORY_RETENTION_SECS: f64 = 10.0;
const DEFAULT_IDLE_EXPIRY_SECS: f64 = 5.0;
const DEFAULT_CLOSE_RADIUS_PX: f64 = 10.0;
const DEFAULT_SELECT_RADIUS_PX: f64 = 8.0;
const DEFAULT_EDGE_RADIUS_PX: f64 = 6.0;
const DEFAULT_MIN_POINT_SEPARATION_PX: f64 = crate::geometry::DEFAULT_MIN_POINT_SEPARATION;
const DEFAULT_EDIT_HISTORY_CAPACITY: usize = 100;
const DEFAULT_VIOLATION_HISTORY_CAPACITY: usize = 1000;

// -------------------- File layer --------------------

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct EngineConfigFile {
    analyzer: Option<AnalyzerConfigFile>,
    editor: Option<EditorConfigFile>,
    violation_history_capacity: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct AnalyzerConfigFile {
    sensitivity: Option<f64>,
    temporal_window: Option<f64>,
    movement_threshold: Option<f64>,
    movement: Option<MovementThresholdsFile>,
    scooper_proximity_threshold: Option<f64>,
    extended_contact_threshold: Option<f64>,
    cross_contamination_grace_period: Option<f64>,
    zone_history_retention: Option<f64>,
    idle_expiry: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct MovementThresholdsFile {
    grab_avg_max: Option<f64>,
    grab_step_max: Option<f64>,
    clean_avg_min: Option<f64>,
    clean_step_min: Option<f64>,
    reach_avg_min: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GridSnapFile {
    Px(f64),
    Keyword(String),
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct EditorConfigFile {
    grid_snap_size: Option<GridSnapFile>,
    close_radius: Option<f64>,
    select_radius: Option<f64>,
    edge_radius: Option<f64>,
    min_point_separation: Option<f64>,
    history_capacity: Option<usize>,
}

// -------------------- Resolved configuration --------------------

/// Pixel thresholds separating grab / clean / reach motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementThresholds {
    /// Grabbing: average step below this...
    pub grab_avg_max: f64,
    /// ...and largest step below this.
    pub grab_step_max: f64,
    /// Cleaning: average step above this...
    pub clean_avg_min: f64,
    /// ...and largest step above this.
    pub clean_step_min: f64,
    /// Reaching: average step above this.
    pub reach_avg_min: f64,
}

impl MovementThresholds {
    /// Derive all thresholds from one base distance.
    pub fn from_base(base_px: f64) -> Self {
        Self {
            grab_avg_max: base_px,
            grab_step_max: base_px * 3.0,
            clean_avg_min: base_px * 2.0,
            clean_step_min: base_px * 6.0,
            reach_avg_min: base_px * 1.6,
        }
    }
}

impl Default for MovementThresholds {
    fn default() -> Self {
        Self::from_base(DEFAULT_MOVEMENT_THRESHOLD_PX)
    }
}

/// Analyzer tunables. Durations are seconds on the stream clock.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Detections below this confidence are ignored.
    pub sensitivity: f64,
    /// Seconds of position history kept per hand.
    pub temporal_window: f64,
    pub movement: MovementThresholds,
    pub scooper_proximity_px: f64,
    pub extended_contact_secs: f64,
    pub cross_contamination_grace_secs: f64,
    /// Seconds of zone-visit history kept per hand.
    pub zone_history_retention: f64,
    /// Hands unseen for longer than this are forgotten.
    pub idle_expiry: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            temporal_window: DEFAULT_TEMPORAL_WINDOW_SECS,
            movement: MovementThresholds::default(),
            scooper_proximity_px: DEFAULT_SCOOPER_PROXIMITY_PX,
            extended_contact_secs: DEFAULT_EXTENDED_CONTACT_SECS,
            cross_contamination_grace_secs: DEFAULT_CROSS_CONTAMINATION_GRACE_SECS,
            zone_history_retention: DEFAULT_ZONE_HISTORY_RETENTION_SECS,
            idle_expiry: DEFAULT_IDLE_EXPIRY_SECS,
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.sensitivity) {
            return Err(anyhow!("sensitivity must be within [0, 1]"));
        }
        for (name, value) in [
            ("temporal window", self.temporal_window),
            ("scooper proximity threshold", self.scooper_proximity_px),
            ("extended contact threshold", self.extended_contact_secs),
            ("cross-contamination grace period", self.cross_contamination_grace_secs),
            ("zone history retention", self.zone_history_retention),
            ("idle expiry", self.idle_expiry),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(anyhow!("{} must be greater than zero", name));
            }
        }
        if self.zone_history_retention < self.cross_contamination_grace_secs {
            return Err(anyhow!(
                "zone history retention ({}s) must cover the cross-contamination grace period ({}s)",
                self.zone_history_retention,
                self.cross_contamination_grace_secs
            ));
        }
        let m = &self.movement;
        if m.grab_avg_max >= m.clean_avg_min || m.grab_step_max >= m.clean_step_min {
            return Err(anyhow!("grab thresholds must be below clean thresholds"));
        }
        if m.reach_avg_min <= 0.0 {
            return Err(anyhow!("reach threshold must be greater than zero"));
        }
        Ok(())
    }
}

/// Zone editor tunables. Radii are display-space pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorConfig {
    pub grid_snap_px: Option<f64>,
    /// Click this close to the first vertex to close a polygon.
    pub close_radius: f64,
    /// Click this close to a vertex to select it.
    pub select_radius: f64,
    /// Click this close to an edge to insert a vertex.
    pub edge_radius: f64,
    /// Natural-space minimum distance between vertices.
    pub min_point_separation: f64,
    pub history_capacity: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_snap_px: None,
            close_radius: DEFAULT_CLOSE_RADIUS_PX,
            select_radius: DEFAULT_SELECT_RADIUS_PX,
            edge_radius: DEFAULT_EDGE_RADIUS_PX,
            min_point_separation: DEFAULT_MIN_POINT_SEPARATION_PX,
            history_capacity: DEFAULT_EDIT_HISTORY_CAPACITY,
        }
    }
}

impl EditorConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(grid) = self.grid_snap_px {
            if !(grid.is_finite() && grid > 0.0) {
                return Err(anyhow!("grid snap size must be greater than zero"));
            }
        }
        for (name, value) in [
            ("close radius", self.close_radius),
            ("select radius", self.select_radius),
            ("edge radius", self.edge_radius),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(anyhow!("{} must be greater than zero", name));
            }
        }
        if !(self.min_point_separation.is_finite() && self.min_point_separation >= 0.0) {
            return Err(anyhow!("minimum point separation must not be negative"));
        }
        if self.history_capacity == 0 {
            return Err(anyhow!("edit history capacity must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub analyzer: AnalyzerConfig,
    pub editor: EditorConfig,
    pub violation_history_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            analyzer: AnalyzerConfig::default(),
            editor: EditorConfig::default(),
            violation_history_capacity: DEFAULT_VIOLATION_HISTORY_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Defaults, then the file named by `HYGIENE_CONFIG`, then `HYGIENE_*`
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("HYGIENE_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => read_config_file(Path::new(path))?,
            _ => EngineConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults overlaid with one config file; no environment lookups.
    pub fn from_path(path: &Path) -> Result<Self> {
        let cfg = Self::from_file(read_config_file(path)?)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: EngineConfigFile) -> Result<Self> {
        let defaults = Self::default();
        let analyzer_file = file.analyzer.unwrap_or_default();
        let editor_file = file.editor.unwrap_or_default();

        let base = analyzer_file
            .movement_threshold
            .map(MovementThresholds::from_base)
            .unwrap_or(defaults.analyzer.movement);
        let overrides = analyzer_file.movement.unwrap_or_default();
        let movement = MovementThresholds {
            grab_avg_max: overrides.grab_avg_max.unwrap_or(base.grab_avg_max),
            grab_step_max: overrides.grab_step_max.unwrap_or(base.grab_step_max),
            clean_avg_min: overrides.clean_avg_min.unwrap_or(base.clean_avg_min),
            clean_step_min: overrides.clean_step_min.unwrap_or(base.clean_step_min),
            reach_avg_min: overrides.reach_avg_min.unwrap_or(base.reach_avg_min),
        };

        let analyzer = AnalyzerConfig {
            sensitivity: analyzer_file
                .sensitivity
                .unwrap_or(defaults.analyzer.sensitivity),
            temporal_window: analyzer_file
                .temporal_window
                .unwrap_or(defaults.analyzer.temporal_window),
            movement,
            scooper_proximity_px: analyzer_file
                .scooper_proximity_threshold
                .unwrap_or(defaults.analyzer.scooper_proximity_px),
            extended_contact_secs: analyzer_file
                .extended_contact_threshold
                .unwrap_or(defaults.analyzer.extended_contact_secs),
            cross_contamination_grace_secs: analyzer_file
                .cross_contamination_grace_period
                .unwrap_or(defaults.analyzer.cross_contamination_grace_secs),
            zone_history_retention: analyzer_file
                .zone_history_retention
                .unwrap_or(defaults.analyzer.zone_history_retention),
            idle_expiry: analyzer_file
                .idle_expiry
                .unwrap_or(defaults.analyzer.idle_expiry),
        };

        let grid_snap_px = match editor_file.grid_snap_size {
            None => defaults.editor.grid_snap_px,
            Some(GridSnapFile::Px(px)) => Some(px),
            Some(GridSnapFile::Keyword(word)) => parse_grid_snap(&word)?,
        };
        let editor = EditorConfig {
            grid_snap_px,
            close_radius: editor_file
                .close_radius
                .unwrap_or(defaults.editor.close_radius),
            select_radius: editor_file
                .select_radius
                .unwrap_or(defaults.editor.select_radius),
            edge_radius: editor_file
                .edge_radius
                .unwrap_or(defaults.editor.edge_radius),
            min_point_separation: editor_file
                .min_point_separation
                .unwrap_or(defaults.editor.min_point_separation),
            history_capacity: editor_file
                .history_capacity
                .unwrap_or(defaults.editor.history_capacity),
        };

        Ok(Self {
            analyzer,
            editor,
            violation_history_capacity: file
                .violation_history_capacity
                .unwrap_or(defaults.violation_history_capacity),
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = env_f64("HYGIENE_SENSITIVITY")? {
            self.analyzer.sensitivity = v;
        }
        if let Some(v) = env_f64("HYGIENE_TEMPORAL_WINDOW_SECS")? {
            self.analyzer.temporal_window = v;
        }
        if let Some(v) = env_f64("HYGIENE_MOVEMENT_THRESHOLD_PX")? {
            self.analyzer.movement = MovementThresholds::from_base(v);
        }
        if let Some(v) = env_f64("HYGIENE_SCOOPER_PROXIMITY_PX")? {
            self.analyzer.scooper_proximity_px = v;
        }
        if let Some(v) = env_f64("HYGIENE_EXTENDED_CONTACT_SECS")? {
            self.analyzer.extended_contact_secs = v;
        }
        if let Some(v) = env_f64("HYGIENE_GRACE_PERIOD_SECS")? {
            self.analyzer.cross_contamination_grace_secs = v;
        }
        if let Ok(grid) = std::env::var("HYGIENE_GRID_SNAP_PX") {
            if !grid.trim().is_empty() {
                self.editor.grid_snap_px = parse_grid_snap(&grid)?;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.analyzer.validate()?;
        self.editor.validate()?;
        if self.violation_history_capacity == 0 {
            return Err(anyhow!("violation history capacity must be at least 1"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<EngineConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_f64(key: &str) -> Result<Option<f64>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => {
            let parsed: f64 = value
                .trim()
                .parse()
                .map_err(|_| anyhow!("{} must be a number", key))?;
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

fn parse_grid_snap(value: &str) -> Result<Option<f64>> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("off") || value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    let px: f64 = value
        .parse()
        .map_err(|_| anyhow!("grid snap size must be a number of pixels or \"off\""))?;
    Ok(Some(px))
}
