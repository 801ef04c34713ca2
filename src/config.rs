use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::catalog::{DEFAULT_EXTENSIONS, ScanOptions};
use crate::geometry::Geometry;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeleteMode {
    /// Move to the desktop trash.
    #[default]
    Trash,
    /// Remove permanently.
    Remove,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Time each slide stays up when `--delay` is not given.
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
    /// Floor applied to the delay, both at startup and when adjusting.
    #[serde(with = "humantime_serde")]
    pub min_delay: Duration,
    /// Amount the speed keys add to or remove from the delay.
    #[serde(with = "humantime_serde")]
    pub delay_step: Duration,
    /// Window geometry used when not fullscreen.
    pub geometry: Geometry,
    /// Quiet period after the last resize before re-rendering.
    #[serde(with = "humantime_serde")]
    pub resize_debounce: Duration,
    /// Quiet period after the last file-system change before reloading.
    #[serde(with = "humantime_serde")]
    pub rescan_debounce: Duration,
    /// Shortest delay honoured between animation frames.
    #[serde(with = "humantime_serde")]
    pub min_frame_delay: Duration,
    /// Allowed image extensions.
    pub extensions: Vec<String>,
    pub delete_mode: DeleteMode,
    /// Append-only log of deleted basenames; `null` disables it.
    pub deletion_log: Option<PathBuf>,
    /// Watch the roots and reload when images change.
    pub watch: bool,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(mut self) -> Result<Self> {
        ensure!(
            self.min_delay > Duration::ZERO,
            "min-delay must be greater than zero"
        );
        ensure!(
            self.delay_step > Duration::ZERO,
            "delay-step must be greater than zero"
        );
        self.extensions = self
            .extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        ensure!(
            !self.extensions.is_empty(),
            "extensions must list at least one file type"
        );
        self.delay = self.delay.max(self.min_delay);
        Ok(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(10),
            min_delay: Duration::from_secs(1),
            delay_step: Duration::from_secs(1),
            geometry: Geometry::default(),
            resize_debounce: Duration::from_millis(150),
            rescan_debounce: Duration::from_millis(500),
            min_frame_delay: Duration::from_millis(20),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_owned()).collect(),
            delete_mode: DeleteMode::default(),
            deletion_log: Some(PathBuf::from("deleted.txt")),
            watch: false,
        }
    }
}

/// Values gathered from the command line.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub paths: Vec<PathBuf>,
    pub regex: Option<String>,
    pub recurse: bool,
    pub random: bool,
    pub fullscreen: bool,
    pub zoomed: bool,
    pub auto: bool,
    /// Seconds between slides; fractional values allowed.
    pub delay_secs: Option<f64>,
    pub geometry: Option<String>,
    pub watch: bool,
}

/// Everything the session needs, after merging the file and the CLI.
#[derive(Debug, Clone)]
pub struct Settings {
    pub scan: ScanOptions,
    pub shuffled: bool,
    pub paused: bool,
    pub fullscreen: bool,
    pub zoomed: bool,
    pub delay: Duration,
    pub min_delay: Duration,
    pub delay_step: Duration,
    pub geometry: Geometry,
    pub resize_debounce: Duration,
    pub rescan_debounce: Duration,
    pub min_frame_delay: Duration,
    pub delete_mode: DeleteMode,
    pub deletion_log: Option<PathBuf>,
    pub watch: bool,
}

impl Settings {
    /// Merge launch options over a validated configuration.
    pub fn resolve(cfg: Configuration, launch: LaunchOptions) -> Result<Self> {
        let roots = if launch.paths.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            launch.paths
        };
        let scan = ScanOptions::new(roots)
            .recursive(launch.recurse)
            .with_extensions(cfg.extensions.clone())
            .with_pattern(launch.regex.as_deref().unwrap_or(""))
            .context("compiling --regex filter")?;

        let delay = match launch.delay_secs {
            Some(secs) => {
                ensure!(
                    secs.is_finite() && secs >= 0.0,
                    "delay must be a non-negative number of seconds"
                );
                Duration::from_secs_f64(secs)
            }
            None => cfg.delay,
        }
        .max(cfg.min_delay);

        let geometry = match launch.geometry.as_deref() {
            Some(raw) => Geometry::parse_or_default(Some(raw)),
            None => cfg.geometry,
        };

        Ok(Self {
            scan,
            shuffled: launch.random,
            paused: !launch.auto,
            fullscreen: launch.fullscreen,
            zoomed: launch.zoomed,
            delay,
            min_delay: cfg.min_delay,
            delay_step: cfg.delay_step,
            geometry,
            resize_debounce: cfg.resize_debounce,
            rescan_debounce: cfg.rescan_debounce,
            min_frame_delay: cfg.min_frame_delay,
            delete_mode: cfg.delete_mode,
            deletion_log: cfg.deletion_log,
            watch: launch.watch || cfg.watch,
        })
    }

    /// Defaults for `roots`, as if launched with no flags.
    pub fn for_roots(roots: Vec<PathBuf>) -> Result<Self> {
        Self::resolve(
            Configuration::default(),
            LaunchOptions {
                paths: roots,
                ..LaunchOptions::default()
            },
        )
    }
}
