//! Tunables for the numerical solvers.

#[cfg(feature = "serde")]
use std::path::Path;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors that can occur while loading or validating a [`SolverConfig`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file couldn't be read.
    #[cfg(feature = "serde")]
    #[error("failed to read solver config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration couldn't be parsed as TOML.
    #[cfg(feature = "serde")]
    #[error("failed to parse solver config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A field holds a value outside of its allowed range.
    #[error("`{field}` must be {requirement}, got {value}")]
    OutOfRange {
        /// The dotted path of the offending field.
        field: &'static str,
        /// A description of the allowed range.
        requirement: &'static str,
        /// The offending value.
        value: f64,
    },
}

/// Tunables for the Lambert time-equation solver.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct LambertConfig {
    /// Relative tolerance on the normalized flight time.
    pub tolerance: f64,
    /// Iteration cap for both bisection and Newton.
    pub max_iterations: u32,
}

impl Default for LambertConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: crate::NUMERIC_MAX_ITERS,
        }
    }
}

/// Tunables for the Hohmann estimate.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct HohmannConfig {
    /// Below this dot product of the two orbit normals, a warning is
    /// logged that the Hohmann estimate is unreliable.
    pub coplanar_threshold: f64,
}

impl Default for HohmannConfig {
    fn default() -> Self {
        Self {
            coplanar_threshold: 0.8,
        }
    }
}

/// Tunables for the departure and arrival time optimizers.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct OptimizerConfig {
    /// Step used for the central differences, in seconds.
    pub derivative_step: f64,
    /// Initial step cap as a fraction of the search window.
    pub max_step_fraction: f64,
    /// The search stops once steps get shorter than this, in seconds.
    pub time_precision: f64,
    /// The arrival search stops once the infeasible bound is within this
    /// much delta-v of the limit, in m/s.
    pub dv_precision: f64,
    /// Where the arrival search starts its infeasible bound, as a fraction
    /// of the Hohmann flight time after departure.
    pub min_flight_fraction: f64,
    /// Iteration cap for both optimizers.
    pub max_iterations: u32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            derivative_step: 1.0,
            max_step_fraction: 0.1,
            time_precision: 1.0,
            dv_precision: 1.0,
            min_flight_fraction: 0.1,
            max_iterations: 100,
        }
    }
}

/// All solver tunables in one place.
///
/// The defaults are suitable for planetary-scale systems with times in
/// seconds and distances in meters.
///
/// With the `serde` feature enabled, a config can be loaded from TOML.
/// Every section and field is optional and falls back to its default:
///
/// ```toml
/// [lambert]
/// tolerance = 1e-8
///
/// [optimizer]
/// max_iterations = 200
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct SolverConfig {
    #[allow(missing_docs)]
    pub lambert: LambertConfig,
    #[allow(missing_docs)]
    pub hohmann: HohmannConfig,
    #[allow(missing_docs)]
    pub optimizer: OptimizerConfig,
}

fn require(
    field: &'static str,
    requirement: &'static str,
    value: f64,
    ok: bool,
) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            requirement,
            value,
        })
    }
}

fn require_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    require(field, "positive and finite", value, value > 0.0 && value.is_finite())
}

impl SolverConfig {
    /// Checks that every field is within its allowed range.
    ///
    /// # Errors
    /// Returns [`ConfigError::OutOfRange`] for the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("lambert.tolerance", self.lambert.tolerance)?;
        require(
            "lambert.max_iterations",
            "at least 1",
            self.lambert.max_iterations as f64,
            self.lambert.max_iterations > 0,
        )?;

        let threshold = self.hohmann.coplanar_threshold;
        require(
            "hohmann.coplanar_threshold",
            "within [-1, 1]",
            threshold,
            (-1.0..=1.0).contains(&threshold),
        )?;

        let optimizer = &self.optimizer;
        require_positive("optimizer.derivative_step", optimizer.derivative_step)?;
        require_positive("optimizer.time_precision", optimizer.time_precision)?;
        require_positive("optimizer.dv_precision", optimizer.dv_precision)?;
        require(
            "optimizer.max_step_fraction",
            "within (0, 1]",
            optimizer.max_step_fraction,
            optimizer.max_step_fraction > 0.0 && optimizer.max_step_fraction <= 1.0,
        )?;
        require(
            "optimizer.min_flight_fraction",
            "within (0, 1)",
            optimizer.min_flight_fraction,
            optimizer.min_flight_fraction > 0.0 && optimizer.min_flight_fraction < 1.0,
        )?;
        require(
            "optimizer.max_iterations",
            "at least 1",
            optimizer.max_iterations as f64,
            optimizer.max_iterations > 0,
        )
    }

    /// Parses and validates a config from a TOML string.
    ///
    /// # Errors
    /// Returns [`ConfigError::Toml`] if the string isn't valid TOML for
    /// this struct, or [`ConfigError::OutOfRange`] if validation fails.
    #[cfg(feature = "serde")]
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: SolverConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config from a TOML file.
    ///
    /// # Errors
    /// See [`from_toml_str`][Self::from_toml_str]; additionally returns
    /// [`ConfigError::Io`] if the file can't be read.
    #[cfg(feature = "serde")]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}
