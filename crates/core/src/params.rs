//! Simulation parameters and the named-parameter map
//!
//! Parameters are shared, externally mutable state: controllers may change
//! them freely between steps, and the engine only reads them while a step is
//! in flight. None of the rates are range-validated; out-of-range values are
//! the caller's responsibility.
//!
//! The [`ParameterMap`] replaces the reflection-driven tuning console of
//! earlier iterations with an explicit name → typed-setter table.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tuning parameters for the erosion pipeline.
///
/// Defaults match the reference interactive driver.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimulationParameters {
    /// Whether the rainfall pass adds water this step.
    pub raining: bool,
    /// Water volume added per unit rain rate per second.
    pub water_increment_rate: f32,
    /// Gravitational constant driving pipe flow.
    pub gravitational_constant: f32,
    /// Virtual pipe cross-sectional area.
    pub pipe_cross_sectional_area: f32,
    /// Fraction of water column lost per second to evaporation.
    pub evaporation_rate: f32,
    /// Simulation timestep in seconds.
    pub time_step: f32,
    /// Sediment carry-capacity coefficient.
    pub sediment_carry_capacity: f32,
    /// Rate at which flowing water suspends soil.
    pub soil_suspension_rate: f32,
    /// Rate at which oversaturated water deposits sediment.
    pub soil_deposition_rate: f32,
    /// Water depth at which erosion reaches full strength.
    pub maximal_erode_depth: f32,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            raining: true,
            water_increment_rate: 0.012,
            gravitational_constant: 9.8,
            pipe_cross_sectional_area: 20.0,
            evaporation_rate: 0.15,
            time_step: 0.02,
            sediment_carry_capacity: 0.2,
            soil_suspension_rate: 0.2,
            soil_deposition_rate: 0.2,
            maximal_erode_depth: 0.001,
        }
    }
}

/// Error returned by name-based parameter access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    /// The given name matches no tunable parameter.
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),
}

/// Identifies one float-valued tunable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterKey {
    WaterIncrementRate,
    GravitationalConstant,
    PipeCrossSectionalArea,
    EvaporationRate,
    TimeStep,
    SedimentCarryCapacity,
    SoilSuspensionRate,
    SoilDepositionRate,
    MaximalErodeDepth,
}

impl ParameterKey {
    /// Every tunable key, in display order.
    pub const ALL: [ParameterKey; 9] = [
        ParameterKey::WaterIncrementRate,
        ParameterKey::GravitationalConstant,
        ParameterKey::PipeCrossSectionalArea,
        ParameterKey::EvaporationRate,
        ParameterKey::TimeStep,
        ParameterKey::SedimentCarryCapacity,
        ParameterKey::SoilSuspensionRate,
        ParameterKey::SoilDepositionRate,
        ParameterKey::MaximalErodeDepth,
    ];

    /// Stable external name of the parameter.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ParameterKey::WaterIncrementRate => "water_increment_rate",
            ParameterKey::GravitationalConstant => "gravitational_constant",
            ParameterKey::PipeCrossSectionalArea => "pipe_cross_sectional_area",
            ParameterKey::EvaporationRate => "evaporation_rate",
            ParameterKey::TimeStep => "time_step",
            ParameterKey::SedimentCarryCapacity => "sediment_carry_capacity",
            ParameterKey::SoilSuspensionRate => "soil_suspension_rate",
            ParameterKey::SoilDepositionRate => "soil_deposition_rate",
            ParameterKey::MaximalErodeDepth => "maximal_erode_depth",
        }
    }

    /// Read this parameter's current value.
    #[must_use]
    pub fn get(self, params: &SimulationParameters) -> f32 {
        match self {
            ParameterKey::WaterIncrementRate => params.water_increment_rate,
            ParameterKey::GravitationalConstant => params.gravitational_constant,
            ParameterKey::PipeCrossSectionalArea => params.pipe_cross_sectional_area,
            ParameterKey::EvaporationRate => params.evaporation_rate,
            ParameterKey::TimeStep => params.time_step,
            ParameterKey::SedimentCarryCapacity => params.sediment_carry_capacity,
            ParameterKey::SoilSuspensionRate => params.soil_suspension_rate,
            ParameterKey::SoilDepositionRate => params.soil_deposition_rate,
            ParameterKey::MaximalErodeDepth => params.maximal_erode_depth,
        }
    }

    /// Write this parameter.
    pub fn set(self, params: &mut SimulationParameters, value: f32) {
        match self {
            ParameterKey::WaterIncrementRate => params.water_increment_rate = value,
            ParameterKey::GravitationalConstant => params.gravitational_constant = value,
            ParameterKey::PipeCrossSectionalArea => params.pipe_cross_sectional_area = value,
            ParameterKey::EvaporationRate => params.evaporation_rate = value,
            ParameterKey::TimeStep => params.time_step = value,
            ParameterKey::SedimentCarryCapacity => params.sediment_carry_capacity = value,
            ParameterKey::SoilSuspensionRate => params.soil_suspension_rate = value,
            ParameterKey::SoilDepositionRate => params.soil_deposition_rate = value,
            ParameterKey::MaximalErodeDepth => params.maximal_erode_depth = value,
        }
    }
}

/// Name-indexed view of the tunable parameters.
///
/// Intended for debug consoles and CLI flags: look a parameter up by its
/// stable name and read or write it without reflection.
#[derive(Debug)]
pub struct ParameterMap {
    index: FxHashMap<&'static str, ParameterKey>,
}

impl ParameterMap {
    /// Build the name index.
    #[must_use]
    pub fn new() -> Self {
        let mut index = FxHashMap::default();
        for key in ParameterKey::ALL {
            index.insert(key.name(), key);
        }
        Self { index }
    }

    /// Resolve a name to its key.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError::UnknownParameter`] if the name is not in
    /// the table.
    pub fn resolve(&self, name: &str) -> Result<ParameterKey, ParameterError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ParameterError::UnknownParameter(name.to_owned()))
    }

    /// Set a parameter by name.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError::UnknownParameter`] if the name is not in
    /// the table.
    pub fn set(
        &self,
        params: &mut SimulationParameters,
        name: &str,
        value: f32,
    ) -> Result<(), ParameterError> {
        self.resolve(name)?.set(params, value);
        Ok(())
    }

    /// Read a parameter by name.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError::UnknownParameter`] if the name is not in
    /// the table.
    pub fn get(&self, params: &SimulationParameters, name: &str) -> Result<f32, ParameterError> {
        Ok(self.resolve(name)?.get(params))
    }

    /// All parameter names, in display order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        ParameterKey::ALL.iter().map(|k| k.name()).collect()
    }
}

impl Default for ParameterMap {
    fn default() -> Self {
        Self::new()
    }
}
