//! Hardware database contract and an in-memory catalog.

use serde::{Deserialize, Serialize};

use crate::error::{HardwareKind, UnknownHardwareError};

fn default_gamma_pdc() -> f64 {
    -0.004
}

fn default_u0() -> f64 {
    25.0
}

fn default_u1() -> f64 {
    6.84
}

fn default_eta_nom() -> f64 {
    0.96
}

/// PV module datasheet values used by the reference model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub id: String,
    /// DC rating at STC, W
    pub pdc0_w: f64,
    /// Power temperature coefficient, 1/C
    #[serde(default = "default_gamma_pdc")]
    pub gamma_pdc: f64,
    /// Faiman constant heat loss, W/(m^2 K)
    #[serde(default = "default_u0")]
    pub u0: f64,
    /// Faiman wind heat loss, W/(m^2 K) per m/s
    #[serde(default = "default_u1")]
    pub u1: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InverterSpec {
    pub id: String,
    /// AC rating, W. Output is clipped here.
    pub paco_w: f64,
    /// Nominal efficiency
    #[serde(default = "default_eta_nom")]
    pub eta_nom: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HardwareSpec {
    Module(ModuleSpec),
    Inverter(InverterSpec),
}

impl HardwareSpec {
    pub fn kind(&self) -> HardwareKind {
        match self {
            HardwareSpec::Module(_) => HardwareKind::Module,
            HardwareSpec::Inverter(_) => HardwareKind::Inverter,
        }
    }
}

/// Lookup of module and inverter parameters by identifier.
pub trait HardwareDatabase: Send + Sync {
    fn resolve(&self, identifier: &str, kind: HardwareKind) -> Result<HardwareSpec, UnknownHardwareError>;

    fn module(&self, identifier: &str) -> Result<ModuleSpec, UnknownHardwareError> {
        match self.resolve(identifier, HardwareKind::Module)? {
            HardwareSpec::Module(m) => Ok(m),
            HardwareSpec::Inverter(_) => Err(unknown(identifier, HardwareKind::Module)),
        }
    }

    fn inverter(&self, identifier: &str) -> Result<InverterSpec, UnknownHardwareError> {
        match self.resolve(identifier, HardwareKind::Inverter)? {
            HardwareSpec::Inverter(i) => Ok(i),
            HardwareSpec::Module(_) => Err(unknown(identifier, HardwareKind::Inverter)),
        }
    }
}

fn unknown(identifier: &str, kind: HardwareKind) -> UnknownHardwareError {
    UnknownHardwareError {
        identifier: identifier.to_string(),
        kind,
    }
}

/// Module and inverter lists as they appear in a project file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HardwareCatalog {
    #[serde(default)]
    pub modules: Vec<ModuleSpec>,
    #[serde(default)]
    pub inverters: Vec<InverterSpec>,
}

impl HardwareCatalog {
    pub fn with_module(mut self, module: ModuleSpec) -> Self {
        self.modules.push(module);
        self
    }

    pub fn with_inverter(mut self, inverter: InverterSpec) -> Self {
        self.inverters.push(inverter);
        self
    }
}

impl HardwareDatabase for HardwareCatalog {
    fn resolve(&self, identifier: &str, kind: HardwareKind) -> Result<HardwareSpec, UnknownHardwareError> {
        let found = match kind {
            HardwareKind::Module => self
                .modules
                .iter()
                .find(|m| m.id == identifier)
                .cloned()
                .map(HardwareSpec::Module),
            HardwareKind::Inverter => self
                .inverters
                .iter()
                .find(|i| i.id == identifier)
                .cloned()
                .map(HardwareSpec::Inverter),
        };
        found.ok_or_else(|| unknown(identifier, kind))
    }
}
