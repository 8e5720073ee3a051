//! pv-model: hardware resolution, physical models and plant execution.
//!
//! Contains:
//! - hardware (HardwareDatabase contract, in-memory catalog)
//! - adapter (PhysicalModel capability interface, resolved device specs)
//! - pvwatts (reference PVWatts-style physical model)
//! - plant (PlantModel: topology dispatch and failure containment)
//! - error (model, hardware and configuration errors)

pub mod adapter;
pub mod error;
pub mod hardware;
pub mod plant;
pub mod pvwatts;

pub use adapter::{ArrayInput, DeviceSpec, PhysicalModel};
pub use error::{
    ConfigurationError, HardwareKind, ModelExecutionError, ModelResult, UnknownHardwareError,
};
pub use hardware::{HardwareCatalog, HardwareDatabase, HardwareSpec, InverterSpec, ModuleSpec};
pub use plant::{DeviceOutcome, ExecutionStatus, PlantModel, PlantRun};
pub use pvwatts::PvWattsModel;
