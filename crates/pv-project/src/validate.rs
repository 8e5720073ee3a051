//! Project validation logic.

use crate::schema::{MAX_TIMEOUT_S, Project, SiteDef};
use pv_core::{ArraySpec, PlantSpec, Topology};
use pv_model::{HardwareDatabase, HardwareKind};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported feature: {feature} - {reason}")]
    Unsupported { feature: String, reason: String },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: String, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn check_range(field: String, value: f64, lo: f64, hi: f64) -> Result<(), ValidationError> {
    if value.is_finite() && (lo..=hi).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, value, &format!("must be within {lo}..={hi}")))
    }
}

pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    if project.version > crate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: project.version,
        });
    }

    let mut site_ids = HashSet::new();
    for site in &project.sites {
        if !site_ids.insert(site.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: site.id.clone(),
                context: "sites".to_string(),
            });
        }
        validate_site(site)?;
    }

    let mut module_ids = HashSet::new();
    for module in &project.hardware.modules {
        if !module_ids.insert(module.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: module.id.clone(),
                context: "hardware.modules".to_string(),
            });
        }
    }
    let mut inverter_ids = HashSet::new();
    for inverter in &project.hardware.inverters {
        if !inverter_ids.insert(inverter.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: inverter.id.clone(),
                context: "hardware.inverters".to_string(),
            });
        }
    }

    let mut plant_names = HashSet::new();
    for plant in &project.plants {
        if !plant_names.insert(plant.name.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: plant.name.clone(),
                context: "plants".to_string(),
            });
        }
        if !site_ids.contains(plant.site.as_str()) {
            return Err(ValidationError::MissingReference {
                id: plant.site.clone(),
                context: format!("plant '{}' site", plant.name),
            });
        }
        validate_plant(project, plant)?;
    }

    Ok(())
}

fn validate_site(site: &SiteDef) -> Result<(), ValidationError> {
    let ctx = |field: &str| format!("sites.{}.{field}", site.id);
    check_range(ctx("location.latitude"), site.location.latitude, -90.0, 90.0)?;
    check_range(ctx("location.longitude"), site.location.longitude, -180.0, 180.0)?;
    if !site.location.altitude.is_finite() {
        return Err(invalid(ctx("location.altitude"), site.location.altitude, "must be finite"));
    }
    if site.location.timezone.trim().is_empty() {
        return Err(invalid(ctx("location.timezone"), "", "must not be empty"));
    }
    if site.weather.timeout().is_none() {
        return Err(invalid(
            ctx("weather.timeout_s"),
            site.weather.timeout_s,
            &format!("must be within (0, {MAX_TIMEOUT_S}] seconds"),
        ));
    }

    let mut names = HashSet::new();
    for source in &site.weather.sources {
        if !names.insert(source.name.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: source.name.clone(),
                context: ctx("weather.sources"),
            });
        }
    }
    Ok(())
}

fn validate_plant(project: &Project, plant: &PlantSpec) -> Result<(), ValidationError> {
    let ctx = |field: &str| format!("plants.{}.{field}", plant.name);

    if let Some(loc) = &plant.location {
        check_range(ctx("location.latitude"), loc.latitude, -90.0, 90.0)?;
        check_range(ctx("location.longitude"), loc.longitude, -180.0, 180.0)?;
        if loc.timezone.trim().is_empty() {
            return Err(invalid(ctx("location.timezone"), "", "must not be empty"));
        }
    }

    match &plant.topology {
        // The series type already guarantees increasing timestamps.
        Topology::Simple { .. } => return Ok(()),
        Topology::String | Topology::Micro if plant.arrays.is_empty() => {
            return Err(ValidationError::Unsupported {
                feature: format!("{} plant '{}' without arrays", plant.topology.tag(), plant.name),
                reason: "at least one array is required".to_string(),
            });
        }
        Topology::String => {
            let model = &plant.arrays[0].inverter.model;
            if plant
                .arrays
                .iter()
                .any(|a| &a.inverter.model != model || a.inverter.nr_inverters != 1)
            {
                return Err(ValidationError::Unsupported {
                    feature: format!("string plant '{}' with several inverters", plant.name),
                    reason: "string plants use one inverter model with nr_inverters = 1".to_string(),
                });
            }
        }
        Topology::Micro => {}
    }

    for array in &plant.arrays {
        validate_array(project, plant, array)?;
    }
    Ok(())
}

fn validate_array(project: &Project, plant: &PlantSpec, array: &ArraySpec) -> Result<(), ValidationError> {
    let ctx = |field: &str| format!("plants.{}.arrays.{}.{field}", plant.name, array.name);
    check_range(ctx("tilt"), array.tilt, 0.0, 90.0)?;
    check_range(ctx("azimuth"), array.azimuth, 0.0, 360.0)?;
    for (field, count) in [
        ("modules_per_string", array.modules_per_string),
        ("strings", array.strings),
        ("inverter.nr_inverters", array.inverter.nr_inverters),
    ] {
        if count == 0 {
            return Err(invalid(ctx(field), count, "must be at least 1"));
        }
    }

    for (id, kind) in [
        (&array.module, HardwareKind::Module),
        (&array.inverter.model, HardwareKind::Inverter),
    ] {
        if project.hardware.resolve(id, kind).is_err() {
            return Err(ValidationError::MissingReference {
                id: id.clone(),
                context: format!("plant '{}' {kind}", plant.name),
            });
        }
    }
    Ok(())
}
