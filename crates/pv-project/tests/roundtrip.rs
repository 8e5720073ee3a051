use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{TimeZone, Utc};
use pv_core::{ArraySpec, ForecastEntry, InverterRef, Location, PlantSpec, PowerSeries, Topology};
use pv_model::{HardwareCatalog, InverterSpec, ModuleSpec};
use pv_project::{
    LATEST_VERSION, Project, ProjectError, SiteDef, ValidationError, WeatherDef, load, load_yaml,
    save, save_yaml, validate_project,
};
use pv_weather::SourceConfig;

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

const PROJECT_YAML: &str = r#"
version: 1
name: Amsterdam rooftops
sites:
  - id: home
    location:
      latitude: 52.35
      longitude: 4.88
      timezone: Europe/Amsterdam
      altitude: 2
    weather:
      timeout_s: 5
      sources:
        - name: local
          type: file
          options:
            path: weather/day.yaml
        - name: sky
          type: clearsky
          options:
            interval_minutes: 60
hardware:
  modules:
    - id: Trina_TSM_400
      pdc0_w: 400
  inverters:
    - id: SMA_SB3000
      paco_w: 3000
    - id: Enphase_IQ7
      paco_w: 290
      eta_nom: 0.97
plants:
  - name: house
    site: home
    topology:
      type: string
    arrays:
      - name: east
        tilt: 30
        azimuth: 90
        module: Trina_TSM_400
        modules_per_string: 6
        inverter:
          model: SMA_SB3000
      - name: west
        tilt: 30
        azimuth: 270
        module: Trina_TSM_400
        modules_per_string: 6
        inverter:
          model: SMA_SB3000
  - name: shed
    site: home
    topology:
      type: micro
    arrays:
      - name: south
        tilt: 40
        azimuth: 180
        module: Trina_TSM_400
        inverter:
          model: Enphase_IQ7
          nr_inverters: 3
  - name: meter
    site: home
    topology:
      type: simple
      ac_power:
        - timestamp: 2024-06-21T10:00:00Z
          ac_power_w: 150.0
        - timestamp: 2024-06-21T11:00:00Z
          ac_power_w: null
"#;

fn parsed() -> Project {
    serde_yaml::from_str(PROJECT_YAML).unwrap()
}

#[test]
fn yaml_fixture_parses_with_defaults() {
    let project = parsed();
    validate_project(&project).unwrap();

    let home = project.site("home").unwrap();
    assert_eq!(home.weather.timeout().map(|t| t.as_secs()), Some(5));
    assert_eq!(home.weather.sources[0].kind, "file");

    let house = project.plant("house").unwrap();
    assert_eq!(house.topology, Topology::String);
    assert_eq!(house.arrays[0].strings, 1);
    assert_eq!(house.arrays[0].inverter.nr_inverters, 1);

    let shed = project.plant("shed").unwrap();
    assert_eq!(shed.device_count(), 3);
    assert_eq!(shed.arrays[0].modules_per_string, 1);

    let Topology::Simple { ac_power } = &project.plant("meter").unwrap().topology else {
        panic!("meter should be simple");
    };
    assert_eq!(ac_power.len(), 2);
    assert_eq!(ac_power.null_count(), 1);

    assert_eq!(project.hardware.inverters[0].eta_nom, 0.96);
}

#[test]
fn roundtrip_yaml_and_json() {
    let dir = unique_temp_dir("pv_project_roundtrip");
    let project = parsed();

    let yaml = dir.join("project.yaml");
    save_yaml(&yaml, &project).unwrap();
    assert_eq!(load_yaml(&yaml).unwrap(), project);

    let json = dir.join("project.json");
    save(&json, &project).unwrap();
    assert!(fs::read_to_string(&json).unwrap().trim_start().starts_with('{'));
    assert_eq!(load(&json).unwrap(), project);
}

#[test]
fn roundtrip_built_project() {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut project = Project::new("built");
    project.sites.push(SiteDef {
        id: "s".into(),
        location: Location::new(-33.9, 18.4, "Africa/Johannesburg", 10.0),
        weather: WeatherDef {
            sources: vec![SourceConfig::new("sky", "clearsky").with_option("temperature", 25.0)],
            timeout_s: 2.5,
        },
    });
    project.hardware = HardwareCatalog::default()
        .with_module(ModuleSpec {
            id: "m".into(),
            pdc0_w: 350.0,
            gamma_pdc: -0.0037,
            u0: 25.0,
            u1: 6.84,
        })
        .with_inverter(InverterSpec {
            id: "i".into(),
            paco_w: 5000.0,
            eta_nom: 0.97,
        });
    project.plants.push(PlantSpec {
        name: "north-facing".into(),
        site: "s".into(),
        topology: Topology::String,
        location: None,
        arrays: vec![ArraySpec {
            name: "roof".into(),
            tilt: 20.0,
            azimuth: 0.0,
            module: "m".into(),
            modules_per_string: 10,
            strings: 2,
            inverter: InverterRef::new("i", 1),
        }],
    });
    project.plants.push(PlantSpec {
        name: "logger".into(),
        site: "s".into(),
        topology: Topology::Simple {
            ac_power: PowerSeries::new(vec![ForecastEntry::new(t0, Some(1.0))]).unwrap(),
        },
        location: None,
        arrays: vec![],
    });
    assert_eq!(project.version, LATEST_VERSION);

    let path = unique_temp_dir("pv_project_built").join("p.yaml");
    save_yaml(&path, &project).unwrap();
    assert_eq!(load_yaml(&path).unwrap(), project);
}

#[test]
fn newer_version_is_rejected() {
    let mut project = parsed();
    project.version = LATEST_VERSION + 1;
    assert_eq!(
        validate_project(&project).unwrap_err(),
        ValidationError::UnsupportedVersion {
            version: LATEST_VERSION + 1
        }
    );
}

#[test]
fn plant_must_reference_existing_site() {
    let mut project = parsed();
    project.plants[0].site = "nowhere".into();
    assert!(matches!(
        validate_project(&project),
        Err(ValidationError::MissingReference { id, .. }) if id == "nowhere"
    ));
}

#[test]
fn duplicate_plant_names_are_rejected() {
    let mut project = parsed();
    project.plants[1].name = "house".into();
    assert!(matches!(
        validate_project(&project),
        Err(ValidationError::DuplicateId { .. })
    ));
}

#[test]
fn duplicate_source_names_are_rejected() {
    let mut project = parsed();
    project.sites[0].weather.sources[1].name = "local".into();
    assert!(matches!(
        validate_project(&project),
        Err(ValidationError::DuplicateId { context, .. }) if context.contains("weather.sources")
    ));
}

#[test]
fn unknown_hardware_is_a_missing_reference() {
    let mut project = parsed();
    project.plants[1].arrays[0].module = "Ghost".into();
    assert!(matches!(
        validate_project(&project),
        Err(ValidationError::MissingReference { id, .. }) if id == "Ghost"
    ));
}

#[test]
fn geometry_and_counts_are_range_checked() {
    let mut project = parsed();
    project.plants[0].arrays[0].tilt = 95.0;
    assert!(matches!(validate_project(&project), Err(ValidationError::InvalidValue { .. })));

    let mut project = parsed();
    project.sites[0].location.latitude = 91.0;
    assert!(matches!(validate_project(&project), Err(ValidationError::InvalidValue { .. })));

    let mut project = parsed();
    project.plants[1].arrays[0].inverter.nr_inverters = 0;
    assert!(matches!(validate_project(&project), Err(ValidationError::InvalidValue { .. })));

    let mut project = parsed();
    project.sites[0].location.timezone = " ".into();
    assert!(matches!(validate_project(&project), Err(ValidationError::InvalidValue { .. })));
}

#[test]
fn string_plant_with_mixed_inverters_is_unsupported() {
    let mut project = parsed();
    project.plants[0].arrays[1].inverter.model = "Enphase_IQ7".into();
    assert!(matches!(validate_project(&project), Err(ValidationError::Unsupported { .. })));

    let mut project = parsed();
    project.plants[1].arrays.clear();
    assert!(matches!(validate_project(&project), Err(ValidationError::Unsupported { .. })));
}

#[test]
fn unordered_simple_series_fails_to_load() {
    let dir = unique_temp_dir("pv_project_unordered");
    let path = dir.join("p.yaml");
    let broken = PROJECT_YAML.replace("2024-06-21T11:00:00Z", "2024-06-21T09:00:00Z");
    fs::write(&path, broken).unwrap();
    assert!(matches!(load_yaml(&path), Err(ProjectError::Yaml(_))));
}

#[test]
fn source_timeout_is_bounded() {
    for bad in [0.0, -1.0, f64::NAN, 86_400.5, 1.0e30] {
        let mut project = parsed();
        project.sites[0].weather.timeout_s = bad;
        assert!(
            matches!(
                validate_project(&project),
                Err(ValidationError::InvalidValue { field, .. }) if field.ends_with("weather.timeout_s")
            ),
            "timeout_s = {bad} should be rejected"
        );
        assert_eq!(project.sites[0].weather.timeout(), None);
    }

    let mut project = parsed();
    project.sites[0].weather.timeout_s = 86_400.0;
    validate_project(&project).unwrap();
    assert_eq!(project.sites[0].weather.timeout().map(|t| t.as_secs()), Some(86_400));
}
