use std::sync::Mutex;

use tempfile::{Builder, NamedTempFile};

use hygiene_kernel::config::EngineConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "HYGIENE_CONFIG",
        "HYGIENE_SENSITIVITY",
        "HYGIENE_TEMPORAL_WINDOW_SECS",
        "HYGIENE_MOVEMENT_THRESHOLD_PX",
        "HYGIENE_SCOOPER_PROXIMITY_PX",
        "HYGIENE_EXTENDED_CONTACT_SECS",
        "HYGIENE_GRACE_PERIOD_SECS",
        "HYGIENE_GRID_SNAP_PX",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = EngineConfig::load().expect("load defaults");
    assert_eq!(cfg, EngineConfig::default());
    assert_eq!(cfg.analyzer.sensitivity, 0.5);
    assert_eq!(cfg.analyzer.cross_contamination_grace_secs, 5.0);
    assert_eq!(cfg.editor.grid_snap_px, None);
}

#[test]
fn loads_json_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "analyzer": {
            "sensitivity": 0.6,
            "temporalWindow": 3.0,
            "movementThreshold": 4.0,
            "scooperProximityThreshold": 80,
            "extendedContactThreshold": 12,
            "crossContaminationGracePeriod": 4
        },
        "editor": {
            "gridSnapSize": 20,
            "historyCapacity": 16
        },
        "violationHistoryCapacity": 50
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("HYGIENE_CONFIG", file.path());
    std::env::set_var("HYGIENE_SCOOPER_PROXIMITY_PX", "45");
    std::env::set_var("HYGIENE_GRID_SNAP_PX", "off");

    let cfg = EngineConfig::load().expect("load config");

    assert_eq!(cfg.analyzer.sensitivity, 0.6);
    assert_eq!(cfg.analyzer.temporal_window, 3.0);
    assert_eq!(cfg.analyzer.movement.grab_avg_max, 4.0);
    assert_eq!(cfg.analyzer.movement.clean_step_min, 24.0);
    assert_eq!(cfg.analyzer.scooper_proximity_px, 45.0);
    assert_eq!(cfg.analyzer.extended_contact_secs, 12.0);
    assert_eq!(cfg.analyzer.cross_contamination_grace_secs, 4.0);
    assert_eq!(cfg.editor.grid_snap_px, None);
    assert_eq!(cfg.editor.history_capacity, 16);
    assert_eq!(cfg.violation_history_capacity, 50);

    clear_env();
}

#[test]
fn loads_toml_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new().suffix(".toml").tempfile().expect("temp config");
    let toml = r#"
violationHistoryCapacity = 10

[analyzer]
sensitivity = 0.7
idleExpiry = 8.0

[editor]
gridSnapSize = 25.0
closeRadius = 12.0
"#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");

    let cfg = EngineConfig::from_path(file.path()).expect("load toml");
    assert_eq!(cfg.analyzer.sensitivity, 0.7);
    assert_eq!(cfg.analyzer.idle_expiry, 8.0);
    assert_eq!(cfg.editor.grid_snap_px, Some(25.0));
    assert_eq!(cfg.editor.close_radius, 12.0);
    assert_eq!(cfg.violation_history_capacity, 10);
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("HYGIENE_SENSITIVITY", "not-a-number");
    assert!(EngineConfig::load().is_err());

    std::env::set_var("HYGIENE_SENSITIVITY", "1.5");
    assert!(EngineConfig::load().is_err());
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(
        &mut file,
        br#"{"analyzer": {"zoneHistoryRetention": 2, "crossContaminationGracePeriod": 5}}"#,
    )
    .expect("write config");
    let err = EngineConfig::from_path(file.path()).unwrap_err();
    assert!(err.to_string().contains("zone history retention"));

    let mut broken = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut broken, b"{ not json").expect("write config");
    assert!(EngineConfig::from_path(broken.path()).is_err());

    clear_env();
}
