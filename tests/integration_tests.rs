/*
 * Integration tests for tfconf
 *
 * These tests drive the public API end to end: discovery on a fake sysfs
 * tree, naming from a canned sensor report, edits through the reconciler
 * and installation into a temporary /etc.
 */

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clap::Parser;
use serial_test::serial;
use tempfile::TempDir;

use tfconf::catalog::{name_sensors, SensorCatalog};
use tfconf::cli::{Cli, Commands};
use tfconf::codec;
use tfconf::config::ConfigReconciler;
use tfconf::hwmon::ThermalZoneReader;
use tfconf::levels::{self, Bound};
use tfconf::model::{Config, ConfigFormat, Sensor};
use tfconf::report::{parse_report, ReportEntry, SensorReportSource};
use tfconf::service::{PkexecApplier, PrivilegedApplier};
use tfconf::settings::{load_settings, Settings};
use tfconf::{ApplyFailure, Result, TfconfError};

// Test utilities

/// Installs by copying and counts calls
struct RecordingApplier {
    installs: Arc<Mutex<Vec<PathBuf>>>,
}

impl PrivilegedApplier for RecordingApplier {
    fn apply(&self, scratch: &Path, target: &Path) -> Result<()> {
        self.installs.lock().unwrap().push(target.to_path_buf());
        fs::copy(scratch, target)?;
        Ok(())
    }
}

/// Never gets past the authentication prompt
struct DecliningApplier;

impl PrivilegedApplier for DecliningApplier {
    fn apply(&self, _scratch: &Path, _target: &Path) -> Result<()> {
        Err(ApplyFailure::Declined.into())
    }
}

struct CannedReport(Vec<ReportEntry>);

impl SensorReportSource for CannedReport {
    fn fetch(&self) -> Result<Vec<ReportEntry>> {
        Ok(self.0.clone())
    }
}

fn etc_dir() -> (TempDir, ConfigReconciler, Arc<Mutex<Vec<PathBuf>>>) {
    let dir = TempDir::new().unwrap();
    let installs = Arc::new(Mutex::new(Vec::new()));
    let reconciler = ConfigReconciler::new(
        dir.path().join("thinkfan.yaml"),
        dir.path().join("thinkfan.conf"),
        Box::new(RecordingApplier { installs: Arc::clone(&installs) }),
    );
    (dir, reconciler, installs)
}

fn write_hwmon(root: &Path, idx: usize, name: &str, inputs: &[(usize, &str)]) -> Vec<PathBuf> {
    let chip = root.join(format!("hwmon{}", idx));
    fs::create_dir_all(&chip).unwrap();
    fs::write(chip.join("name"), name).unwrap();
    inputs
        .iter()
        .map(|(n, value)| {
            let path = chip.join(format!("temp{}_input", n));
            fs::write(&path, value).unwrap();
            path
        })
        .collect()
}

#[test]
fn test_legacy_file_scenario() {
    let (dir, reconciler, _) = etc_dir();
    fs::write(dir.path().join("thinkfan.conf"), "hwmon /sys/x\ntp_fan /sys/y\n(0, 0, 60)\n(7, 60, 255)\n").unwrap();

    let config = reconciler.read_config().unwrap();
    assert_eq!(config.source_format, ConfigFormat::Legacy);
    assert_eq!(config.sensors.len(), 1);
    assert_eq!(config.sensors[0].path(), Path::new("/sys/x"));
    assert_eq!(config.fans.len(), 1);
    assert_eq!(config.levels.len(), 2);
    assert_eq!(config.levels[0].lower_limit, None);
    assert_eq!(config.levels[0].upper_limit, vec![60]);
    assert_eq!(config.levels[1].lower_limit, Some(vec![60]));
    assert_eq!(config.levels[1].upper_limit, vec![255]);
}

#[test]
fn test_bootstrap_then_edit_cycle() {
    let (dir, reconciler, installs) = etc_dir();

    let config = reconciler.read_config().unwrap();
    assert_eq!(config, Config::default_config());
    assert!(config.is_contiguous());
    assert_eq!(installs.lock().unwrap().len(), 1);

    let config = reconciler.add_sensor(Sensor::tpacpi("/proc/acpi/ibm/thermal")).unwrap();
    assert_eq!(config.sensors.len(), 2);
    assert!(config.columns_consistent());
    for level in &config.levels {
        assert_eq!(level.upper_limit[0], level.upper_limit[1]);
    }

    let config = reconciler.edit_boundary(1, 1, Bound::Upper, 62).unwrap();
    assert_eq!(config.levels[1].upper_limit[1], 62);
    assert_eq!(config.levels[2].lower_limit.as_ref().unwrap()[1], 62);

    let config = reconciler.remove_sensor(Path::new("/sys/class/hwmon/hwmon0/temp1_input")).unwrap();
    assert_eq!(config.sensors, vec![Sensor::tpacpi("/proc/acpi/ibm/thermal")]);
    assert_eq!(config.levels[1].upper_limit, vec![62]);

    let on_disk = fs::read_to_string(dir.path().join("thinkfan.yaml")).unwrap();
    assert!(on_disk.contains("- tpacpi: /proc/acpi/ibm/thermal"));
    assert_eq!(codec::parse(&on_disk).unwrap(), config);
    assert_eq!(installs.lock().unwrap().len(), 4);
}

#[test]
fn test_declined_apply_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let yaml = dir.path().join("thinkfan.yaml");
    let original = codec::serialize(&Config::default_config());
    fs::write(&yaml, &original).unwrap();

    let reconciler = ConfigReconciler::new(&yaml, dir.path().join("thinkfan.conf"), Box::new(DecliningApplier));
    let err = reconciler.edit_speed(0, 1).unwrap_err();
    assert!(matches!(err, TfconfError::Apply(ApplyFailure::Declined)));
    assert_eq!(fs::read_to_string(&yaml).unwrap(), original);
}

#[test]
fn test_rejected_edits_leave_file_untouched() {
    let (dir, reconciler, installs) = etc_dir();
    reconciler.read_config().unwrap();
    let before = fs::read_to_string(dir.path().join("thinkfan.yaml")).unwrap();

    assert!(matches!(reconciler.edit_boundary(1, 0, Bound::Upper, -3), Err(TfconfError::InvalidTemperature { .. })));
    assert!(matches!(reconciler.edit_boundary(2, 0, Bound::Upper, 10), Err(TfconfError::BoundaryOrder { .. })));
    assert!(matches!(
        reconciler.remove_sensor(Path::new("/sys/class/hwmon/hwmon0/temp1_input")),
        Err(TfconfError::LastSensor)
    ));

    assert_eq!(fs::read_to_string(dir.path().join("thinkfan.yaml")).unwrap(), before);
    assert_eq!(installs.lock().unwrap().len(), 1);
}

#[test]
fn test_real_applier_installs_without_elevation() {
    let dir = TempDir::new().unwrap();
    let applier = PkexecApplier::new(vec![], "", std::time::Duration::from_secs(10));
    let reconciler = ConfigReconciler::new(
        dir.path().join("thinkfan.yaml"),
        dir.path().join("thinkfan.conf"),
        Box::new(applier),
    );

    let config = reconciler.set_level(2, 4, 56, 72).unwrap();
    assert_eq!(config.levels[2].speed, 4);
    assert_eq!(config.levels[2].lower_limit, Some(vec![56]));
    assert_eq!(config.levels[2].upper_limit, vec![72]);
    assert_eq!(config.levels[1].upper_limit, vec![56]);
    assert_eq!(config.levels[3].lower_limit, Some(vec![72]));
}

#[test]
fn test_discovery_to_configuration() {
    let sys = TempDir::new().unwrap();
    let hwmon_root = sys.path().join("hwmon");
    let thermal_root = sys.path().join("thermal");
    fs::create_dir_all(&thermal_root).unwrap();
    write_hwmon(&hwmon_root, 0, "acpitz", &[(1, "41000")]);
    let cpu = write_hwmon(&hwmon_root, 1, "coretemp", &[(1, "62000"), (2, "200000")]);

    let report = CannedReport(vec![
        ReportEntry::new("acpitz-acpi-0", "temp1", 41.2),
        ReportEntry::new("coretemp-isa-0000", "Package id 0", 62.3),
    ]);
    let entries = SensorCatalog::new(ThermalZoneReader::new(&hwmon_root, &thermal_root), Box::new(report)).discover();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].path, cpu[0]);
    assert_eq!(entries[0].name, "Package id 0 (coretemp)");
    assert_eq!(entries[1].name, "temp1 (acpitz)");

    // Pick the top-ranked sensor
    let (_dir, reconciler, _) = etc_dir();
    let config = reconciler.add_sensor(Sensor::hwmon(&entries[0].path)).unwrap();
    let named = name_sensors(&config, &entries);
    assert_eq!(named.sensors[1].display_name.as_deref(), Some("Package id 0 (coretemp)"));
    assert!(named.sensors[0].display_name.is_none());
}

#[test]
fn test_report_parsing_feeds_resolution() {
    let report = parse_report(r#"{"k10temp-pci-00c3": {"Adapter": "PCI adapter", "Tctl": {"temp1_input": 55.25}}}"#).unwrap();
    let zones = vec![tfconf::model::ThermalZone::new("/sys/a", "k10temp", 55.0)];
    let ranked = tfconf::identity::rank(tfconf::identity::resolve(zones, &report));
    assert_eq!(tfconf::identity::display_name(&ranked[0]), "Tctl (k10temp)");
}

#[test]
fn test_contiguity_after_many_edits() {
    let mut config = Config::default_config();
    assert!(config.is_contiguous());
    assert!(levels::diagnose(&config).is_empty());
    config = levels::add_sensor_column(&config, Sensor::hwmon("/sys/b")).unwrap();
    assert!(config.is_contiguous());

    let mut value = 0;
    for step in 0..60usize {
        value = (value * 31 + 17) % 120;
        let level = step % config.levels.len();
        let column = step % 2;
        let bound = if step % 3 == 0 { Bound::Lower } else { Bound::Upper };
        if let Ok(next) = levels::edit_boundary(&config, level, column, bound, value) {
            config = next;
        }
        assert!(config.is_contiguous());
        assert!(config.columns_consistent());
    }
}

#[test]
fn test_legacy_round_trip_and_migration_text() {
    let legacy = "hwmon /sys/x\ntp_fan /proc/acpi/ibm/fan\n(0, 0, 55)\n(3, 55, 70)\n(7, 70, 32767)\n";
    let config = codec::parse(legacy).unwrap();
    assert_eq!(codec::target_format(&config), ConfigFormat::Legacy);
    assert_eq!(codec::parse(&codec::serialize_legacy(&config).unwrap()).unwrap(), config);

    let grown = levels::add_sensor_column(&config, Sensor::hwmon("/sys/z")).unwrap();
    assert_eq!(codec::target_format(&grown), ConfigFormat::Structured);
    assert!(codec::serialize_legacy(&grown).is_err());

    let mut structured = grown.clone();
    structured.source_format = ConfigFormat::Structured;
    assert_eq!(codec::parse(&codec::serialize(&grown)).unwrap(), structured);
}

#[test]
#[serial]
fn test_settings_from_environment() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, r#"{"service_name": "", "history_len": 4}"#).unwrap();

    std::env::set_var("TFCONF_SETTINGS", &path);
    let cli = Cli::try_parse_from(["tfconf", "show"]);
    std::env::remove_var("TFCONF_SETTINGS");

    let cli = cli.unwrap();
    assert!(matches!(cli.command, Commands::Show));
    assert_eq!(cli.settings.as_deref(), Some(path.as_path()));

    let settings = load_settings(cli.settings.as_deref()).unwrap();
    assert_eq!(settings.history_len, 4);
    assert_eq!(settings.service_name, "");
    assert_eq!(settings.legacy_config, Settings::default().legacy_config);
}

#[test]
#[serial]
fn test_settings_flag_beats_environment() {
    std::env::set_var("TFCONF_SETTINGS", "/from/env.json");
    let cli = Cli::try_parse_from(["tfconf", "--settings", "/from/flag.json", "sensors"]);
    std::env::remove_var("TFCONF_SETTINGS");

    assert_eq!(cli.unwrap().settings, Some(PathBuf::from("/from/flag.json")));
}
