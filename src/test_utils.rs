/*
 * Test utilities and fixtures for tfconf
 *
 * Sample configurations, a fake sysfs tree builder, a scratch configuration
 * directory and an applier that installs files without elevation.
 */

#[cfg(test)]
pub mod test_utils {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tempfile::TempDir;
    use tf_error::{Result, TfconfError};

    use crate::config::ConfigReconciler;
    use crate::hwmon::ThermalZoneReader;
    use crate::model::{Config, ConfigFormat, Fan, FanKind, Level, Sensor};
    use crate::service::PrivilegedApplier;

    /// Legacy configuration with one sensor, one fan and two levels
    pub fn legacy_example() -> &'static str {
        "hwmon /sys/x\ntp_fan /sys/y\n(0, 0, 60)\n(7, 60, 255)\n"
    }

    /// Single-sensor structured configuration whose levels touch
    pub fn contiguous_config() -> Config {
        Config::new(
            vec![Sensor::hwmon("/sys/class/hwmon/hwmon2/temp1_input")],
            vec![Fan::new(FanKind::Tpacpi, "/proc/acpi/ibm/fan")],
            vec![
                Level::new(0, None, vec![55]),
                Level::new(2, Some(vec![55]), vec![65]),
                Level::new(5, Some(vec![65]), vec![75]),
                Level::new(7, Some(vec![75]), vec![32767]),
            ],
            ConfigFormat::Structured,
        )
    }

    /// Two-sensor structured configuration whose levels touch
    pub fn two_sensor_config() -> Config {
        Config::new(
            vec![
                Sensor::hwmon("/sys/class/hwmon/hwmon2/temp1_input"),
                Sensor::tpacpi("/proc/acpi/ibm/thermal"),
            ],
            vec![Fan::new(FanKind::Tpacpi, "/proc/acpi/ibm/fan")],
            vec![
                Level::new(0, None, vec![55, 50]),
                Level::new(2, Some(vec![55, 50]), vec![65, 60]),
                Level::new(5, Some(vec![65, 60]), vec![75, 70]),
                Level::new(7, Some(vec![75, 70]), vec![32767, 32767]),
            ],
            ConfigFormat::Structured,
        )
    }

    /// Trimmed `sensors -j` output
    pub const SENSORS_JSON: &str = r#"{
   "coretemp-isa-0000":{
      "Adapter": "ISA adapter",
      "Package id 0":{
         "temp1_input": 62.000,
         "temp1_max": 100.000,
         "temp1_crit": 100.000
      },
      "Core 0":{
         "temp2_input": 58.000,
         "temp2_max": 100.000
      }
   },
   "thinkpad-isa-0000":{
      "Adapter": "ISA adapter",
      "fan1":{
         "fan1_input": 2400.000
      },
      "CPU":{
         "temp1_input": 61.000
      }
   },
   "nvme-pci-0400":{
      "Adapter": "PCI adapter",
      "Composite":{
         "temp1_input": 38.850,
         "temp1_max": 81.850
      }
   }
}"#;

    /// Fake `/sys/class/hwmon` and `/sys/class/thermal` trees
    pub struct FakeSysfs {
        dir: TempDir,
    }

    impl FakeSysfs {
        pub fn new() -> Self {
            let dir = TempDir::new().unwrap();
            fs::create_dir_all(dir.path().join("hwmon")).unwrap();
            fs::create_dir_all(dir.path().join("thermal")).unwrap();
            Self { dir }
        }

        pub fn hwmon_root(&self) -> PathBuf {
            self.dir.path().join("hwmon")
        }

        pub fn thermal_root(&self) -> PathBuf {
            self.dir.path().join("thermal")
        }

        /// `hwmon<idx>` with a `name` file and `temp<n>_input` files
        pub fn hwmon(&self, idx: usize, name: &str, inputs: &[(usize, &str)]) {
            let chip = self.hwmon_root().join(format!("hwmon{}", idx));
            fs::create_dir_all(&chip).unwrap();
            fs::write(chip.join("name"), format!("{}\n", name)).unwrap();
            for (n, value) in inputs {
                fs::write(chip.join(format!("temp{}_input", n)), format!("{}\n", value)).unwrap();
            }
        }

        /// `thermal_zone<idx>` with a `type`, an optional `temp` and an
        /// attached `hwmon0` holding `inputs`
        pub fn thermal_zone(&self, idx: usize, zone_type: &str, temp: Option<&str>, inputs: &[(usize, &str)]) {
            let zone = self.thermal_root().join(format!("thermal_zone{}", idx));
            fs::create_dir_all(&zone).unwrap();
            fs::write(zone.join("type"), format!("{}\n", zone_type)).unwrap();
            if let Some(temp) = temp {
                fs::write(zone.join("temp"), format!("{}\n", temp)).unwrap();
            }
            if !inputs.is_empty() {
                let hwmon = zone.join("hwmon0");
                fs::create_dir_all(&hwmon).unwrap();
                for (n, value) in inputs {
                    fs::write(hwmon.join(format!("temp{}_input", n)), format!("{}\n", value)).unwrap();
                }
            }
        }

        pub fn hwmon_input(&self, idx: usize, n: usize) -> PathBuf {
            self.hwmon_root().join(format!("hwmon{}", idx)).join(format!("temp{}_input", n))
        }

        pub fn set_input(&self, idx: usize, n: usize, value: &str) {
            fs::write(self.hwmon_input(idx, n), format!("{}\n", value)).unwrap();
        }

        pub fn reader(&self) -> ThermalZoneReader {
            ThermalZoneReader::new(self.hwmon_root(), self.thermal_root())
        }
    }

    /// Installs the scratch file by copying it, recording each call
    pub struct CopyApplier {
        calls: Arc<Mutex<Vec<(PathBuf, PathBuf)>>>,
    }

    impl CopyApplier {
        pub fn new() -> Self {
            Self { calls: Arc::new(Mutex::new(Vec::new())) }
        }

        /// Shared handle to the `(scratch, target)` pairs seen so far
        pub fn calls(&self) -> Arc<Mutex<Vec<(PathBuf, PathBuf)>>> {
            Arc::clone(&self.calls)
        }
    }

    impl PrivilegedApplier for CopyApplier {
        fn apply(&self, scratch: &Path, target: &Path) -> Result<()> {
            self.calls.lock().push((scratch.to_path_buf(), target.to_path_buf()));
            fs::copy(scratch, target).map_err(|e| TfconfError::FileWrite { path: target.to_path_buf(), source: e })?;
            Ok(())
        }
    }

    /// Directory standing in for `/etc`
    pub struct TempConfigDir {
        dir: TempDir,
    }

    impl TempConfigDir {
        pub fn new() -> Self {
            Self { dir: TempDir::new().unwrap() }
        }

        pub fn structured_path(&self) -> PathBuf {
            self.dir.path().join("thinkfan.yaml")
        }

        pub fn legacy_path(&self) -> PathBuf {
            self.dir.path().join("thinkfan.conf")
        }

        pub fn write_structured(&self, content: &str) {
            fs::write(self.structured_path(), content).unwrap();
        }

        pub fn write_legacy(&self, content: &str) {
            fs::write(self.legacy_path(), content).unwrap();
        }

        pub fn reconciler(&self, applier: Box<dyn PrivilegedApplier>) -> ConfigReconciler {
            ConfigReconciler::new(self.structured_path(), self.legacy_path(), applier)
        }
    }

    /// Asserts that two floating point numbers are approximately equal
    pub fn assert_approx_eq(a: f64, b: f64, tolerance: f64) {
        assert!(
            (a - b).abs() < tolerance,
            "Values {} and {} are not approximately equal (tolerance: {})",
            a, b, tolerance
        );
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::*;

    #[test]
    fn test_fixtures_are_consistent() {
        for config in [contiguous_config(), two_sensor_config()] {
            assert!(config.columns_consistent());
            assert!(config.is_contiguous());
        }
    }

    #[test]
    fn test_fake_sysfs_layout() {
        let sysfs = FakeSysfs::new();
        sysfs.hwmon(3, "coretemp", &[(1, "50000")]);
        sysfs.thermal_zone(0, "acpitz", Some("45000"), &[]);
        assert!(sysfs.hwmon_input(3, 1).is_file());
        assert!(sysfs.thermal_root().join("thermal_zone0/temp").is_file());

        sysfs.set_input(3, 1, "51000");
        let zones = sysfs.reader().enumerate();
        assert_eq!(zones.len(), 2);
        assert_approx_eq(zones[0].current_temp, 51.0, 1e-9);
    }

    #[test]
    fn test_copy_applier_records_calls() {
        use crate::service::PrivilegedApplier;

        let dir = tempfile::TempDir::new().unwrap();
        let scratch = dir.path().join("a");
        let target = dir.path().join("b");
        std::fs::write(&scratch, "x").unwrap();

        let applier = CopyApplier::new();
        applier.apply(&scratch, &target).unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "x");
        assert_eq!(applier.calls().lock().len(), 1);
    }

    #[test]
    #[should_panic]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq(1.0, 1.1, 0.01);
    }
}
