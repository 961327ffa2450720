/*
 * Copyright 2024 Fluence Labs Limited
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::io::Write;
use std::path::PathBuf;

use msrbatch_msr::registers::SideRegisters;
use msrbatch_msr::registers::IA32_APERF;
use msrbatch_msr::registers::IA32_TIME_STAMP_COUNTER;
use tracing_subscriber::filter::LevelFilter;

use crate::config_loader::load_config;
use crate::config_loader::load_config_with_env;
use crate::Device;
use crate::Logs;
use crate::MSRBatchConfig;

fn write_config(dir: &tempfile::TempDir, text: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(text.as_bytes()).unwrap();
    path
}

#[test]
fn parse_basic_config() {
    let mut manifest_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_path.push("src/tests/default.toml");

    let actual_config = load_config(manifest_path.as_os_str().to_str().unwrap()).unwrap();

    let mut config_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    config_dir.push("src/tests");
    let expected_config = MSRBatchConfig {
        logs: Logs {
            log_level: LevelFilter::WARN,
        },
        device: Device {
            dir: "/tmp/msrbatch/cpu".into(),
        },
        allowlist_path: config_dir.join("allowlist"),
        registers: SideRegisters {
            aux_counter: IA32_APERF,
            instructions_retired: 777,
            ..SideRegisters::default()
        },
    };

    assert_eq!(actual_config, expected_config);
}

#[test]
fn empty_config_gets_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "");

    let config = load_config(path.to_str().unwrap()).unwrap();

    assert_eq!(config.logs, Logs::default());
    assert_eq!(config.device, Device::default());
    assert_eq!(config.device.dir, PathBuf::from("/dev/cpu"));
    assert_eq!(config.allowlist_path, dir.path().join("./allowlist"));
    assert_eq!(config.registers, SideRegisters::default());
}

#[test]
fn absolute_allowlist_path_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        "allowlist-path = \"/etc/msrbatch/allowlist\"\n[registers]\nthermal-status = \"0x10\"\n",
    );

    let config = load_config(path.to_str().unwrap()).unwrap();

    assert_eq!(config.allowlist_path, PathBuf::from("/etc/msrbatch/allowlist"));
    assert_eq!(config.registers.thermal_status, IA32_TIME_STAMP_COUNTER);
}

#[test]
fn invalid_register_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[registers]\nperf-status = \"0xNOPE\"\n");

    let error = load_config(path.to_str().unwrap()).unwrap_err();

    assert!(format!("{error:?}").contains("registers.perf-status"));
}

#[test]
fn missing_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    assert!(load_config(path.to_str().unwrap()).is_err());
}

#[test]
fn environment_overrides_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        "allowlist-path = \"allowlist\"\n[logs]\nlog-level = \"warn\"\n",
    );
    let vars = [
        ("MSRBATCH_ALLOWLIST_PATH", "/etc/msrbatch/allowlist"),
        ("MSRBATCH_LOGS__LOG_LEVEL", "debug"),
        ("MSRBATCH_REGISTERS__AUX_COUNTER", "0xE8"),
        ("MSRBATCH_DEVICE__DIR", "/tmp/cpu"),
        ("OTHER_LOGS__LOG_LEVEL", "trace"),
    ]
    .map(|(name, value)| (name.to_string(), value.to_string()));

    let config = load_config_with_env(path.to_str().unwrap(), vars).unwrap();

    assert_eq!(config.allowlist_path, PathBuf::from("/etc/msrbatch/allowlist"));
    assert_eq!(config.logs.log_level, LevelFilter::DEBUG);
    assert_eq!(config.registers.aux_counter, IA32_APERF);
    assert_eq!(config.device.dir, PathBuf::from("/tmp/cpu"));
}

#[test]
fn unrelated_variables_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[logs]\nlog-level = \"info\"\n");
    let vars = [("MSRBATCHLOGS__LOG_LEVEL", "trace"), ("PATH", "/usr/bin")]
        .map(|(name, value)| (name.to_string(), value.to_string()));

    let config = load_config_with_env(path.to_str().unwrap(), vars).unwrap();

    assert_eq!(config.logs.log_level, LevelFilter::INFO);
}
