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

use std::path::Path;
use std::path::PathBuf;

use eyre::eyre;
use eyre::WrapErr as _;
use serde::Deserialize;
use serde::Serialize;

use msrbatch_boundary::OrHex;
use msrbatch_msr::registers::SideRegisters;

use super::defaults::default_allowlist_path;
use super::defaults::default_device_dir;
use super::defaults::default_log_level;
use crate::*;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnresolvedMSRBatchConfig {
    #[serde(default = "default_allowlist_path")]
    pub allowlist_path: PathBuf,
    #[serde(default)]
    pub logs: UnresolvedLogs,
    #[serde(default)]
    pub device: UnresolvedDevice,
    #[serde(default)]
    pub registers: UnresolvedRegisters,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnresolvedLogs {
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,
}

impl Default for UnresolvedLogs {
    fn default() -> Self {
        UnresolvedLogs {
            log_level: default_log_level(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnresolvedDevice {
    #[serde(default = "default_device_dir")]
    pub dir: PathBuf,
}

impl Default for UnresolvedDevice {
    fn default() -> Self {
        UnresolvedDevice {
            dir: default_device_dir(),
        }
    }
}

/// Overrides of the side registers, numbers or `0x`-prefixed strings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnresolvedRegisters {
    pub aux_counter: Option<OrHex<u32>>,
    pub thermal_status: Option<OrHex<u32>>,
    pub perf_status: Option<OrHex<u32>>,
    pub instructions_retired: Option<OrHex<u32>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl UnresolvedMSRBatchConfig {
    pub fn resolve(self, config_path: impl AsRef<Path>) -> eyre::Result<MSRBatchConfig> {
        let config_dir = config_path.as_ref().parent().ok_or_else(|| {
            eyre!(
                "config resolver was provided with invalid config path: {}",
                config_path.as_ref().display()
            )
        })?;

        let logs = self.logs.resolve();
        let device = self.device.resolve();
        let registers = self.registers.resolve()?;

        let config = MSRBatchConfig {
            logs,
            device,
            allowlist_path: config_dir.join(self.allowlist_path),
            registers,
        };
        Ok(config)
    }
}

impl UnresolvedLogs {
    pub fn resolve(self) -> Logs {
        Logs {
            log_level: self.log_level.to_tracing_filter(),
        }
    }
}

impl UnresolvedDevice {
    pub fn resolve(self) -> Device {
        Device { dir: self.dir }
    }
}

impl UnresolvedRegisters {
    pub fn resolve(self) -> eyre::Result<SideRegisters> {
        fn resolve_one(value: Option<OrHex<u32>>, default: u32, name: &str) -> eyre::Result<u32> {
            match value {
                Some(value) => value
                    .unhex()
                    .wrap_err_with(|| format!("registers.{name} is not a valid register address")),
                None => Ok(default),
            }
        }

        let defaults = SideRegisters::default();
        let registers = SideRegisters {
            aux_counter: resolve_one(self.aux_counter, defaults.aux_counter, "aux-counter")?,
            thermal_status: resolve_one(
                self.thermal_status,
                defaults.thermal_status,
                "thermal-status",
            )?,
            perf_status: resolve_one(self.perf_status, defaults.perf_status, "perf-status")?,
            instructions_retired: resolve_one(
                self.instructions_retired,
                defaults.instructions_retired,
                "instructions-retired",
            )?,
        };
        Ok(registers)
    }
}

impl LogLevel {
    pub fn to_tracing_filter(&self) -> tracing_subscriber::filter::LevelFilter {
        use tracing_subscriber::filter::LevelFilter;

        match self {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}
