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

use std::path::PathBuf;

use msrbatch_msr::registers::SideRegisters;

use crate::defaults::default_device_dir;
use crate::defaults::default_log_level;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MSRBatchConfig {
    pub logs: Logs,
    pub device: Device,
    pub allowlist_path: PathBuf,
    pub registers: SideRegisters,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Logs {
    pub log_level: tracing_subscriber::filter::LevelFilter,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Device {
    /// Directory holding `<core id>/msr` device files.
    pub dir: PathBuf,
}

impl Default for Logs {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_tracing_filter(),
        }
    }
}

impl Default for Device {
    fn default() -> Self {
        Self {
            dir: default_device_dir(),
        }
    }
}
