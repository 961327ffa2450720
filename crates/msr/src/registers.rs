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

//! Addresses of the architectural registers the batch engine reads on its own,
//! apart from the register an operation targets.

use serde::Deserialize;
use serde::Serialize;

pub const IA32_TIME_STAMP_COUNTER: u32 = 0x010;
pub const IA32_MPERF: u32 = 0x0E7;
pub const IA32_APERF: u32 = 0x0E8;
pub const IA32_PERF_STATUS: u32 = 0x198;
pub const IA32_THERM_STATUS: u32 = 0x19C;
pub const IA32_FIXED_CTR0: u32 = 0x309;

/// Registers sampled around and after the primary register of an operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideRegisters {
    /// Counter sampled at the auxiliary sample points.
    pub aux_counter: u32,
    pub thermal_status: u32,
    pub perf_status: u32,
    pub instructions_retired: u32,
}

impl Default for SideRegisters {
    fn default() -> Self {
        Self {
            aux_counter: IA32_MPERF,
            thermal_status: IA32_THERM_STATUS,
            perf_status: IA32_PERF_STATUS,
            instructions_retired: IA32_FIXED_CTR0,
        }
    }
}
