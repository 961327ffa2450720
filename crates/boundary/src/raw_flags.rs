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

use bitflags::bitflags;
use serde::Deserialize;
use serde::Serialize;

use msrbatch::AuxSamplePoints;
use msrbatch::OperationMode;

bitflags! {
    /// Op codes of the msr-safe batch ABI.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct RawOpFlags: u16 {
        const WRITE = 0x001;
        const POLL = 0x002;
        /// Aux counter before the mandatory read.
        const MPERF0 = 0x010;
        /// Aux counter before every poll read.
        const MPERF1 = 0x020;
        /// Aux counter after polling.
        const MPERF2 = 0x040;
        /// Aux counter at the very end.
        const MPERF3 = 0x080;
        const THERM_STATUS = 0x100;
        const PERF_STATUS = 0x200;
        const INS_RETIRED = 0x400;
    }
}

impl From<RawOpFlags> for OperationMode {
    fn from(flags: RawOpFlags) -> Self {
        OperationMode {
            write: flags.contains(RawOpFlags::WRITE),
            poll: flags.contains(RawOpFlags::POLL),
            samples: AuxSamplePoints {
                before_read: flags.contains(RawOpFlags::MPERF0),
                in_poll: flags.contains(RawOpFlags::MPERF1),
                after_poll: flags.contains(RawOpFlags::MPERF2),
                last: flags.contains(RawOpFlags::MPERF3),
            },
            read_thermal_status: flags.contains(RawOpFlags::THERM_STATUS),
            read_perf_status: flags.contains(RawOpFlags::PERF_STATUS),
            read_instructions_retired: flags.contains(RawOpFlags::INS_RETIRED),
        }
    }
}

impl From<OperationMode> for RawOpFlags {
    fn from(mode: OperationMode) -> Self {
        let mut flags = RawOpFlags::empty();
        flags.set(RawOpFlags::WRITE, mode.write);
        flags.set(RawOpFlags::POLL, mode.poll);
        flags.set(RawOpFlags::MPERF0, mode.samples.before_read);
        flags.set(RawOpFlags::MPERF1, mode.samples.in_poll);
        flags.set(RawOpFlags::MPERF2, mode.samples.after_poll);
        flags.set(RawOpFlags::MPERF3, mode.samples.last);
        flags.set(RawOpFlags::THERM_STATUS, mode.read_thermal_status);
        flags.set(RawOpFlags::PERF_STATUS, mode.read_perf_status);
        flags.set(RawOpFlags::INS_RETIRED, mode.read_instructions_retired);
        flags
    }
}
