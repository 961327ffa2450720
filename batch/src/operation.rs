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

use serde::Deserialize;
use serde::Serialize;

use cpu_utils::LogicalCoreId;
use msrbatch_msr::MSRError;
use msrbatch_msr::WriteMask;

pub const AUX_SAMPLE_SLOTS: usize = 4;

/// Points of an operation where the auxiliary counter can be sampled,
/// each point owns one slot of `RegisterOperation::aux_samples`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AuxSample {
    /// Before the mandatory read.
    BeforeRead,
    /// Before every poll read, only taken when polling.
    InPoll,
    /// After polling finished (or after the mandatory read if there is no polling).
    AfterPoll,
    /// After everything else.
    Last,
}

impl AuxSample {
    pub const fn slot(self) -> usize {
        match self {
            AuxSample::BeforeRead => 0,
            AuxSample::InPoll => 1,
            AuxSample::AfterPoll => 2,
            AuxSample::Last => 3,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AuxSamplePoints {
    pub before_read: bool,
    pub in_poll: bool,
    pub after_poll: bool,
    pub last: bool,
}

impl AuxSamplePoints {
    pub const NONE: AuxSamplePoints = AuxSamplePoints {
        before_read: false,
        in_poll: false,
        after_poll: false,
        last: false,
    };

    pub const ALL: AuxSamplePoints = AuxSamplePoints {
        before_read: true,
        in_poll: true,
        after_poll: true,
        last: true,
    };

    pub fn contains(&self, point: AuxSample) -> bool {
        match point {
            AuxSample::BeforeRead => self.before_read,
            AuxSample::InPoll => self.in_poll,
            AuxSample::AfterPoll => self.after_poll,
            AuxSample::Last => self.last,
        }
    }
}

/// What an operation does besides the mandatory read of its register.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OperationMode {
    pub write: bool,
    pub poll: bool,
    pub samples: AuxSamplePoints,
    pub read_thermal_status: bool,
    pub read_perf_status: bool,
    pub read_instructions_retired: bool,
}

impl OperationMode {
    /// The mandatory read only.
    pub const READ: OperationMode = OperationMode {
        write: false,
        poll: false,
        samples: AuxSamplePoints::NONE,
        read_thermal_status: false,
        read_perf_status: false,
        read_instructions_retired: false,
    };

    pub fn is_read_only(&self) -> bool {
        *self == Self::READ
    }
}

/// One register access on one logical core.
///
/// Inputs are fixed at construction, outputs are `None` until the executor fills them.
/// Outputs which the mode doesn't ask for are never touched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisterOperation {
    core_id: LogicalCoreId,
    register_id: u32,
    mode: OperationMode,
    write_mask: WriteMask,
    pub(crate) write_value: u64,

    pub(crate) read_value: Option<u64>,
    pub(crate) poll_value: Option<u64>,
    pub(crate) aux_samples: [Option<u64>; AUX_SAMPLE_SLOTS],
    pub(crate) thermal_status: Option<u64>,
    pub(crate) perf_status: Option<u64>,
    pub(crate) instructions_retired: Option<u64>,
    pub(crate) error: Option<MSRError>,
}

impl RegisterOperation {
    /// Creates an operation which only reads `register_id` on `core_id`.
    pub fn new(core_id: impl Into<LogicalCoreId>, register_id: u32) -> Self {
        Self {
            core_id: core_id.into(),
            register_id,
            ..<_>::default()
        }
    }

    pub fn with_mode(mut self, mode: OperationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_write(mut self, value: u64, mask: impl Into<WriteMask>) -> Self {
        self.mode.write = true;
        self.write_value = value;
        self.write_mask = mask.into();
        self
    }

    /// Sets the write input without touching the mode.
    pub fn with_write_input(mut self, value: u64, mask: impl Into<WriteMask>) -> Self {
        self.write_value = value;
        self.write_mask = mask.into();
        self
    }

    pub fn with_poll(mut self) -> Self {
        self.mode.poll = true;
        self
    }

    pub fn with_samples(mut self, samples: AuxSamplePoints) -> Self {
        self.mode.samples = samples;
        self
    }

    pub fn core_id(&self) -> LogicalCoreId {
        self.core_id
    }

    pub fn register_id(&self) -> u32 {
        self.register_id
    }

    pub fn mode(&self) -> OperationMode {
        self.mode
    }

    pub fn write_mask(&self) -> WriteMask {
        self.write_mask
    }

    /// The requested value before execution, the committed one after a write.
    pub fn write_value(&self) -> u64 {
        self.write_value
    }

    pub fn read_value(&self) -> Option<u64> {
        self.read_value
    }

    pub fn poll_value(&self) -> Option<u64> {
        self.poll_value
    }

    pub fn aux_sample(&self, point: AuxSample) -> Option<u64> {
        self.aux_samples[point.slot()]
    }

    pub fn aux_samples(&self) -> &[Option<u64>; AUX_SAMPLE_SLOTS] {
        &self.aux_samples
    }

    pub fn thermal_status(&self) -> Option<u64> {
        self.thermal_status
    }

    pub fn perf_status(&self) -> Option<u64> {
        self.perf_status
    }

    pub fn instructions_retired(&self) -> Option<u64> {
        self.instructions_retired
    }

    pub fn error(&self) -> Option<MSRError> {
        self.error
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Clears what a previous run left in the outputs. `write_value` keeps the committed
    /// value, committing it again under the same mask changes no masked bit.
    pub(crate) fn reset_outputs(&mut self) {
        self.read_value = None;
        self.poll_value = None;
        self.aux_samples = [None; AUX_SAMPLE_SLOTS];
        self.thermal_status = None;
        self.perf_status = None;
        self.instructions_retired = None;
        self.error = None;
    }

    pub(crate) fn fail(&mut self, error: MSRError) {
        self.error = Some(error);
    }
}
