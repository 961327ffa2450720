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


use msrbatch_msr::registers::SideRegisters;
use msrbatch_msr::CoreAccess;
use msrbatch_msr::MSRResult;

use crate::AuxSample;
use crate::RegisterOperation;

/// Runs operations of one logical core on the thread attached to that core.
pub(crate) struct CoreExecutor<'registers, C> {
    core: C,
    registers: &'registers SideRegisters,
}

impl<'registers, C: CoreAccess> CoreExecutor<'registers, C> {
    pub(crate) fn new(core: C, registers: &'registers SideRegisters) -> Self {
        Self { core, registers }
    }

    /// Executes operations in the given order. A failed operation gets its error
    /// recorded and the remaining operations still run.
    pub(crate) fn run<'op>(
        &mut self,
        operations: impl IntoIterator<Item = &'op mut RegisterOperation>,
    ) {
        let core_id = self.core.core_id();

        for operation in operations {
            debug_assert_eq!(operation.core_id(), core_id);

            operation.reset_outputs();
            if let Err(error) = self.execute(operation) {
                tracing::warn!(
                    "operation on register_id {:#x} at core id {core_id} failed: {error}",
                    operation.register_id()
                );
                operation.fail(error);
            }
        }
    }

    /// The first failed access stops the operation, steps after it are skipped.
    fn execute(&mut self, operation: &mut RegisterOperation) -> MSRResult<()> {
        let mode = operation.mode();
        let register_id = operation.register_id();

        if mode.samples.before_read {
            self.sample(operation, AuxSample::BeforeRead)?;
        }

        let read_value = self.core.read(register_id)?;
        operation.read_value = Some(read_value);

        let latest_value = if mode.poll {
            self.poll(operation, read_value)?
        } else {
            read_value
        };

        if mode.samples.after_poll {
            self.sample(operation, AuxSample::AfterPoll)?;
        }

        if mode.write {
            // the hardware write is issued even if the merged value equals the current one
            let committed = operation
                .write_mask()
                .commit(latest_value, operation.write_value);
            operation.write_value = committed;
            self.core.write(register_id, committed)?;
        }

        if mode.read_thermal_status {
            operation.thermal_status = Some(self.core.read(self.registers.thermal_status)?);
        }

        if mode.read_perf_status {
            operation.perf_status = Some(self.core.read(self.registers.perf_status)?);
        }

        if mode.read_instructions_retired {
            let instructions = self.core.read(self.registers.instructions_retired)?;
            operation.instructions_retired = Some(instructions);
        }

        if mode.samples.last {
            self.sample(operation, AuxSample::Last)?;
        }

        tracing::trace!(
            "operation on register_id {register_id:#x} at core id {} completed: read {read_value:#x}",
            operation.core_id()
        );

        Ok(())
    }

    /// Spins until the register differs from `baseline`. There is no bound on the number
    /// of iterations, polling a register which never changes blocks the core forever.
    fn poll(&mut self, operation: &mut RegisterOperation, baseline: u64) -> MSRResult<u64> {
        let register_id = operation.register_id();
        let sample_in_poll = operation.mode().samples.in_poll;

        loop {
            if sample_in_poll {
                self.sample(operation, AuxSample::InPoll)?;
            }

            let value = self.core.read(register_id)?;
            operation.poll_value = Some(value);
            if value != baseline {
                return Ok(value);
            }

            std::hint::spin_loop();
        }
    }

    fn sample(&mut self, operation: &mut RegisterOperation, point: AuxSample) -> MSRResult<()> {
        let value = self.core.read(self.registers.aux_counter)?;
        operation.aux_samples[point.slot()] = Some(value);
        Ok(())
    }
}
