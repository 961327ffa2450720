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

#[cfg(test)]
mod tests;

use std::thread;

use cpu_utils::LogicalCoreId;
use msrbatch_msr::registers::SideRegisters;
use msrbatch_msr::MSRBackend;

use crate::executor::CoreExecutor;
use crate::Batch;
use crate::BatchError;
use crate::BatchResult;
use crate::RegisterOperation;

/// Operations of one logical core, borrowed out of a batch in their batch order.
struct CoreGroup<'batch> {
    core_id: LogicalCoreId,
    operations: Vec<&'batch mut RegisterOperation>,
}

/// Executes batches on the logical cores their operations name.
///
/// Every distinct core of a batch gets its own scoped thread which attaches to the core
/// through the backend and runs all operations addressed to it. Cores not referenced by
/// the batch are never touched.
#[derive(Clone, Debug)]
pub struct BatchDispatcher<B> {
    backend: B,
    registers: SideRegisters,
}

impl<B: MSRBackend> BatchDispatcher<B> {
    pub fn new(backend: B) -> Self {
        Self::with_registers(backend, SideRegisters::default())
    }

    pub fn with_registers(backend: B, registers: SideRegisters) -> Self {
        Self { backend, registers }
    }

    pub fn registers(&self) -> &SideRegisters {
        &self.registers
    }

    /// Runs the batch and blocks until every target core finished.
    ///
    /// Output fields of the operations are filled in place, outputs of a previous
    /// dispatch are cleared first. The returned error is the first failed operation in
    /// batch order; operations after it, on the same or other cores, have been executed
    /// anyway. If an executor thread can't be spawned, cores which didn't get a thread
    /// are left as they were and `BatchError::ExecutorSpawn` is returned.
    pub fn dispatch(&self, batch: &mut Batch) -> BatchResult<()> {
        let operations_count = batch.len();
        let groups = partition_by_core(batch.operations_mut())?;
        tracing::debug!(
            "dispatching {operations_count} operations to {} logical cores",
            groups.len()
        );

        let (spawn_error, panicked) = thread::scope(|scope| {
            let mut handles = Vec::new();
            if let Err(error) = handles.try_reserve_exact(groups.len()) {
                return (Some(BatchError::from(error)), Vec::new());
            }

            let mut spawn_error = None;
            for group in groups {
                let core_id = group.core_id;
                let spawned = thread::Builder::new()
                    .name(format!("msr-core-{core_id}"))
                    .spawn_scoped(scope, move || self.run_on_core(group));
                match spawned {
                    Ok(handle) => handles.push((core_id, handle)),
                    Err(io_error) => {
                        tracing::error!(
                            "spawning an executor thread for core id {core_id} failed: {io_error}"
                        );
                        spawn_error = Some(BatchError::executor_spawn(core_id, io_error));
                        break;
                    }
                }
            }

            let panicked = handles
                .into_iter()
                .filter_map(|(core_id, handle)| {
                    handle.join().err().map(|payload| (core_id, payload))
                })
                .collect::<Vec<_>>();
            (spawn_error, panicked)
        });

        if let Some((core_id, payload)) = panicked.into_iter().next() {
            return Err(BatchError::executor_panicked(core_id, payload));
        }

        if let Some(error) = spawn_error {
            return Err(error);
        }

        match batch.first_error() {
            Some((index, error)) => Err(BatchError::operation_failed(index, error)),
            None => Ok(()),
        }
    }

    fn run_on_core(&self, group: CoreGroup<'_>) {
        let CoreGroup {
            core_id,
            operations,
        } = group;

        match self.backend.attach(core_id) {
            Ok(core) => CoreExecutor::new(core, &self.registers).run(operations),
            Err(error) => {
                tracing::warn!("attaching to core id {core_id} failed: {error}");
                for operation in operations {
                    operation.reset_outputs();
                    operation.fail(error);
                }
            }
        }
    }
}

/// Splits operations into disjoint per-core groups, so every executor thread
/// holds the only mutable references to its own operations.
///
/// All allocations are fallible; nothing is dispatched if the core set can't be built.
fn partition_by_core(operations: &mut [RegisterOperation]) -> BatchResult<Vec<CoreGroup<'_>>> {
    let mut core_ids: Vec<LogicalCoreId> = Vec::new();
    core_ids.try_reserve_exact(operations.len())?;
    core_ids.extend(operations.iter().map(RegisterOperation::core_id));
    core_ids.sort_unstable();
    core_ids.dedup();

    let mut groups: Vec<CoreGroup<'_>> = Vec::new();
    groups.try_reserve_exact(core_ids.len())?;
    groups.extend(core_ids.into_iter().map(|core_id| CoreGroup {
        core_id,
        operations: Vec::new(),
    }));

    for operation in operations.iter_mut() {
        let core_id = operation.core_id();
        if let Ok(position) = groups.binary_search_by_key(&core_id, |group| group.core_id) {
            let group = &mut groups[position];
            group.operations.try_reserve(1)?;
            group.operations.push(operation);
        }
    }

    Ok(groups)
}
