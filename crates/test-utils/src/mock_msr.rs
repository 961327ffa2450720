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

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::ThreadId;

use nix::errno::Errno;
use parking_lot::Mutex;

use cpu_utils::LogicalCoreId;
use msrbatch_msr::CoreAccess;
use msrbatch_msr::MSRBackend;
use msrbatch_msr::MSRError;
use msrbatch_msr::MSRResult;

/// One access observed by the mock, in the order it happened.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Access {
    pub core_id: LogicalCoreId,
    pub kind: AccessKind,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AccessKind {
    Attach { thread: ThreadId },
    Read { register_id: u32, value: u64 },
    Write { register_id: u32, value: u64 },
    FailedRead { register_id: u32 },
    FailedWrite { register_id: u32, value: u64 },
}

#[derive(Clone, Debug, Default)]
struct MockRegister {
    value: u64,
    // returned by the next reads before `value` is
    scripted_reads: VecDeque<u64>,
    // added to `value` after every read, emulates free running counters
    step: u64,
    fail_reads: bool,
    fail_writes: bool,
}

#[derive(Debug, Default)]
struct MockState {
    registers: HashMap<(LogicalCoreId, u32), MockRegister>,
    offline_cores: HashSet<LogicalCoreId>,
    log: Vec<Access>,
}

/// Register backend keeping simulated registers per logical core in memory.
///
/// Registers that were not configured behave like unimplemented MSRs: every access fails
/// with `EIO`. Clones share the same state, so a test can keep one handle and give
/// another to the dispatcher.
#[derive(Clone, Debug, Default)]
pub struct MockMSR {
    state: Arc<Mutex<MockState>>,
}

impl MockMSR {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_register(self, core_id: impl Into<LogicalCoreId>, register_id: u32, value: u64) -> Self {
        self.insert(core_id.into(), register_id, MockRegister {
            value,
            ..<_>::default()
        })
    }

    /// The register returns `reads` one by one and `then` afterwards.
    pub fn with_read_sequence(
        self,
        core_id: impl Into<LogicalCoreId>,
        register_id: u32,
        reads: impl IntoIterator<Item = u64>,
        then: u64,
    ) -> Self {
        self.insert(core_id.into(), register_id, MockRegister {
            value: then,
            scripted_reads: reads.into_iter().collect(),
            ..<_>::default()
        })
    }

    /// The register grows by `step` after every read.
    pub fn with_counter(
        self,
        core_id: impl Into<LogicalCoreId>,
        register_id: u32,
        start: u64,
        step: u64,
    ) -> Self {
        self.insert(core_id.into(), register_id, MockRegister {
            value: start,
            step,
            ..<_>::default()
        })
    }

    /// The register can be read but every write to it fails.
    pub fn with_read_only_register(
        self,
        core_id: impl Into<LogicalCoreId>,
        register_id: u32,
        value: u64,
    ) -> Self {
        self.insert(core_id.into(), register_id, MockRegister {
            value,
            fail_writes: true,
            ..<_>::default()
        })
    }

    /// The core can't be attached to, like an offline or nonexistent core.
    pub fn with_offline_core(self, core_id: impl Into<LogicalCoreId>) -> Self {
        self.state.lock().offline_cores.insert(core_id.into());
        self
    }

    pub fn value(&self, core_id: impl Into<LogicalCoreId>, register_id: u32) -> Option<u64> {
        self.state
            .lock()
            .registers
            .get(&(core_id.into(), register_id))
            .map(|register| register.value)
    }

    pub fn accesses(&self) -> Vec<Access> {
        self.state.lock().log.clone()
    }

    pub fn accesses_on(&self, core_id: impl Into<LogicalCoreId>) -> Vec<AccessKind> {
        let core_id = core_id.into();
        self.state
            .lock()
            .log
            .iter()
            .filter(|access| access.core_id == core_id)
            .map(|access| access.kind)
            .collect()
    }

    /// Cores at least one thread attached to, offline cores included.
    pub fn attached_cores(&self) -> BTreeSet<LogicalCoreId> {
        self.attaches().into_iter().map(|(core_id, _)| core_id).collect()
    }

    pub fn attaches(&self) -> Vec<(LogicalCoreId, ThreadId)> {
        self.state
            .lock()
            .log
            .iter()
            .filter_map(|access| match access.kind {
                AccessKind::Attach { thread } => Some((access.core_id, thread)),
                _ => None,
            })
            .collect()
    }

    /// Values written into the register, failed writes included.
    pub fn writes_to(&self, core_id: impl Into<LogicalCoreId>, register_id: u32) -> Vec<u64> {
        self.accesses_on(core_id)
            .into_iter()
            .filter_map(|kind| match kind {
                AccessKind::Write { register_id: id, value }
                | AccessKind::FailedWrite { register_id: id, value }
                    if id == register_id =>
                {
                    Some(value)
                }
                _ => None,
            })
            .collect()
    }

    pub fn reads_of(&self, core_id: impl Into<LogicalCoreId>, register_id: u32) -> usize {
        self.accesses_on(core_id)
            .into_iter()
            .filter(|kind| match kind {
                AccessKind::Read { register_id: id, .. } | AccessKind::FailedRead { register_id: id } => {
                    *id == register_id
                }
                _ => false,
            })
            .count()
    }

    fn insert(self, core_id: LogicalCoreId, register_id: u32, register: MockRegister) -> Self {
        self.state
            .lock()
            .registers
            .insert((core_id, register_id), register);
        self
    }
}

impl MSRBackend for MockMSR {
    type Core = MockCore;

    fn attach(&self, core_id: LogicalCoreId) -> MSRResult<MockCore> {
        let mut state = self.state.lock();
        let thread = std::thread::current().id();
        state.log.push(Access {
            core_id,
            kind: AccessKind::Attach { thread },
        });

        if state.offline_cores.contains(&core_id) {
            return Err(MSRError::pinning_failed(core_id));
        }

        Ok(MockCore {
            core_id,
            state: self.state.clone(),
        })
    }
}

#[derive(Debug)]
pub struct MockCore {
    core_id: LogicalCoreId,
    state: Arc<Mutex<MockState>>,
}

impl CoreAccess for MockCore {
    fn core_id(&self) -> LogicalCoreId {
        self.core_id
    }

    fn read(&mut self, register_id: u32) -> MSRResult<u64> {
        let core_id = self.core_id;
        let mut state = self.state.lock();

        let value = match state.registers.get_mut(&(core_id, register_id)) {
            Some(register) if !register.fail_reads => {
                match register.scripted_reads.pop_front() {
                    Some(value) => Some(value),
                    None => {
                        let value = register.value;
                        register.value = register.value.wrapping_add(register.step);
                        Some(value)
                    }
                }
            }
            _ => None,
        };

        match value {
            Some(value) => {
                state.log.push(Access {
                    core_id,
                    kind: AccessKind::Read { register_id, value },
                });
                Ok(value)
            }
            None => {
                state.log.push(Access {
                    core_id,
                    kind: AccessKind::FailedRead { register_id },
                });
                Err(MSRError::read_w_no_err(register_id, core_id, Errno::EIO))
            }
        }
    }

    fn write(&mut self, register_id: u32, value: u64) -> MSRResult<()> {
        let core_id = self.core_id;
        let mut state = self.state.lock();

        let is_written = match state.registers.get_mut(&(core_id, register_id)) {
            Some(register) if !register.fail_writes => {
                register.value = value;
                register.scripted_reads.clear();
                true
            }
            _ => false,
        };

        if is_written {
            state.log.push(Access {
                core_id,
                kind: AccessKind::Write { register_id, value },
            });
            Ok(())
        } else {
            state.log.push(Access {
                core_id,
                kind: AccessKind::FailedWrite { register_id, value },
            });
            Err(MSRError::write_w_no_err(value, register_id, core_id, Errno::EIO))
        }
    }
}
