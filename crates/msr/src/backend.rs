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

use cpu_utils::LogicalCoreId;

use crate::MSRResult;

/// A source of register access for logical cores.
///
/// `attach` is called from the thread that is going to execute operations for `core_id`,
/// implementations are expected to bind that thread to the core before returning.
/// Failing to attach means the core can't be served at all.
pub trait MSRBackend: Sync {
    type Core: CoreAccess;

    fn attach(&self, core_id: LogicalCoreId) -> MSRResult<Self::Core>;
}

/// Register access bound to one logical core.
pub trait CoreAccess {
    fn core_id(&self) -> LogicalCoreId;

    fn read(&mut self, register_id: u32) -> MSRResult<u64>;

    fn write(&mut self, register_id: u32, value: u64) -> MSRResult<()>;
}
