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

/// Generates `size` (core, register) pairs with cores drawn from `cores`
/// and registers from a small pool, so that registers repeat across cores.
pub fn generate_random_targets(
    rng: &mut impl rand::Rng,
    size: usize,
    cores: std::ops::Range<u32>,
) -> Vec<(LogicalCoreId, u32)> {
    const REGISTERS: [u32; 4] = [0x10, 0x198, 0x38F, 0x611];

    let distr = rand::distributions::Uniform::from(cores);
    (0..size)
        .map(|_| {
            let core_id = LogicalCoreId::new(rng.sample(distr));
            let register_id = REGISTERS[rng.gen_range(0..REGISTERS.len())];
            (core_id, register_id)
        })
        .collect()
}

/// A register value that is distinct for every (core, register) pair.
pub fn register_value(core_id: LogicalCoreId, register_id: u32) -> u64 {
    let core_id: usize = core_id.into();
    ((core_id as u64) << 32) | register_id as u64
}
