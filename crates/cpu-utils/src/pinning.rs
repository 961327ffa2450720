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

use core_affinity::CoreId;

use crate::LogicalCoreId;

/// Lightweight function which doesn't require topology to pin current thread to the specified core.
/// Returns true, if pinning was successful.
///
/// Cores outside the affinity mask of the calling process (offline, nonexistent
/// or forbidden by cgroups) are refused before any syscall is made.
pub fn pin_current_thread_to(core_id: LogicalCoreId) -> bool {
    let id: usize = core_id.into();
    let is_available = core_affinity::get_core_ids()
        .map(|core_ids| core_ids.iter().any(|core| core.id == id))
        .unwrap_or(false);
    if !is_available {
        return false;
    }

    core_affinity::set_for_current(CoreId { id })
}

/// Returns logical cores the current process is allowed to run on.
pub fn available_cores() -> Vec<LogicalCoreId> {
    core_affinity::get_core_ids()
        .unwrap_or_default()
        .into_iter()
        .map(|core| LogicalCoreId::new(core.id as u32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonexistent_core_is_refused() {
        assert!(!pin_current_thread_to(LogicalCoreId::new(u32::MAX)));
    }

    #[test]
    fn pinning_to_available_core_works() {
        let cores = available_cores();
        let first_core = cores.first().copied();
        if let Some(core_id) = first_core {
            let result = std::thread::spawn(move || pin_current_thread_to(core_id))
                .join()
                .unwrap();
            assert!(result);
        }
    }
}
