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

/// Restricts which bits of a register a write may change.
///
/// Bits set in the mask are taken from the requested value, bits outside of it keep
/// the value the register had before the write.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct WriteMask(u64);

impl WriteMask {
    pub const ALL: WriteMask = WriteMask(u64::MAX);
    pub const NONE: WriteMask = WriteMask(0);

    pub const fn new(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn intersect(self, other: WriteMask) -> WriteMask {
        WriteMask(self.0 & other.0)
    }

    /// Computes the value that is actually committed into a register holding `old_value`
    /// when `new_value` is requested.
    pub const fn commit(self, old_value: u64, new_value: u64) -> u64 {
        (new_value & self.0) | (old_value & !self.0)
    }
}

impl Default for WriteMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl From<u64> for WriteMask {
    fn from(bits: u64) -> Self {
        Self(bits)
    }
}

impl std::fmt::Display for WriteMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}
