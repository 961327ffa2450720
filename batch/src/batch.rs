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

use cpu_utils::LogicalCoreId;
use msrbatch_msr::MSRError;

use crate::RegisterOperation;

/// An ordered set of register operations dispatched together.
///
/// Operations addressed to one core are executed in the order they have here,
/// there is no ordering between operations of different cores.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Batch {
    operations: Vec<RegisterOperation>,
}

impl Batch {
    pub fn new(operations: Vec<RegisterOperation>) -> Self {
        Self { operations }
    }

    pub fn push(&mut self, operation: RegisterOperation) {
        self.operations.push(operation);
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn operations(&self) -> &[RegisterOperation] {
        &self.operations
    }

    /// Distinct logical cores referenced by the batch.
    pub fn core_ids(&self) -> BTreeSet<LogicalCoreId> {
        self.operations
            .iter()
            .map(RegisterOperation::core_id)
            .collect()
    }

    /// Returns the first failed operation in the batch order together with its position.
    pub fn first_error(&self) -> Option<(usize, MSRError)> {
        self.operations
            .iter()
            .enumerate()
            .find_map(|(index, operation)| operation.error().map(|error| (index, error)))
    }

    pub(crate) fn operations_mut(&mut self) -> &mut [RegisterOperation] {
        &mut self.operations
    }
}

impl FromIterator<RegisterOperation> for Batch {
    fn from_iter<T: IntoIterator<Item = RegisterOperation>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl From<Vec<RegisterOperation>> for Batch {
    fn from(operations: Vec<RegisterOperation>) -> Self {
        Self::new(operations)
    }
}

impl<'batch> IntoIterator for &'batch Batch {
    type Item = &'batch RegisterOperation;
    type IntoIter = std::slice::Iter<'batch, RegisterOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}
