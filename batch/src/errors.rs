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

use std::any::Any;
use std::collections::TryReserveError;

use nix::errno::Errno;
use thiserror::Error as ThisError;

use cpu_utils::LogicalCoreId;
use msrbatch_msr::MSRError;

/// Summary of a failed dispatch, details of every failed operation stay in the batch.
#[derive(ThisError, Debug)]
pub enum BatchError {
    #[error("operation #{index} on logical core {core_id} failed: {error}")]
    OperationFailed {
        index: usize,
        core_id: LogicalCoreId,
        error: MSRError,
    },

    #[error("allocating the target core set failed: {0}")]
    CoreSetAllocation(#[from] TryReserveError),

    #[error("spawning an executor thread for logical core {core_id} failed: {io_error}")]
    ExecutorSpawn {
        core_id: LogicalCoreId,
        io_error: std::io::Error,
    },

    #[error("executor thread of logical core {core_id} panicked: {message}")]
    ExecutorPanicked {
        core_id: LogicalCoreId,
        message: String,
    },
}

impl BatchError {
    pub fn operation_failed(index: usize, error: MSRError) -> Self {
        Self::OperationFailed {
            index,
            core_id: error.core_id(),
            error,
        }
    }

    pub(crate) fn executor_spawn(core_id: LogicalCoreId, io_error: std::io::Error) -> Self {
        Self::ExecutorSpawn { core_id, io_error }
    }

    pub(crate) fn executor_panicked(core_id: LogicalCoreId, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            message.to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "unknown panic payload".to_string()
        };

        Self::ExecutorPanicked { core_id, message }
    }

    /// Negative errno describing the failure, as the kernel batch interface returns it.
    pub fn code(&self) -> i32 {
        match self {
            Self::OperationFailed { error, .. } => error.code(),
            Self::CoreSetAllocation(_) => -(Errno::ENOMEM as i32),
            Self::ExecutorSpawn { .. } => -(Errno::EAGAIN as i32),
            Self::ExecutorPanicked { .. } => -(Errno::EFAULT as i32),
        }
    }
}
