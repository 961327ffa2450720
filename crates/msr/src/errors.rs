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

use nix::errno::Errno;
use thiserror::Error as ThisError;

use cpu_utils::LogicalCoreId;

#[derive(ThisError, Copy, Clone, Debug, PartialEq, Eq)]
pub enum MSRError {
    #[error("pinning a thread to logical core {core_id} failed, the core is offline or doesn't exist")]
    PinningFailed { core_id: LogicalCoreId },

    #[error("register access isn't supported on this platform (logical core {core_id})")]
    Unsupported { core_id: LogicalCoreId },

    #[error("opening MSR file of logical core {core_id} for read there is an error: {errno}")]
    OpenForRead { core_id: LogicalCoreId, errno: Errno },

    #[error("opening MSR file of logical core {core_id} for write there is an error: {errno}")]
    OpenForWrite { core_id: LogicalCoreId, errno: Errno },

    #[error(
        "reading from register_id {register_id:#x} of logical core {core_id} there is an error: {errno}"
    )]
    ReadWNoErr {
        register_id: u32,
        core_id: LogicalCoreId,
        errno: Errno,
    },

    #[error(
        "writing value {value:#x} for register_id {register_id:#x} of logical core {core_id} there is an error: {errno}"
    )]
    WriteWNoErr {
        value: u64,
        register_id: u32,
        core_id: LogicalCoreId,
        errno: Errno,
    },

    #[error(
        "register_id {register_id:#x} of logical core {core_id} transferred {bytes} bytes instead of 8"
    )]
    ShortTransfer {
        register_id: u32,
        core_id: LogicalCoreId,
        bytes: usize,
    },
}

impl MSRError {
    pub fn pinning_failed(core_id: LogicalCoreId) -> Self {
        Self::PinningFailed { core_id }
    }

    pub fn unsupported(core_id: LogicalCoreId) -> Self {
        Self::Unsupported { core_id }
    }

    pub fn open_for_read(core_id: LogicalCoreId, io_error: std::io::Error) -> Self {
        Self::OpenForRead {
            core_id,
            errno: io_errno(&io_error),
        }
    }

    pub fn open_for_write(core_id: LogicalCoreId, io_error: std::io::Error) -> Self {
        Self::OpenForWrite {
            core_id,
            errno: io_errno(&io_error),
        }
    }

    pub fn read_w_no_err(register_id: u32, core_id: LogicalCoreId, errno: Errno) -> Self {
        Self::ReadWNoErr {
            register_id,
            core_id,
            errno,
        }
    }

    pub fn write_w_no_err(
        value: u64,
        register_id: u32,
        core_id: LogicalCoreId,
        errno: Errno,
    ) -> Self {
        Self::WriteWNoErr {
            value,
            register_id,
            core_id,
            errno,
        }
    }

    pub fn short_transfer(register_id: u32, core_id: LogicalCoreId, bytes: usize) -> Self {
        Self::ShortTransfer {
            register_id,
            core_id,
            bytes,
        }
    }

    /// Logical core the failed access was addressed to.
    pub fn core_id(&self) -> LogicalCoreId {
        match *self {
            Self::PinningFailed { core_id }
            | Self::Unsupported { core_id }
            | Self::OpenForRead { core_id, .. }
            | Self::OpenForWrite { core_id, .. }
            | Self::ReadWNoErr { core_id, .. }
            | Self::WriteWNoErr { core_id, .. }
            | Self::ShortTransfer { core_id, .. } => core_id,
        }
    }

    pub fn errno(&self) -> Errno {
        match *self {
            Self::PinningFailed { .. } => Errno::ENXIO,
            Self::Unsupported { .. } => Errno::ENOSYS,
            Self::ShortTransfer { .. } => Errno::EIO,
            Self::OpenForRead { errno, .. }
            | Self::OpenForWrite { errno, .. }
            | Self::ReadWNoErr { errno, .. }
            | Self::WriteWNoErr { errno, .. } => errno,
        }
    }

    /// Negative errno, the way the kernel batch interface reports a failed operation.
    pub fn code(&self) -> i32 {
        -(self.errno() as i32)
    }
}

fn io_errno(io_error: &std::io::Error) -> Errno {
    io_error
        .raw_os_error()
        .map(Errno::from_i32)
        .unwrap_or(Errno::UnknownErrno)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_negative_errno() {
        let error = MSRError::read_w_no_err(0x10, 2.into(), Errno::EIO);
        assert_eq!(error.code(), -5);
        assert_eq!(error.core_id(), LogicalCoreId::new(2));
    }

    #[test]
    fn io_error_keeps_os_code() {
        let io_error = std::io::Error::from_raw_os_error(Errno::ENOENT as i32);
        let error = MSRError::open_for_read(7.into(), io_error);
        assert_eq!(error.errno(), Errno::ENOENT);
    }

    #[test]
    fn synthetic_io_error_has_unknown_errno() {
        let io_error = std::io::Error::new(std::io::ErrorKind::Other, "no os code");
        let error = MSRError::open_for_write(1.into(), io_error);
        assert_eq!(error.errno(), Errno::UnknownErrno);
    }
}
