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

use std::fs::File;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use cpu_utils::LogicalCoreId;

use crate::CoreAccess;
use crate::MSRBackend;
use crate::MSRError;
use crate::MSRResult;

const DEFAULT_DEVICE_DIR: &str = "/dev/cpu";
const REGISTER_SIZE: usize = std::mem::size_of::<u64>();

enum MSRFileOpMode {
    MSRRead,
    MSRWrite,
}

/// Backend reaching registers through the msr kernel module, `<device_dir>/<core>/msr`.
#[derive(Clone, Debug)]
pub struct DevMSR {
    device_dir: PathBuf,
}

impl DevMSR {
    pub fn new(device_dir: impl Into<PathBuf>) -> Self {
        Self {
            device_dir: device_dir.into(),
        }
    }

    pub fn device_dir(&self) -> &Path {
        &self.device_dir
    }

    fn device_path(&self, core_id: LogicalCoreId) -> PathBuf {
        self.device_dir.join(core_id.to_string()).join("msr")
    }
}

impl Default for DevMSR {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_DIR)
    }
}

impl MSRBackend for DevMSR {
    type Core = DevMSRCore;

    fn attach(&self, core_id: LogicalCoreId) -> MSRResult<DevMSRCore> {
        if !cpu_utils::pinning::pin_current_thread_to(core_id) {
            return Err(MSRError::pinning_failed(core_id));
        }

        let path = self.device_path(core_id);
        let reader = open_msr(&path, MSRFileOpMode::MSRRead)
            .map_err(|error| MSRError::open_for_read(core_id, error))?;
        tracing::trace!("Attached to MSR file {path:?} at core id {core_id}");

        Ok(DevMSRCore {
            core_id,
            path,
            reader,
            writer: None,
        })
    }
}

/// Open MSR files of one logical core.
///
/// The write side is opened on the first write, so batches which only read don't
/// need write permissions on the device.
#[derive(Debug)]
pub struct DevMSRCore {
    core_id: LogicalCoreId,
    path: PathBuf,
    reader: File,
    writer: Option<File>,
}

impl DevMSRCore {
    fn writer(&mut self) -> MSRResult<&File> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => open_msr(&self.path, MSRFileOpMode::MSRWrite)
                .map_err(|error| MSRError::open_for_write(self.core_id, error))?,
        };

        Ok(self.writer.insert(writer))
    }
}

impl CoreAccess for DevMSRCore {
    fn core_id(&self) -> LogicalCoreId {
        self.core_id
    }

    fn read(&mut self, register_id: u32) -> MSRResult<u64> {
        use nix::sys::uio::pread;

        let mut value = [0u8; REGISTER_SIZE];
        let bytes = pread(&self.reader, &mut value, register_id as i64)
            .map_err(|errno| MSRError::read_w_no_err(register_id, self.core_id, errno))?;
        if bytes != REGISTER_SIZE {
            return Err(MSRError::short_transfer(register_id, self.core_id, bytes));
        }
        let result = u64::from_le_bytes(value);

        tracing::trace!(
            "Read MSR register_id {register_id:#x} value {result:#x} at core id {}",
            self.core_id
        );

        Ok(result)
    }

    fn write(&mut self, register_id: u32, value: u64) -> MSRResult<()> {
        use nix::sys::uio::pwrite;

        let core_id = self.core_id;
        let writer = self.writer()?;
        let value_as_bytes = value.to_le_bytes();
        let bytes = pwrite(writer, &value_as_bytes, register_id as i64)
            .map_err(|errno| MSRError::write_w_no_err(value, register_id, core_id, errno))?;
        if bytes != REGISTER_SIZE {
            return Err(MSRError::short_transfer(register_id, core_id, bytes));
        }

        tracing::trace!("Write MSR register_id {register_id:#x} value {value:#x} at core id {core_id}");

        Ok(())
    }
}

fn open_msr(path: &Path, mode: MSRFileOpMode) -> io::Result<File> {
    use std::fs::OpenOptions;

    match mode {
        MSRFileOpMode::MSRRead => OpenOptions::new().read(true).open(path),
        MSRFileOpMode::MSRWrite => OpenOptions::new().write(true).open(path),
    }
}
