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

use std::path::Path;
use std::path::PathBuf;

use cpu_utils::LogicalCoreId;

use crate::CoreAccess;
use crate::MSRBackend;
use crate::MSRError;
use crate::MSRResult;

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
}

impl Default for DevMSR {
    fn default() -> Self {
        Self::new("/dev/cpu")
    }
}

impl MSRBackend for DevMSR {
    type Core = DevMSRCore;

    fn attach(&self, core_id: LogicalCoreId) -> MSRResult<DevMSRCore> {
        Err(MSRError::unsupported(core_id))
    }
}

/// Can't be constructed, `DevMSR::attach` always fails here.
#[derive(Debug)]
pub enum DevMSRCore {}

impl CoreAccess for DevMSRCore {
    fn core_id(&self) -> LogicalCoreId {
        match *self {}
    }

    fn read(&mut self, _register_id: u32) -> MSRResult<u64> {
        match *self {}
    }

    fn write(&mut self, _register_id: u32, _value: u64) -> MSRResult<()> {
        match *self {}
    }
}
