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

use cpu_utils::LogicalCoreId;
use msrbatch::Batch;
use msrbatch::OperationMode;
use msrbatch::RegisterOperation;
use msrbatch::WriteMask;

use crate::Allowlist;
use crate::BoundaryError;
use crate::BoundaryResult;
use crate::OrHex;
use crate::RawOpFlags;

/// Version of the request format this crate understands.
pub const PROTOCOL_VERSION: u32 = 1;

/// A batch as the caller describes it, nothing here is trusted yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BatchRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    pub operations: Vec<OperationRequest>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OperationRequest {
    pub core_id: LogicalCoreId,
    pub register: OrHex<u32>,
    #[serde(default)]
    pub mode: ModeRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_value: Option<OrHex<u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_mask: Option<OrHex<u64>>,
}

/// Mode either as raw msr-safe op bits, as flag names (`"WRITE | POLL"`)
/// or spelled out field by field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModeRequest {
    Raw(u16),
    Flags(RawOpFlags),
    Explicit(OperationMode),
}

impl Default for ModeRequest {
    fn default() -> Self {
        ModeRequest::Explicit(OperationMode::READ)
    }
}

impl ModeRequest {
    fn resolve(&self, index: usize) -> BoundaryResult<OperationMode> {
        match *self {
            ModeRequest::Raw(bits) => RawOpFlags::from_bits(bits)
                .map(Into::into)
                .ok_or(BoundaryError::UnknownOpFlags { index, bits }),
            ModeRequest::Flags(flags) => Ok(flags.into()),
            ModeRequest::Explicit(mode) => Ok(mode),
        }
    }
}

impl BatchRequest {
    pub fn from_json(json: &str) -> BoundaryResult<Self> {
        serde_json::from_str(json).map_err(Into::into)
    }

    /// Checks the request against the allowlist and turns it into a batch.
    ///
    /// The whole request is rejected if any operation is not allowed.
    /// Requested write masks are narrowed to what the allowlist permits, a missing
    /// write mask means the whole permitted mask.
    pub fn authorize(self, allowlist: &Allowlist) -> BoundaryResult<Batch> {
        if let Some(requested) = self.version {
            if requested != PROTOCOL_VERSION {
                return Err(BoundaryError::UnsupportedVersion {
                    requested,
                    supported: PROTOCOL_VERSION,
                });
            }
        }

        let operations = self
            .operations
            .into_iter()
            .enumerate()
            .map(|(index, operation)| operation.authorize(index, allowlist))
            .collect::<BoundaryResult<Vec<_>>>()?;

        tracing::debug!("authorized a batch of {} operations", operations.len());
        Ok(Batch::new(operations))
    }
}

impl OperationRequest {
    fn authorize(self, index: usize, allowlist: &Allowlist) -> BoundaryResult<RegisterOperation> {
        let register_id = self
            .register
            .unhex()
            .map_err(|e| BoundaryError::invalid_number(index, "register", e))?;
        let mode = self.mode.resolve(index)?;

        let allowed = allowlist
            .write_mask(register_id)
            .ok_or(BoundaryError::RegisterNotAllowed { index, register_id })?;
        if mode.write && allowed.is_empty() {
            return Err(BoundaryError::WriteNotAllowed { index, register_id });
        }

        let write_mask = match self.write_mask {
            Some(mask) => mask
                .unhex()
                .map(|mask| WriteMask::new(mask).intersect(allowed))
                .map_err(|e| BoundaryError::invalid_number(index, "write-mask", e))?,
            None => allowed,
        };
        let write_value = match self.write_value {
            Some(value) => value
                .unhex()
                .map_err(|e| BoundaryError::invalid_number(index, "write-value", e))?,
            None => 0,
        };

        let operation = RegisterOperation::new(self.core_id, register_id)
            .with_mode(mode)
            .with_write_input(write_value, write_mask);
        Ok(operation)
    }
}
