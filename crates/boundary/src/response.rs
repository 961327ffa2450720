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
use msrbatch::BatchError;
use msrbatch::BatchResult;
use msrbatch::MSRError;
use msrbatch::OperationMode;
use msrbatch::RegisterOperation;
use msrbatch::WriteMask;
use msrbatch::AUX_SAMPLE_SLOTS;

use crate::PROTOCOL_VERSION;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Ok,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub message: String,
    /// Negative errno.
    pub code: i32,
}

impl From<&MSRError> for ErrorReport {
    fn from(error: &MSRError) -> Self {
        Self {
            message: error.to_string(),
            code: error.code(),
        }
    }
}

impl From<&BatchError> for ErrorReport {
    fn from(error: &BatchError) -> Self {
        Self {
            message: error.to_string(),
            code: error.code(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OperationReport {
    pub core_id: LogicalCoreId,
    pub register: u32,
    pub mode: OperationMode,
    pub write_value: u64,
    pub write_mask: WriteMask,
    pub read_value: Option<u64>,
    pub poll_value: Option<u64>,
    pub aux_samples: [Option<u64>; AUX_SAMPLE_SLOTS],
    pub thermal_status: Option<u64>,
    pub perf_status: Option<u64>,
    pub instructions_retired: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl From<&RegisterOperation> for OperationReport {
    fn from(operation: &RegisterOperation) -> Self {
        Self {
            core_id: operation.core_id(),
            register: operation.register_id(),
            mode: operation.mode(),
            write_value: operation.write_value(),
            write_mask: operation.write_mask(),
            read_value: operation.read_value(),
            poll_value: operation.poll_value(),
            aux_samples: *operation.aux_samples(),
            thermal_status: operation.thermal_status(),
            perf_status: operation.perf_status(),
            instructions_retired: operation.instructions_retired(),
            error: operation.error().as_ref().map(Into::into),
        }
    }
}

/// What a dispatched batch produced, operation by operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BatchResponse {
    pub version: u32,
    pub status: BatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
    pub operations: Vec<OperationReport>,
}

impl BatchResponse {
    pub fn new(batch: &Batch, result: &BatchResult<()>) -> Self {
        let (status, error) = match result {
            Ok(()) => (BatchStatus::Ok, None),
            Err(error) => (BatchStatus::Failed, Some(error.into())),
        };

        Self {
            version: PROTOCOL_VERSION,
            status,
            error,
            operations: batch.operations().iter().map(Into::into).collect(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == BatchStatus::Ok
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use nix::errno::Errno;
    use serde_json::json;

    use super::*;

    #[test]
    fn successful_batch_has_no_error() {
        let batch = Batch::new(vec![RegisterOperation::new(1, 0x10)]);

        let response = BatchResponse::new(&batch, &Ok(()));
        let json = serde_json::to_value(&response).unwrap();

        assert!(response.is_ok());
        assert_eq!(json["status"], json!("ok"));
        assert_eq!(json["version"], json!(PROTOCOL_VERSION));
        assert!(json.get("error").is_none());
        assert_eq!(json["operations"][0]["core-id"], json!(1));
        assert_eq!(json["operations"][0]["register"], json!(16));
        assert_eq!(json["operations"][0]["read-value"], json!(null));
        assert!(json["operations"][0].get("error").is_none());
    }

    #[test]
    fn failure_carries_errno_codes() {
        let batch = Batch::new(vec![RegisterOperation::new(0, 0x10)]);
        let error = MSRError::read_w_no_err(0x10, 0.into(), Errno::EIO);
        let result = Err(BatchError::operation_failed(0, error));

        let response = BatchResponse::new(&batch, &result);

        assert_eq!(response.status, BatchStatus::Failed);
        let report = response.error.unwrap();
        assert_eq!(report.code, -(Errno::EIO as i32));
        assert!(report.message.starts_with("operation #0 on logical core 0 failed"));
    }

    #[test]
    fn mode_is_reported_field_by_field() {
        let batch = Batch::new(vec![RegisterOperation::new(0, 0x611).with_write(0xFF, 0x0F)]);

        let response = BatchResponse::new(&batch, &Ok(()));
        let json = serde_json::to_value(&response).unwrap();

        let operation = &json["operations"][0];
        assert_eq!(operation["mode"]["write"], json!(true));
        assert_eq!(operation["mode"]["read-thermal-status"], json!(false));
        assert_eq!(operation["write-mask"], json!(0x0F));
        assert_eq!(operation["aux-samples"], json!([null, null, null, null]));
    }
}
