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

use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum BoundaryError {
    #[error("failed to read allowlist {path:?}: {io_error}")]
    AllowlistRead {
        path: PathBuf,
        io_error: std::io::Error,
    },

    #[error("allowlist line {line}: {reason}")]
    AllowlistSyntax { line: usize, reason: String },

    #[error("allowlist line {line}: register {register_id:#x} is already listed")]
    DuplicateAllowlistEntry { line: usize, register_id: u32 },

    #[error("request version {requested} is not supported, expected {supported}")]
    UnsupportedVersion { requested: u32, supported: u32 },

    #[error("operation #{index}: invalid {field}: {source}")]
    InvalidNumber {
        index: usize,
        field: &'static str,
        source: ParseIntError,
    },

    #[error("operation #{index}: unknown op flags {bits:#x}")]
    UnknownOpFlags { index: usize, bits: u16 },

    #[error("operation #{index}: register {register_id:#x} is not in the allowlist")]
    RegisterNotAllowed { index: usize, register_id: u32 },

    #[error("operation #{index}: register {register_id:#x} is read only")]
    WriteNotAllowed { index: usize, register_id: u32 },

    #[error("malformed request: {0}")]
    MalformedRequest(#[from] serde_json::Error),
}

impl BoundaryError {
    pub fn allowlist_read(path: impl Into<PathBuf>, io_error: std::io::Error) -> Self {
        Self::AllowlistRead {
            path: path.into(),
            io_error,
        }
    }

    pub fn allowlist_syntax(line: usize, reason: impl Into<String>) -> Self {
        Self::AllowlistSyntax {
            line,
            reason: reason.into(),
        }
    }

    pub fn invalid_number(index: usize, field: &'static str, source: ParseIntError) -> Self {
        Self::InvalidNumber {
            index,
            field,
            source,
        }
    }
}
