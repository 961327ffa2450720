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

#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![deny(
    dead_code,
    nonstandard_style,
    unused_imports,
    unused_mut,
    unused_variables,
    unused_unsafe,
    unreachable_patterns
)]

//! Everything between an untrusted batch description and the dispatcher:
//! the register allowlist, raw msr-safe op codes and the JSON request/response format.

mod allowlist;
mod errors;
mod or_hex;
mod raw_flags;
mod request;
mod response;

pub use allowlist::Allowlist;
pub use errors::BoundaryError;
pub use or_hex::OrHex;
pub use raw_flags::RawOpFlags;
pub use request::BatchRequest;
pub use request::ModeRequest;
pub use request::OperationRequest;
pub use request::PROTOCOL_VERSION;
pub use response::BatchResponse;
pub use response::BatchStatus;
pub use response::ErrorReport;
pub use response::OperationReport;

pub type BoundaryResult<T> = Result<T, BoundaryError>;
