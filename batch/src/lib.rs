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

mod batch;
pub mod dispatcher;
mod errors;
mod executor;
mod operation;

pub use batch::Batch;
pub use dispatcher::BatchDispatcher;
pub use errors::BatchError;
pub use operation::AuxSample;
pub use operation::AuxSamplePoints;
pub use operation::OperationMode;
pub use operation::RegisterOperation;
pub use operation::AUX_SAMPLE_SLOTS;

pub use cpu_utils::LogicalCoreId;
pub use msrbatch_msr::registers::SideRegisters;
pub use msrbatch_msr::MSRError;
pub use msrbatch_msr::WriteMask;

pub type BatchResult<T> = Result<T, BatchError>;
