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

//! This crate provides access to model-specific registers of particular logical cores.
//! On Linux the registers are reached through the `/dev/cpu/<N>/msr` device of the msr
//! kernel module, for everything else the device backend refuses to attach.

#[cfg(all(target_arch = "x86_64", target_os = "linux"))]
#[path = "linux_x86_64/mod.rs"]
mod msr_impl;
#[cfg(not(all(target_arch = "x86_64", target_os = "linux")))]
#[path = "other/mod.rs"]
mod msr_impl;

mod backend;
mod errors;
mod mask;
pub mod registers;

pub use backend::CoreAccess;
pub use backend::MSRBackend;
pub use errors::MSRError;
pub use mask::WriteMask;
pub use msr_impl::*;

pub use cpu_utils::LogicalCoreId;

pub type MSRResult<T> = Result<T, MSRError>;
