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

use serde::Deserialize;
use serde::Serialize;

/// An integer given either as a number or as a string,
/// `0x`-prefixed hex or decimal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrHex<T> {
    Data(T),
    String(String),
}

pub trait HexInt: Sized {
    fn from_str_radix(src: &str, radix: u32) -> Result<Self, ParseIntError>;
}

macro_rules! impl_hex_int {
    ($($int:ty),*) => {
        $(impl HexInt for $int {
            fn from_str_radix(src: &str, radix: u32) -> Result<Self, ParseIntError> {
                <$int>::from_str_radix(src, radix)
            }
        })*
    };
}

impl_hex_int!(u16, u32, u64);

impl<T: HexInt> OrHex<T> {
    pub fn unhex(self) -> Result<T, ParseIntError> {
        match self {
            OrHex::Data(data) => Ok(data),
            OrHex::String(s) => parse_int(&s),
        }
    }
}

impl<T> From<&str> for OrHex<T> {
    fn from(value: &str) -> Self {
        OrHex::String(value.to_owned())
    }
}

pub(crate) fn parse_int<T: HexInt>(src: &str) -> Result<T, ParseIntError> {
    let src = src.trim();
    match src.strip_prefix("0x").or_else(|| src.strip_prefix("0X")) {
        Some(hex) => T::from_str_radix(hex, 16),
        None => T::from_str_radix(src, 10),
    }
}
