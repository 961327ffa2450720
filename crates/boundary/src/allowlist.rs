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

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::Path;

use msrbatch_msr::WriteMask;

use crate::or_hex::parse_int;
use crate::BoundaryError;
use crate::BoundaryResult;

/// Registers a caller may touch, each with the bits it may change.
///
/// Text format is one `<register> <write-mask>` pair per line, numbers are
/// `0x`-prefixed hex or decimal, `#` starts a comment. A register listed with
/// a zero mask is read only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Allowlist {
    masks: BTreeMap<u32, WriteMask>,
}

impl Allowlist {
    pub fn parse(text: &str) -> BoundaryResult<Self> {
        let mut masks = BTreeMap::new();

        for (line_index, line) in text.lines().enumerate() {
            let line_number = line_index + 1;
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }

            let (register_id, mask) = parse_entry(line_number, line)?;
            match masks.entry(register_id) {
                Entry::Vacant(entry) => {
                    entry.insert(mask);
                }
                Entry::Occupied(_) => {
                    return Err(BoundaryError::DuplicateAllowlistEntry {
                        line: line_number,
                        register_id,
                    })
                }
            }
        }

        Ok(Self { masks })
    }

    pub fn load(path: impl AsRef<Path>) -> BoundaryResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BoundaryError::allowlist_read(path, e))?;
        let allowlist = Self::parse(&text)?;
        tracing::info!(
            "loaded {} allowlist entries from {}",
            allowlist.len(),
            path.display()
        );

        Ok(allowlist)
    }

    /// Returns `None` for registers that aren't listed at all.
    pub fn write_mask(&self, register_id: u32) -> Option<WriteMask> {
        self.masks.get(&register_id).copied()
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, WriteMask)> + '_ {
        self.masks.iter().map(|(register_id, mask)| (*register_id, *mask))
    }
}

fn parse_entry(line_number: usize, line: &str) -> BoundaryResult<(u32, WriteMask)> {
    let mut tokens = line.split_whitespace();
    let (register, mask) = match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(register), Some(mask), None) => (register, mask),
        _ => {
            return Err(BoundaryError::allowlist_syntax(
                line_number,
                format!("expected `<register> <write-mask>`, got `{line}`"),
            ))
        }
    };

    let register_id = parse_int::<u32>(register).map_err(|e| {
        BoundaryError::allowlist_syntax(line_number, format!("invalid register `{register}`: {e}"))
    })?;
    let mask = parse_int::<u64>(mask).map_err(|e| {
        BoundaryError::allowlist_syntax(line_number, format!("invalid write mask `{mask}`: {e}"))
    })?;

    Ok((register_id, WriteMask::new(mask)))
}
