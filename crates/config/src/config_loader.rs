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

use config::Config;
use config::Environment;
use config::File;
use config::FileFormat;
use eyre::Context;

use crate::unresolved_config::UnresolvedMSRBatchConfig;
use crate::MSRBatchConfig;

const ENV_PREFIX: &str = "MSRBATCH";
const ENV_SEPARATOR: &str = "__";

/// Loads the TOML config at `path`, `MSRBATCH_` environment variables override it.
///
/// Nested keys in variable names are separated by `__`, a single `_` inside a key
/// stands for `-`: `MSRBATCH_LOGS__LOG_LEVEL=debug` sets `log-level` of `[logs]`.
pub fn load_config(path: &str) -> eyre::Result<MSRBatchConfig> {
    load_config_with_env(path, std::env::vars())
}

pub(crate) fn load_config_with_env(
    path: &str,
    vars: impl IntoIterator<Item = (String, String)>,
) -> eyre::Result<MSRBatchConfig> {
    let config_source = File::with_name(path)
        .required(true)
        .format(FileFormat::Toml);
    let config = Config::builder()
        .add_source(config_source)
        .add_source(environment_source(vars))
        .build()
        .with_context(|| format!("Failed to load config from {path}"))?;

    let config: UnresolvedMSRBatchConfig = config
        .try_deserialize()
        .with_context(|| format!("Failed to parse config at {path}"))?;
    config.resolve(path)
}

fn environment_source(vars: impl IntoIterator<Item = (String, String)>) -> Environment {
    let prefix = format!("{ENV_PREFIX}_");
    let vars = vars
        .into_iter()
        .filter_map(|(name, value)| {
            let key = name
                .strip_prefix(&prefix)?
                .split(ENV_SEPARATOR)
                .map(|part| part.replace('_', "-"))
                .collect::<Vec<_>>()
                .join(ENV_SEPARATOR);
            Some((format!("{prefix}{key}"), value))
        })
        .collect::<config::Map<_, _>>();

    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator(ENV_SEPARATOR)
        .source(Some(vars))
}
