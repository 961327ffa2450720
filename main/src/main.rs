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

use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;

use clap::Parser;
use eyre::WrapErr as _;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use msrbatch::BatchDispatcher;
use msrbatch_boundary::Allowlist;
use msrbatch_boundary::BatchRequest;
use msrbatch_boundary::BatchResponse;
use msrbatch_config::load_config;
use msrbatch_msr::DevMSR;

/// Runs a batch of register operations described in a JSON file
/// and prints the results as JSON.
#[derive(Parser, Debug)]
struct Args {
    #[arg(short, long)]
    config_path: String,

    /// Request file, `-` reads the request from stdin.
    #[arg(short, long)]
    batch: PathBuf,

    /// Dispatches the request this many times, printing a response per run.
    #[arg(short, long, default_value = "1")]
    repeat: NonZeroUsize,
}

fn main() -> eyre::Result<()> {
    let args = Args::parse();
    let config = load_config(args.config_path.as_str())?;

    let filter = EnvFilter::builder()
        .with_env_var("RUST_LOG")
        .with_default_directive(Directive::from(config.logs.log_level))
        .from_env_lossy();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_ids(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .wrap_err("setting global tracing subscriber failed")?;
    tracing_log::LogTracer::init()?;

    let allowlist = Allowlist::load(&config.allowlist_path)
        .wrap_err("allowlist-path value in a config should point to a readable allowlist")?;
    for (register_id, mask) in allowlist.iter() {
        tracing::trace!("allowed register {register_id:#x} with write mask {mask}");
    }
    let batch = read_request(&args.batch)?
        .authorize(&allowlist)
        .wrap_err("request was rejected")?;

    tracing::info!("running batch {:?} {} time(s)", args.batch, args.repeat);

    let backend = DevMSR::new(config.device.dir.clone());
    tracing::info!("using MSR devices under {}", backend.device_dir().display());
    let dispatcher = BatchDispatcher::with_registers(backend, config.registers);
    tracing::debug!("side registers: {:?}", dispatcher.registers());

    let mut failed_runs = 0;
    for run in 0..args.repeat.get() {
        let mut batch = batch.clone();
        let result = dispatcher.dispatch(&mut batch);
        if let Err(error) = &result {
            tracing::warn!("run {run} failed: {error}");
            failed_runs += 1;
        }

        let response = BatchResponse::new(&batch, &result);
        println!(
            "{}",
            response.to_json().wrap_err("serializing a response failed")?
        );
    }

    if failed_runs > 0 {
        eyre::bail!("{failed_runs} of {} runs failed", args.repeat);
    }

    Ok(())
}

fn read_request(path: &Path) -> eyre::Result<BatchRequest> {
    let json = if path.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).wrap_err("reading a request from stdin failed")?
    } else {
        std::fs::read_to_string(path).wrap_err_with(|| format!("reading {path:?} failed"))?
    };

    BatchRequest::from_json(&json).wrap_err_with(|| format!("parsing a request from {path:?} failed"))
}
