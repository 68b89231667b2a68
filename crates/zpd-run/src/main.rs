//! zpd-run - command-line host for zpd patches
//!
//! Loads the engine config, opens the given patch (plus any configured
//! start-up patches) into one instance and runs a number of DSP blocks
//! with silent input, printing the peak level of each output channel.
//!
//! ## Usage
//!
//! ```text
//! zpd-run [--config PATH] [--blocks N] [PATCH]
//! ```
//!
//! Console output from the patch goes to the logger (`RUST_LOG=debug` shows
//! everything, including log-level posts).

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use zpd_core::config::{default_config_path, load_config};
use zpd_core::{environment, EngineConfig, Instance, Sample};

/// Blocks to run when `--blocks` is not given
const DEFAULT_BLOCKS: usize = 100;

struct Args {
    config: Option<PathBuf>,
    blocks: usize,
    patch: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: None,
        blocks: DEFAULT_BLOCKS,
        patch: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().context("--config needs a path")?;
                args.config = Some(PathBuf::from(path));
            }
            "--blocks" => {
                let count = iter.next().context("--blocks needs a count")?;
                args.blocks = count
                    .parse()
                    .with_context(|| format!("Invalid block count: {}", count))?;
            }
            flag if flag.starts_with("--") => bail!("Unknown flag: {}", flag),
            _ => args.patch = Some(PathBuf::from(arg)),
        }
    }
    Ok(args)
}

/// Split a patch path into `(file name, directory)` for `Instance::load`
fn split_patch_path(path: &Path) -> Result<(String, String)> {
    let name = path
        .file_name()
        .with_context(|| format!("Not a patch file: {:?}", path))?
        .to_string_lossy()
        .to_string();
    let dir = path
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok((name, dir))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args()?;
    let v = environment::version();
    log::info!("zpd-run {} starting up", v);

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let config: EngineConfig = load_config(&config_path);
    config.apply_search_paths();

    let mut instance = Instance::new();

    let mut patches: Vec<PathBuf> = config.patches.clone();
    patches.extend(args.patch.clone());
    if patches.is_empty() {
        bail!("No patch given and none configured in {:?}", config_path);
    }
    for path in &patches {
        let (name, dir) = split_patch_path(path)?;
        let id = instance
            .load(&name, &dir)
            .with_context(|| format!("Failed to open {:?}", path))?;
        if let Some(patch) = instance.patch(id) {
            println!(
                "Opened {} ($0={}, {} objects)",
                patch.name(),
                patch.dollar_zero(),
                patch.object_count()
            );
        }
    }

    let dsp = config.dsp;
    instance
        .prepare_with(&dsp)
        .context("Failed to prepare DSP")?;

    let input_buffers: Vec<Vec<Sample>> = vec![vec![0.0; dsp.block_size]; dsp.inputs];
    let mut output_buffers: Vec<Vec<Sample>> = vec![vec![0.0; dsp.block_size]; dsp.outputs];
    let mut peaks: Vec<Sample> = vec![0.0; dsp.outputs];

    for _ in 0..args.blocks {
        let inputs: Vec<&[Sample]> = input_buffers.iter().map(Vec::as_slice).collect();
        let mut outputs: Vec<&mut [Sample]> =
            output_buffers.iter_mut().map(Vec::as_mut_slice).collect();
        instance.perform(dsp.block_size, &inputs, &mut outputs)?;
        for (peak, output) in peaks.iter_mut().zip(&output_buffers) {
            let block_peak = output.iter().fold(0.0, |m: Sample, s| m.max(s.abs()));
            *peak = peak.max(block_peak);
        }
    }
    instance.release();

    let seconds = (args.blocks * dsp.block_size) as f64 / dsp.sample_rate as f64;
    println!("Ran {} blocks ({:.3} s at {} Hz)", args.blocks, seconds, dsp.sample_rate);
    for (channel, peak) in peaks.iter().enumerate() {
        println!("  out {}: peak {:.4}", channel + 1, peak);
    }
    Ok(())
}
