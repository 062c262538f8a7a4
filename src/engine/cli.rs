//! CLI command handler: merge settings file and flags into a RunConfig, then index.

use anyhow::{Context, Result};
use log::debug;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::arg_parser::Cli;
use crate::engine::tools::resolve_input_path;
use crate::pipeline::run_with_cancel;
use crate::utils::collexer_toml::{apply_file_to_config, load_collexer_toml};
use crate::utils::setup_logging;
use crate::{RunConfig, RunSummary, ShardSpec, Verbosity};

/// Overwrite config field from a CLI flag when given.
macro_rules! apply_cli_opt {
    ($cli:expr, $cfg:expr, $cli_field:ident => $($cfg_field:ident).+) => {
        if let Some(v) = $cli.$cli_field.clone() {
            $cfg.$($cfg_field).+ = v;
        }
    };
}

/// Build the run config: defaults, then `collexer.toml` in the input directory, then flags.
pub fn build_config(cli: &Cli) -> Result<RunConfig> {
    let mut config = RunConfig::new(cli.input.clone(), PathBuf::new(), String::new());
    if let Some(file) = load_collexer_toml(&resolve_input_path(&cli.input)) {
        apply_file_to_config(&file, &mut config);
    }

    apply_cli_opt!(cli, config, collection => collection);
    apply_cli_opt!(cli, config, index => index);
    apply_cli_opt!(cli, config, generator => generator);
    apply_cli_opt!(cli, config, unique_docid => unique_docid);
    apply_cli_opt!(cli, config, memory_buffer => memory_buffer_mb);
    apply_cli_opt!(cli, config, optimize => optimize);
    apply_cli_opt!(cli, config, similarity => similarity);
    apply_cli_opt!(cli, config, store_contents => generator_opts.store_contents);
    apply_cli_opt!(cli, config, store_raw => generator_opts.store_raw);
    if let Some(t) = cli.threads {
        config.threads = t as usize;
    }
    if let Some(ref w) = cli.whitelist {
        config.whitelist = Some(w.clone());
    }
    if !cli.fields.is_empty() {
        config.generator_opts.fields = cli.fields.clone();
    }
    if let (Some(count), Some(current)) = (cli.shard_count, cli.shard_current) {
        config.shard = Some(ShardSpec::new(count, current)?);
    }
    config.verbosity = Verbosity::from_flags(cli.verbose, cli.quiet);
    config.progress_bar = cli.progress;

    if config.collection.is_empty() {
        anyhow::bail!("no collection given (use --collection or set it in the settings file)");
    }
    if config.index.as_os_str().is_empty() {
        anyhow::bail!("no index path given (use --index or set it in the settings file)");
    }
    Ok(config)
}

/// Index the collection described by `cli`. Ctrl+C requests a best-effort stop; the run
/// then fails without committing.
pub fn handle_run(cli: &Cli) -> Result<RunSummary> {
    setup_logging(Verbosity::from_flags(cli.verbose, cli.quiet));
    let config = build_config(cli)?;

    let cancel_requested = Arc::new(AtomicBool::new(false));
    let cancel_requested_handler = Arc::clone(&cancel_requested);
    ctrlc::set_handler(move || {
        cancel_requested_handler.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;

    debug!("Indexing {}...", config.input.display());
    run_with_cancel(&config, cancel_requested)
}
