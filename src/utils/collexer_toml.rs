//! Load `collexer.toml` from the input directory (CLI only). Library callers build a
//! [`RunConfig`](crate::RunConfig) directly.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::utils::config::PackagePaths;
use crate::{RunConfig, ShardSpec, Similarity};

#[derive(Debug, Deserialize)]
pub(crate) struct CollexerToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    index: Option<String>,
    collection: Option<String>,
    generator: Option<String>,
    threads: Option<usize>,
    unique_docid: Option<bool>,
    whitelist: Option<String>,
    memory_buffer: Option<usize>,
    optimize: Option<bool>,
    shard_count: Option<usize>,
    shard_current: Option<usize>,
    similarity: Option<Similarity>,
    fields: Option<Vec<String>>,
    store_contents: Option<bool>,
    store_raw: Option<bool>,
}

/// Load the settings file from `dir` if present. Returns None if missing or unreadable.
pub(crate) fn load_collexer_toml(dir: &Path) -> Option<CollexerToml> {
    let path = dir.join(PackagePaths::get().settings_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_collexer_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

pub(crate) fn parse_collexer_toml(s: &str) -> Result<CollexerToml, toml::de::Error> {
    toml::from_str(s)
}

/// Overwrite config field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $cfg:expr, $sec_field:ident => $($cfg_field:ident).+) => {
        if let Some(v) = $sec.$sec_field.clone() {
            $cfg.$($cfg_field).+ = v;
        }
    };
}

/// Apply file settings to `config` (only fields present in the file). Call before applying CLI.
/// An out-of-range shard pair is logged and ignored.
pub(crate) fn apply_file_to_config(file: &CollexerToml, config: &mut RunConfig) {
    let sec = &file.settings;
    if let Some(ref p) = sec.index {
        config.index = PathBuf::from(p);
    }
    if let Some(ref p) = sec.whitelist {
        config.whitelist = Some(PathBuf::from(p));
    }
    apply_file_opt!(sec, config, collection => collection);
    apply_file_opt!(sec, config, generator => generator);
    apply_file_opt!(sec, config, threads => threads);
    apply_file_opt!(sec, config, unique_docid => unique_docid);
    apply_file_opt!(sec, config, memory_buffer => memory_buffer_mb);
    apply_file_opt!(sec, config, optimize => optimize);
    apply_file_opt!(sec, config, similarity => similarity);
    apply_file_opt!(sec, config, fields => generator_opts.fields);
    apply_file_opt!(sec, config, store_contents => generator_opts.store_contents);
    apply_file_opt!(sec, config, store_raw => generator_opts.store_raw);
    if let (Some(count), Some(current)) = (sec.shard_count, sec.shard_current) {
        match ShardSpec::new(count, current) {
            Ok(shard) => config.shard = Some(shard),
            Err(e) => log::warn!("ignoring shard settings: {}", e),
        }
    }
}
