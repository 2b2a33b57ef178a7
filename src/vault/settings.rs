use crate::error::VarcError;
use crate::vault::engine::EngineOptions;
use crate::vault::record::CodecOptions;
use crate::vault::resolver::normalize;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub const MAX_UNDO_TIMEOUT_SECS: u64 = 3_600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub archive_folder: String,
    pub confirm_before_archive: bool,
    pub confirm_before_unarchive: bool,
    pub undo_timeout_secs: u64,
    pub show_in_menu: bool,
    pub carrier_file_name: String,
    pub record_contents_in_index: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            archive_folder: "Archive".to_string(),
            confirm_before_archive: false,
            confirm_before_unarchive: true,
            undo_timeout_secs: 5,
            show_in_menu: true,
            carrier_file_name: "_archive.md".to_string(),
            record_contents_in_index: true,
        }
    }
}

impl Settings {
    pub fn codec_options(&self) -> CodecOptions {
        CodecOptions {
            carrier_file_name: self.carrier_file_name.clone(),
            record_contents: self.record_contents_in_index,
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            archive_root: self.archive_folder.clone(),
            confirm_archive: self.confirm_before_archive,
            confirm_unarchive: self.confirm_before_unarchive,
            undo_window_secs: self.undo_timeout_secs,
            codec: self.codec_options(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PartialSettings {
    archive_folder: Option<String>,
    confirm_before_archive: Option<bool>,
    confirm_before_unarchive: Option<bool>,
    undo_timeout_secs: Option<u64>,
    show_in_menu: Option<bool>,
    carrier_file_name: Option<String>,
    record_contents_in_index: Option<bool>,
}

/// Setting keys accepted by `settings set`, paired with their env override.
pub const SETTING_KEYS: &[(&str, &str)] = &[
    ("archive_folder", "VARC_ARCHIVE_FOLDER"),
    ("confirm_before_archive", "VARC_CONFIRM_ARCHIVE"),
    ("confirm_before_unarchive", "VARC_CONFIRM_UNARCHIVE"),
    ("undo_timeout_secs", "VARC_UNDO_TIMEOUT_SECS"),
    ("show_in_menu", "VARC_SHOW_IN_MENU"),
    ("carrier_file_name", "VARC_CARRIER_FILE_NAME"),
    ("record_contents_in_index", "VARC_RECORD_CONTENTS"),
];

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "true" | "TRUE" | "yes" | "on" => Some(true),
        "0" | "false" | "FALSE" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn lookup_or_bool(lookup: &dyn Fn(&str) -> Option<String>, var: &str, fallback: bool) -> bool {
    lookup(var).and_then(|v| parse_bool(&v)).unwrap_or(fallback)
}

fn lookup_or_u64(lookup: &dyn Fn(&str) -> Option<String>, var: &str, fallback: u64) -> u64 {
    lookup(var)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(fallback)
}

fn lookup_or_string(lookup: &dyn Fn(&str) -> Option<String>, var: &str, fallback: &str) -> String {
    match lookup(var) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn apply_overrides(cfg: &mut Settings, lookup: &dyn Fn(&str) -> Option<String>) {
    cfg.archive_folder = lookup_or_string(lookup, "VARC_ARCHIVE_FOLDER", &cfg.archive_folder);
    cfg.confirm_before_archive =
        lookup_or_bool(lookup, "VARC_CONFIRM_ARCHIVE", cfg.confirm_before_archive);
    cfg.confirm_before_unarchive =
        lookup_or_bool(lookup, "VARC_CONFIRM_UNARCHIVE", cfg.confirm_before_unarchive);
    cfg.undo_timeout_secs = lookup_or_u64(lookup, "VARC_UNDO_TIMEOUT_SECS", cfg.undo_timeout_secs);
    cfg.show_in_menu = lookup_or_bool(lookup, "VARC_SHOW_IN_MENU", cfg.show_in_menu);
    cfg.carrier_file_name =
        lookup_or_string(lookup, "VARC_CARRIER_FILE_NAME", &cfg.carrier_file_name);
    cfg.record_contents_in_index =
        lookup_or_bool(lookup, "VARC_RECORD_CONTENTS", cfg.record_contents_in_index);
}

fn env_lookup(var: &str) -> Option<String> {
    env::var(var).ok()
}

/// Env override variables currently set, for `status`.
pub fn env_overrides_present() -> Vec<&'static str> {
    SETTING_KEYS
        .iter()
        .map(|(_, var)| *var)
        .filter(|var| env_lookup(var).is_some_and(|v| !v.trim().is_empty()))
        .collect()
}

fn invalid(message: impl Into<String>) -> anyhow::Error {
    VarcError::InvalidSettings(message.into()).into()
}

pub fn validate_carrier_name(name: &str) -> Result<()> {
    if name.contains(['/', '\\']) {
        return Err(invalid(format!("carrier file name must not contain a path separator: {name}")));
    }
    if name.starts_with('.') {
        return Err(invalid(format!("carrier file name must not start with a dot: {name}")));
    }
    match name.strip_suffix(".md") {
        Some(stem) if !stem.is_empty() => Ok(()),
        _ => Err(invalid(format!("carrier file name must end in .md: {name}"))),
    }
}

/// Check invariants and normalize the archive folder path in place.
fn validate(cfg: &mut Settings) -> Result<()> {
    let folder = normalize(&cfg.archive_folder).map_err(|err| invalid(err.to_string()))?;
    if folder.is_empty() {
        return Err(invalid("archive_folder cannot be the vault root"));
    }
    if folder.split('/').any(|segment| segment.starts_with('.')) {
        return Err(invalid(format!("archive_folder cannot live in a dot-folder: {folder}")));
    }
    cfg.archive_folder = folder;
    validate_carrier_name(&cfg.carrier_file_name)?;
    if cfg.undo_timeout_secs > MAX_UNDO_TIMEOUT_SECS {
        return Err(invalid(format!(
            "undo_timeout_secs must be <= {MAX_UNDO_TIMEOUT_SECS}"
        )));
    }
    Ok(())
}

/// Defaults overlaid with the settings file only; what `settings set` edits.
pub fn load_file_settings(path: &Path) -> Result<Settings> {
    let mut cfg = Settings::default();
    if !path.exists() {
        return Ok(cfg);
    }
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let parsed: PartialSettings = toml::from_str(&raw)
        .map_err(|err| invalid(format!("failed to parse {}: {err}", path.display())))?;

    if let Some(v) = parsed.archive_folder {
        cfg.archive_folder = v;
    }
    if let Some(v) = parsed.confirm_before_archive {
        cfg.confirm_before_archive = v;
    }
    if let Some(v) = parsed.confirm_before_unarchive {
        cfg.confirm_before_unarchive = v;
    }
    if let Some(v) = parsed.undo_timeout_secs {
        cfg.undo_timeout_secs = v;
    }
    if let Some(v) = parsed.show_in_menu {
        cfg.show_in_menu = v;
    }
    if let Some(v) = parsed.carrier_file_name {
        cfg.carrier_file_name = v;
    }
    if let Some(v) = parsed.record_contents_in_index {
        cfg.record_contents_in_index = v;
    }
    Ok(cfg)
}

fn load_with(path: &Path, lookup: &dyn Fn(&str) -> Option<String>) -> Result<Settings> {
    let mut cfg = load_file_settings(path)?;
    apply_overrides(&mut cfg, lookup);
    validate(&mut cfg)?;
    Ok(cfg)
}

/// Defaults, then the settings file, then `VARC_*` env overrides.
pub fn load_settings(path: &Path) -> Result<Settings> {
    load_with(path, &env_lookup)
}

/// Apply `value` to `key` on the file layer, validating the result.
pub fn set_value(cfg: &mut Settings, key: &str, value: &str) -> Result<()> {
    let bool_value = || {
        parse_bool(value).ok_or_else(|| invalid(format!("{key} expects true or false, got {value}")))
    };
    match key {
        "archive_folder" => cfg.archive_folder = value.to_string(),
        "confirm_before_archive" => cfg.confirm_before_archive = bool_value()?,
        "confirm_before_unarchive" => cfg.confirm_before_unarchive = bool_value()?,
        "undo_timeout_secs" => {
            cfg.undo_timeout_secs = value
                .trim()
                .parse()
                .map_err(|_| invalid(format!("{key} expects a number of seconds, got {value}")))?
        }
        "show_in_menu" => cfg.show_in_menu = bool_value()?,
        "carrier_file_name" => cfg.carrier_file_name = value.trim().to_string(),
        "record_contents_in_index" => cfg.record_contents_in_index = bool_value()?,
        other => {
            let known = SETTING_KEYS.iter().map(|(k, _)| *k).collect::<Vec<_>>().join(", ");
            return Err(invalid(format!("unknown setting `{other}` (known: {known})")));
        }
    }
    validate(cfg)
}

/// Write the settings file atomically.
pub fn save_settings(path: &Path, cfg: &Settings) -> Result<()> {
    let dir = path
        .parent()
        .with_context(|| format!("settings path has no parent: {}", path.display()))?;
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let data = toml::to_string_pretty(cfg).context("failed to render settings")?;
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    tmp.write_all(data.as_bytes())
        .context("failed to write settings")?;
    tmp.persist(path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}
