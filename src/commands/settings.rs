use anyhow::Result;
use std::path::PathBuf;

use crate::commands::{CommandReport, VaultSession, carrier};
use crate::vault::settings::{
    SETTING_KEYS, env_overrides_present, load_file_settings, save_settings, set_value,
};

#[derive(Debug, Clone)]
pub enum SettingsAction {
    Show,
    Set { key: String, value: String },
}

#[derive(Debug, Clone)]
pub struct SettingsOptions {
    pub vault: Option<PathBuf>,
    pub action: SettingsAction,
}

pub fn run(opts: &SettingsOptions) -> Result<CommandReport> {
    let session = VaultSession::open(opts.vault.as_deref())?;
    match &opts.action {
        SettingsAction::Show => show(&session),
        SettingsAction::Set { key, value } => {
            let _lock = session.lock("settings-set")?;
            set(&session, key, value)
        }
    }
}

fn show(session: &VaultSession) -> Result<CommandReport> {
    let mut report = CommandReport::new("settings-show");
    let rendered = serde_json::to_value(&session.settings)?;
    for (key, env_var) in SETTING_KEYS {
        let value = rendered.get(*key).map(ToString::to_string).unwrap_or_default();
        report.detail(format!("{key}={}", value.trim_matches('"')));
        if std::env::var(env_var).is_ok_and(|v| !v.trim().is_empty()) {
            report.detail(format!("{key}.source={env_var}"));
        }
    }
    report.detail(format!(
        "settings_file={} ({})",
        session.paths.settings_file.display(),
        if session.paths.settings_file.exists() { "present" } else { "absent, defaults apply" }
    ));
    Ok(report)
}

fn set(session: &VaultSession, key: &str, value: &str) -> Result<CommandReport> {
    let mut report = CommandReport::new("settings-set");
    let mut file_settings = load_file_settings(&session.paths.settings_file)?;
    // Validate the whole file layer before touching any carrier.
    let before = file_settings.clone();
    set_value(&mut file_settings, key, value)?;

    if key == "carrier_file_name" {
        report.merge(carrier::rename(session, &file_settings.carrier_file_name)?);
    } else if file_settings != before {
        save_settings(&session.paths.settings_file, &file_settings)?;
        report.detail(format!("{key} saved to {}", session.paths.settings_file.display()));
    } else {
        report.detail(format!("{key} unchanged"));
    }

    let shadowed = env_overrides_present();
    for (_, var) in SETTING_KEYS.iter().filter(|(k, _)| *k == key) {
        if shadowed.contains(var) {
            report.detail(format!("note: {var} is set and overrides the saved value"));
        }
    }
    Ok(report)
}
