use anyhow::Result;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

/// Return the current Unix epoch in seconds.
pub fn now_epoch_secs() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

/// Return the current Unix epoch in milliseconds. Undo deadlines use this
/// resolution so sub-second windows in tests stay meaningful.
pub fn now_epoch_millis() -> Result<u64> {
    let elapsed = SystemTime::now().duration_since(UNIX_EPOCH)?;
    Ok(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

/// Local timestamp written into the `archived` header field.
pub fn archive_timestamp() -> String {
    chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

pub fn pid_alive(pid: u32) -> bool {
    if cfg!(windows) {
        // The fs2 lock itself is the liveness signal on Windows.
        true
    } else {
        let Ok(status) = Command::new("kill").arg("-0").arg(pid.to_string()).status() else {
            return false;
        };
        status.success()
    }
}
