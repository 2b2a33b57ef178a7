use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn varc(vault: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("varc");
    cmd.current_dir(vault)
        .env("VARC_HOME", vault.join(".varc"))
        .env("VARC_UNDO_TIMEOUT_SECS", "60")
        .env("VARC_CONFIRM_ARCHIVE", "false")
        .env("VARC_CONFIRM_UNARCHIVE", "false")
        .arg("--vault")
        .arg(vault);
    cmd
}

fn seed_vault(root: &Path) {
    fs::create_dir_all(root.join("Projects/Site")).expect("mkdir projects");
    fs::write(root.join("Projects/plan.md"), "# Plan\n\nship it\n").expect("write plan");
    fs::write(root.join("Projects/Site/home.md"), "home\n").expect("write home");
    fs::write(root.join("Projects/diagram.png"), [0x89, 0x50, 0x4e, 0x47]).expect("write png");
}

#[test]
fn archive_list_then_undo_restores_note() {
    let tmp = tempdir().expect("tempdir");
    let vault = tmp.path();
    seed_vault(vault);

    varc(vault)
        .args(["archive", "Projects/plan.md", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "archived Projects/plan.md -> Archive/plan.md",
        ));

    let archived = fs::read_to_string(vault.join("Archive/plan.md")).expect("read archived");
    assert!(archived.contains("archived_from: Projects/plan.md"));
    assert!(archived.contains("ship it"));
    assert!(!vault.join("Projects/plan.md").exists());

    varc(vault)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("count=1"))
        .stdout(predicate::str::contains("from=Projects/plan.md"));

    varc(vault)
        .arg("undo")
        .assert()
        .success()
        .stdout(predicate::str::contains("reversed archive of plan.md"));

    let restored = fs::read_to_string(vault.join("Projects/plan.md")).expect("read restored");
    assert!(!restored.contains("archived_from"));
    assert!(restored.contains("ship it"));

    varc(vault)
        .arg("undo")
        .assert()
        .failure()
        .stdout(predicate::str::contains("nothing to undo"));
}

#[test]
fn folder_archive_writes_index_and_unarchive_removes_it() {
    let tmp = tempdir().expect("tempdir");
    let vault = tmp.path();
    seed_vault(vault);

    varc(vault)
        .args(["archive", "Projects/Site", "--yes"])
        .assert()
        .success();

    let index = fs::read_to_string(vault.join("Archive/Site/_archive.md")).expect("read index");
    assert!(index.contains("archived_from: Projects/Site"));
    assert!(index.contains("home.md"));

    varc(vault)
        .args(["info", "Archive/Site"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kind=directory"))
        .stdout(predicate::str::contains("archived_from=Projects/Site"));

    varc(vault)
        .args(["unarchive", "Archive/Site", "--yes"])
        .assert()
        .success();

    assert!(vault.join("Projects/Site/home.md").exists());
    assert!(!vault.join("Projects/Site/_archive.md").exists());
    assert!(!vault.join("Archive/Site").exists());
}

#[test]
fn attachment_gets_sidecar_and_unarchive_recreates_missing_folder() {
    let tmp = tempdir().expect("tempdir");
    let vault = tmp.path();
    fs::create_dir_all(vault.join("Media/2024")).expect("mkdir media");
    fs::write(vault.join("Media/2024/clip.mp3"), b"ID3").expect("write clip");

    varc(vault)
        .args(["archive", "Media/2024/clip.mp3", "--yes"])
        .assert()
        .success();
    assert!(vault.join("Archive/clip.mp3._archive.md").exists());

    fs::remove_dir_all(vault.join("Media")).expect("remove media");

    varc(vault)
        .args(["unarchive", "Archive/clip.mp3", "--create-missing", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "unarchived Archive/clip.mp3 -> Media/2024/clip.mp3",
        ));

    assert_eq!(fs::read(vault.join("Media/2024/clip.mp3")).expect("read clip"), b"ID3");
    assert!(!vault.join("Archive/clip.mp3._archive.md").exists());
}

#[test]
fn keep_both_picks_numbered_name_on_collision() {
    let tmp = tempdir().expect("tempdir");
    let vault = tmp.path();
    seed_vault(vault);
    fs::create_dir_all(vault.join("Archive")).expect("mkdir archive");
    fs::write(vault.join("Archive/plan.md"), "older plan\n").expect("write older");

    varc(vault)
        .args(["archive", "Projects/plan.md", "--on-conflict", "keep-both", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-> Archive/plan 2.md"));

    assert_eq!(
        fs::read_to_string(vault.join("Archive/plan.md")).expect("read older"),
        "older plan\n"
    );
    assert!(vault.join("Archive/plan 2.md").exists());
}

#[test]
fn cancel_policy_leaves_everything_in_place() {
    let tmp = tempdir().expect("tempdir");
    let vault = tmp.path();
    seed_vault(vault);
    fs::create_dir_all(vault.join("Archive")).expect("mkdir archive");
    fs::write(vault.join("Archive/plan.md"), "older plan\n").expect("write older");

    varc(vault)
        .args(["archive", "Projects/plan.md", "--on-conflict", "cancel", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("archive of Projects/plan.md cancelled"));

    assert!(vault.join("Projects/plan.md").exists());
}

#[test]
fn precondition_failures_exit_nonzero() {
    let tmp = tempdir().expect("tempdir");
    let vault = tmp.path();
    seed_vault(vault);

    varc(vault)
        .args(["archive", "Projects/missing.md", "--yes"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("not found"));

    varc(vault)
        .args(["unarchive", "Projects/plan.md", "--yes"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("is not archived"));
}

#[test]
fn json_report_is_machine_readable() {
    let tmp = tempdir().expect("tempdir");
    let vault = tmp.path();
    seed_vault(vault);

    let output = varc(vault)
        .args(["--json", "archive", "Projects/plan.md", "--yes"])
        .output()
        .expect("run archive");
    assert!(output.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("report json");
    assert_eq!(report["command"], "archive");
    assert_eq!(report["ok"], true);
}

#[test]
fn missing_vault_reports_coded_error() {
    let tmp = tempdir().expect("tempdir");
    let missing = tmp.path().join("nowhere");

    assert_cmd::cargo::cargo_bin_cmd!("varc")
        .current_dir(tmp.path())
        .env("VARC_HOME", tmp.path().join(".varc"))
        .arg("--vault")
        .arg(&missing)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("E004_VAULT_MISSING"));
}

#[test]
fn audit_log_records_moves() {
    let tmp = tempdir().expect("tempdir");
    let vault = tmp.path();
    seed_vault(vault);

    varc(vault)
        .args(["archive", "Projects/plan.md", "--yes"])
        .assert()
        .success();

    let audit = fs::read_to_string(vault.join(".varc/logs/audit.log")).expect("read audit");
    assert!(audit.contains("\"phase\":\"archive\""));
    assert!(audit.contains("Projects/plan.md -> Archive/plan.md"));
}
