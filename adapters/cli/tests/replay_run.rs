use std::{fs, path::PathBuf, process::Command};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("sweepview-cli-{name}-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("scratch directory created");
    dir
}

#[test]
fn replay_run_dumps_each_committed_frame() {
    let dir = scratch_dir("replay");
    let dump = dir.join("model.txt");
    fs::write(&dump, "step 0\n[['0' '0']\n ['X' 'S']]\n").expect("dump written");

    let output = Command::new(env!("CARGO_BIN_EXE_sweepview"))
        .current_dir(&dir)
        .arg("--replay")
        .arg(&dump)
        .args(["--max-ticks", "2", "--interval-ms", "1", "--robots", "2", "--dump"])
        .output()
        .expect("sweepview runs");
    let _ = fs::remove_dir_all(&dir);

    assert!(output.status.success(), "sweepview exited with {}", output.status);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("(row 0, column 0): floor\n"), "{stdout}");
    assert!(stdout.contains("(row 1, column 0): floor obstacle\n"), "{stdout}");
    assert!(stdout.contains("(row 1, column 1): floor robot robot\n"), "{stdout}");
    assert_eq!(stdout.matches("(row 0, column 1): floor\n").count(), 2);
}

#[test]
fn invalid_configuration_aborts_startup() {
    let dir = scratch_dir("config");
    let config = dir.join("sweepview.toml");
    fs::write(&config, "[layout]\ncell_span = 0.0\n").expect("config written");

    let output = Command::new(env!("CARGO_BIN_EXE_sweepview"))
        .current_dir(&dir)
        .args(["--max-ticks", "1"])
        .output()
        .expect("sweepview runs");
    let _ = fs::remove_dir_all(&dir);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cell_span"));
}

#[test]
fn explicit_missing_configuration_aborts_startup() {
    let output = Command::new(env!("CARGO_BIN_EXE_sweepview"))
        .args(["--config", "/nonexistent/sweepview.toml", "--max-ticks", "1"])
        .output()
        .expect("sweepview runs");

    assert!(!output.status.success());
}
