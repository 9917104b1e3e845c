use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};

fn scenario_dirs() -> Vec<std::path::PathBuf> {
    let manifest_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    let scenarios_root = manifest_dir.join("..").join("..").join("scenarios");
    let mut directories = fs::read_dir(&scenarios_root)
        .expect("scenarios root must exist")
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect::<Vec<_>>();
    directories.sort();
    directories
}

#[test]
fn check_passes_for_all_scenarios() {
    let bin = env!("CARGO_BIN_EXE_ns-cli");
    let directories = scenario_dirs();
    assert!(!directories.is_empty(), "expected scenario directories");

    for directory in directories {
        let output = Command::new(bin)
            .arg("check")
            .arg("--scripts-dir")
            .arg(&directory)
            .output()
            .expect("cli should execute");

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(
            output.status.success() && stdout.starts_with("RESULT:OK"),
            "scenario {} failed\nstdout:\n{}\nstderr:\n{}",
            directory.display(),
            stdout,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

#[test]
fn play_reaches_the_end_when_input_keeps_coming() {
    let bin = env!("CARGO_BIN_EXE_ns-cli");
    for directory in scenario_dirs() {
        let state_file = std::env::temp_dir().join(format!(
            "novelscript-smoke-{}.json",
            directory.file_name().unwrap_or_default().to_string_lossy()
        ));
        let mut child = Command::new(bin)
            .arg("play")
            .arg("--scripts-dir")
            .arg(&directory)
            .arg("--state-file")
            .arg(&state_file)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("cli should start");
        child
            .stdin
            .take()
            .expect("stdin should be piped")
            .write_all("\n".repeat(64).as_bytes())
            .expect("stdin should accept input");
        let output = child.wait_with_output().expect("cli should finish");

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(
            stdout.contains("[END]") && stdout.contains("COVERAGE:main|"),
            "scenario {} did not finish\nstdout:\n{}\nstderr:\n{}",
            directory.display(),
            stdout,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}
