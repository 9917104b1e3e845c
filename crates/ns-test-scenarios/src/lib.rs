use std::path::PathBuf;

use ns_tool::TESTCASE_FILE_NAME;

pub fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

pub fn scenarios_root() -> PathBuf {
    workspace_root().join("scenarios")
}

pub fn scenario_dir(name: &str) -> PathBuf {
    scenarios_root().join(name)
}

pub fn testcase_path(name: &str) -> PathBuf {
    scenario_dir(name).join(TESTCASE_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_root_points_to_workspace() {
        assert!(workspace_root().join("Cargo.toml").exists());
    }

    #[test]
    fn scenarios_root_points_to_scenarios_directory() {
        assert!(scenarios_root().is_dir());
    }

    #[test]
    fn testcase_path_joins_default_filename() {
        let path = testcase_path("01-basic");
        assert!(path.ends_with("testcase.json"));
        assert!(path.exists());
    }
}
