use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ns_api::load_sources_from_dir;
use walkdir::WalkDir;

use crate::{NsToolError, TestCase, TESTCASE_FILE_NAME, TESTCASE_SCHEMA_V1};

pub fn read_sources(case_dir: &Path) -> Result<BTreeMap<String, String>, NsToolError> {
    Ok(load_sources_from_dir(case_dir)?)
}

pub fn read_test_case(case_path: &Path) -> Result<TestCase, NsToolError> {
    let raw = fs::read_to_string(case_path).map_err(|source| NsToolError::ReadFile {
        path: case_path.to_path_buf(),
        source,
    })?;
    let parsed: TestCase = serde_json::from_str(&raw).map_err(|source| NsToolError::ParseCase {
        path: case_path.to_path_buf(),
        source,
    })?;

    if parsed.schema_version != TESTCASE_SCHEMA_V1 {
        return Err(NsToolError::InvalidSchemaVersion {
            expected: TESTCASE_SCHEMA_V1.to_string(),
            found: parsed.schema_version,
        });
    }

    Ok(parsed)
}

/// Directories under `root` holding a test case file, sorted.
pub fn discover_case_dirs(root: &Path) -> Vec<PathBuf> {
    let mut dirs = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == TESTCASE_FILE_NAME)
        .filter_map(|entry| entry.path().parent().map(Path::to_path_buf))
        .collect::<Vec<_>>();
    dirs.sort();
    dirs
}

#[cfg(test)]
mod source_tests {
    use super::*;

    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should move forward")
            .as_nanos();
        std::env::temp_dir().join(format!("ns-tool-{}-{}", name, nanos))
    }

    fn write_file(path: &Path, content: &str) {
        let parent = path.parent().expect("path should have parent");
        fs::create_dir_all(parent).expect("parent dir should be created");
        fs::write(path, content).expect("file should be written");
    }

    #[test]
    fn read_test_case_reports_read_parse_and_schema_errors() {
        let root = temp_dir("case-errors");

        let missing = read_test_case(&root.join("missing.json")).expect_err("missing file");
        assert!(matches!(missing, NsToolError::ReadFile { .. }));

        let broken = root.join("broken.json");
        write_file(&broken, "{");
        let error = read_test_case(&broken).expect_err("broken json");
        assert!(matches!(error, NsToolError::ParseCase { .. }));

        let foreign = root.join("foreign.json");
        write_file(&foreign, r#"{"schemaVersion":"other-case.v1"}"#);
        let error = read_test_case(&foreign).expect_err("foreign schema");
        assert!(matches!(error, NsToolError::InvalidSchemaVersion { .. }));
    }

    #[test]
    fn read_sources_maps_engine_errors() {
        let root = temp_dir("no-sources");
        write_file(&root.join("readme.md"), "nothing");
        let error = read_sources(&root).expect_err("no scripts");
        match error {
            NsToolError::Engine(error) => assert_eq!(error.code, "API_SOURCE_EMPTY"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn discover_case_dirs_finds_nested_cases() {
        let root = temp_dir("discover");
        write_file(&root.join("b").join(TESTCASE_FILE_NAME), "{}");
        write_file(&root.join("a").join("inner").join(TESTCASE_FILE_NAME), "{}");
        write_file(&root.join("c").join("main.nani"), "Hello.");

        let dirs = discover_case_dirs(&root);
        assert_eq!(dirs, vec![root.join("a").join("inner"), root.join("b")]);
    }
}
