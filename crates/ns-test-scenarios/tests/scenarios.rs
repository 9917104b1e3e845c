use ns_test_scenarios::scenarios_root;
use ns_tool::{assert_case, discover_case_dirs, TESTCASE_FILE_NAME};

#[test]
fn every_scenario_matches_its_testcase() {
    let dirs = discover_case_dirs(&scenarios_root());
    assert!(!dirs.is_empty(), "expected scenario test cases");

    let failures = dirs
        .iter()
        .filter_map(|dir| {
            assert_case(dir, &dir.join(TESTCASE_FILE_NAME))
                .err()
                .map(|error| format!("{}: {}", dir.display(), error))
        })
        .collect::<Vec<_>>();
    assert!(failures.is_empty(), "failing scenarios:\n{}", failures.join("\n"));
}
