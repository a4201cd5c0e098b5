use std::fs;

use sweepview_client::ReplaySource;
use sweepview_system_poller::SnapshotSource;

const DUMP: &str = "\
step 0
[['0' 'X' '2']
 ['S' '0' 'P']]
step 1
[['0' 'X' '1']
 ['0' 'S' 'P']]
";

#[test]
fn replay_serves_each_step_then_holds_the_last() {
    let mut source = ReplaySource::from_dump(DUMP).expect("dump parses");
    assert_eq!(source.len(), 2);

    let first = source.fetch().expect("first step");
    let second = source.fetch().expect("second step");
    let held = source.fetch().expect("last step is held");

    assert_eq!(first.body, "[['0' 'X' '2']\n['S' '0' 'P']]");
    assert_eq!(second.body, "[['0' 'X' '1']\n['0' 'S' 'P']]");
    assert_eq!(held, second);
    assert_eq!(first.robots, None);
    assert_eq!(first.dimensions, None);
}

#[test]
fn replay_steps_parse_as_grids() {
    let mut source = ReplaySource::from_dump(DUMP).expect("dump parses");

    let grid = sweepview_system_parser::parse(&source.fetch().expect("first step").body)
        .expect("dump rows parse");

    assert_eq!(grid.to_string(), "0 X 2\nS 0 P");
}

#[test]
fn replay_loads_dumps_from_disk() {
    let path = std::env::temp_dir().join(format!("sweepview-replay-{}.txt", std::process::id()));
    fs::write(&path, DUMP).expect("dump written");

    let source = ReplaySource::from_path(&path);
    let _ = fs::remove_file(&path);

    assert_eq!(source.expect("dump loads").len(), 2);
}

#[test]
fn missing_dump_reports_its_path() {
    let error = ReplaySource::from_path("/nonexistent/sweepview/model.txt")
        .expect_err("missing file fails");

    assert!(format!("{error:#}").contains("/nonexistent/sweepview/model.txt"));
}
