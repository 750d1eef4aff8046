use crate::common::{self, TestInfo};
use serial_test::serial;

#[test]
#[serial]
fn test_stack_frames_snapshot() {
    let info = TestInfo::default();
    let mut session = common::prepare_session(info);

    let frames = session.update_stack_frames().unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].level, 0);
    assert_eq!(frames[0].func.as_deref(), Some("compute"));
    assert_eq!(frames[0].file.as_deref(), Some("main.c"));
    assert_eq!(frames[0].line, Some(5));
    assert_eq!(frames[0].address, Some(0x401144));
    assert_eq!(frames[1].func.as_deref(), Some("main"));

    // the snapshot stays accessible afterwards
    assert_eq!(session.all_stack_frames().len(), 2);
}

#[test]
#[serial]
fn test_threads_snapshot() {
    let info = TestInfo::default();
    let mut session = common::prepare_session(info);

    let threads = session.update_threads().unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].id, 1);
    assert_eq!(threads[0].name.as_deref(), Some("app"));
    assert_eq!(threads[0].state.as_deref(), Some("stopped"));
    assert_eq!(session.current_thread(), Some(1));
}

#[test]
#[serial]
fn test_source_files_snapshot() {
    let info = TestInfo::default();
    let mut session = common::prepare_session(info);

    let files = session.update_source_files().unwrap();
    assert_eq!(
        files,
        &["/tmp/main.c".to_string(), "/tmp/util.c".to_string()]
    );
}

#[test]
#[serial]
fn test_variables_snapshot_tolerates_slow_answer() {
    let info = TestInfo::default();
    let mut session = common::prepare_session(info);

    // the stand-in delays this answer, but well within the default bound
    let vars = session.update_variables().unwrap();
    assert_eq!(vars.len(), 2);
    assert_eq!(vars[0].name, "x");
    assert_eq!(vars[0].value.as_deref(), Some("42"));
    assert_eq!(vars[1].r#type.as_deref(), Some("char *"));
}
