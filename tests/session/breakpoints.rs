use crate::common::{self, TestInfo};
use serial_test::serial;

#[test]
#[serial]
fn test_insert_and_remove_breakpoint() {
    let info = TestInfo::default();
    let mut session = common::prepare_session(info.clone());

    session.insert_breakpoint("main.c", 10).unwrap();
    common::pump_until(&mut session, "breakpoint confirmation", |s| {
        s.all_breakpoints().len() == 1
    });

    let bp = &session.all_breakpoints()[0];
    assert_eq!(bp.number, 1);
    assert_eq!(bp.file, "main.c");
    assert_eq!(bp.line, 10);
    assert!(bp.enabled);
    // the hook sees the same authoritative set
    assert_eq!(info.breakpoints.lock().unwrap().len(), 1);

    session.remove_breakpoint(1).unwrap();
    common::pump_until(&mut session, "breakpoint removal", |s| {
        s.all_breakpoints().is_empty()
    });
    assert!(info.breakpoints.lock().unwrap().is_empty());
}

#[test]
#[serial]
fn test_remove_breakpoints_in_file() {
    let info = TestInfo::default();
    let mut session = common::prepare_session(info);

    session.insert_breakpoint("main.c", 10).unwrap();
    common::pump_until(&mut session, "breakpoint confirmation", |s| {
        s.all_breakpoints().len() == 1
    });

    // resolves to one removal per known breakpoint in the file
    session.remove_breakpoints_in_file("main.c").unwrap();
    common::pump_until(&mut session, "breakpoint removal", |s| {
        s.all_breakpoints().is_empty()
    });

    // a file with no breakpoints sends nothing and does not fail
    session.remove_breakpoints_in_file("other.c").unwrap();
}

#[test]
#[serial]
fn test_remove_all_breakpoints() {
    let info = TestInfo::default();
    let mut session = common::prepare_session(info);

    session.insert_breakpoint("main.c", 10).unwrap();
    common::pump_until(&mut session, "breakpoint confirmation", |s| {
        s.all_breakpoints().len() == 1
    });

    session.remove_all_breakpoints().unwrap();
    common::pump_until(&mut session, "breakpoint removal", |s| {
        s.all_breakpoints().is_empty()
    });
}
