use crate::common::{self, TestInfo};
use midrive::mi::{ResultClass, StreamKind};
use midrive::session::snapshot::StopReason;
use midrive::session::{Error, ExecutionStatus, Persistence};
use serial_test::serial;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[test]
#[serial]
fn test_launch_and_quit() {
    let info = TestInfo::default();
    let mut session = common::prepare_session(info.clone());
    assert!(session.is_executing());
    assert!(session.process_id().is_some());
    assert_eq!(session.status(), ExecutionStatus::Starting);

    session.quit().unwrap();
    common::pump_until(&mut session, "termination", |s| {
        s.status() == ExecutionStatus::Terminated
    });

    assert!(!session.is_executing());
    assert_eq!(*info.exit.lock().unwrap(), Some(Some(0)));
}

#[test]
#[serial]
fn test_launch_twice_fails() {
    let info = TestInfo::default();
    let mut session = common::prepare_session(info);
    assert!(matches!(session.launch(), Err(Error::AlreadyRun)));
}

#[test]
#[serial]
fn test_run_until_breakpoint() {
    let info = TestInfo::default();
    let mut session = common::prepare_session(info.clone());

    session.insert_breakpoint("main.c", 10).unwrap();
    common::pump_until(&mut session, "breakpoint confirmation", |s| {
        s.all_breakpoints().len() == 1
    });

    session.run().unwrap();
    common::pump_until(&mut session, "stop event", |s| {
        s.status() == ExecutionStatus::Stopped
    });

    assert_eq!(
        *info.stops.lock().unwrap(),
        vec![(StopReason::BreakpointHit, Some(1))]
    );

    session.quit().unwrap();
    common::pump_until(&mut session, "termination", |s| {
        s.status() == ExecutionStatus::Terminated
    });
}

#[test]
#[serial]
fn test_relaunch_resets_token_counter() {
    let info = TestInfo::default();
    let mut session = common::prepare_session(info.clone());

    session.update_source_files().unwrap();
    session.quit().unwrap();
    common::pump_until(&mut session, "termination", |s| {
        s.status() == ExecutionStatus::Terminated
    });

    session.launch().unwrap();
    session.update_source_files().unwrap();

    let echo: Vec<String> = info
        .streams
        .lock()
        .unwrap()
        .iter()
        .filter(|(kind, text)| *kind == StreamKind::Log && text.starts_with("Command:"))
        .map(|(_, text)| text.clone())
        .collect();
    // tokens restart from zero in the new process lifetime
    assert_eq!(
        echo,
        vec![
            "Command:000000-file-list-exec-source-files\n".to_string(),
            "Command:000001-gdb-exit\n".to_string(),
            "Command:000000-file-list-exec-source-files\n".to_string(),
        ]
    );
}

#[test]
#[serial]
fn test_error_result_reaches_completion() {
    let info = TestInfo::default();
    let mut session = common::prepare_session(info);

    let seen: Arc<Mutex<Option<(ResultClass, String)>>> = Arc::default();
    {
        let seen = Arc::clone(&seen);
        session
            .dispatch_command("nonsense".to_string(), Persistence::OneShot, move |_, record| {
                *seen.lock().unwrap() = Some((record.class, record.payload.clone()));
                Ok(())
            })
            .unwrap();
    }

    common::pump_until(&mut session, "error result", |_| {
        seen.lock().unwrap().is_some()
    });
    let (class, payload) = seen.lock().unwrap().clone().unwrap();
    assert_eq!(class, ResultClass::Error);
    assert!(payload.contains("Undefined MI command"));
}

#[test]
#[serial]
fn test_response_timeout_is_not_fatal() {
    let info = TestInfo::default();
    let mut session =
        common::prepare_session_with_timeout(info, Duration::from_millis(300));

    // the stand-in delays this answer past the configured bound
    let err = session.update_variables().unwrap_err();
    assert!(matches!(err, Error::ResponseTimeout(_)));
    assert!(!err.is_fatal());
    assert!(session.is_executing());
}
