use midrive::backend;
use midrive::mi::StreamKind;
use midrive::session::snapshot::{Breakpoint, StopReason};
use midrive::session::{EventHook, Session, SessionConfig, DEFAULT_RESPONSE_TIMEOUT};
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Stand-in for a real gdb: speaks just enough of the MI protocol. The file
/// name must contain "gdb" so backend selection picks the MI family.
const FAKE_GDB: &str = r#"#!/usr/bin/env bash
echo '=thread-group-added,id="i1"'
echo '(gdb) '
while IFS= read -r line; do
  token="${line:0:6}"
  cmd="${line:6}"
  case "$cmd" in
    -exec-run)
      echo "${token}^running"
      echo '*running,thread-id="all"'
      echo '*stopped,reason="breakpoint-hit",disp="keep",bkptno="1",thread-id="1"'
      ;;
    "-break-insert "*)
      loc="${cmd#-break-insert }"
      file="${loc%:*}"
      lineno="${loc##*:}"
      echo "${token}^done,bkpt={number=\"1\",enabled=\"y\",file=\"${file}\",line=\"${lineno}\"}"
      ;;
    -break-delete*)
      echo "${token}^done"
      ;;
    -stack-list-frames)
      echo "${token}^done,stack=[frame={level=\"0\",addr=\"0x0000000000401144\",func=\"compute\",file=\"main.c\",line=\"5\"},frame={level=\"1\",addr=\"0x0000000000401172\",func=\"main\",file=\"main.c\",line=\"12\"}]"
      ;;
    "-stack-list-variables"*)
      sleep 2
      echo "${token}^done,variables=[{name=\"x\",value=\"42\"},{name=\"msg\",value=\"\\\"hi\\\"\",type=\"char *\"}]"
      ;;
    -thread-info)
      echo "${token}^done,threads=[{id=\"1\",target-id=\"Thread 0x1\",name=\"app\",state=\"stopped\"}],current-thread-id=\"1\""
      ;;
    -file-list-exec-source-files)
      echo "${token}^done,files=[{file=\"main.c\",fullname=\"/tmp/main.c\"},{file=\"util.c\",fullname=\"/tmp/util.c\"}]"
      ;;
    -exec-continue)
      echo "${token}^running"
      ;;
    -gdb-exit)
      echo "${token}^exit"
      exit 0
      ;;
    nonsense)
      echo "${token}^error,msg=\"Undefined MI command: nonsense\""
      ;;
    *)
      echo "${token}^done"
      ;;
  esac
  echo '(gdb) '
done
"#;

#[derive(Clone, Default)]
pub struct TestInfo {
    pub stops: Arc<Mutex<Vec<(StopReason, Option<u32>)>>>,
    pub exit: Arc<Mutex<Option<Option<i32>>>>,
    pub failures: Arc<Mutex<Vec<String>>>,
    pub streams: Arc<Mutex<Vec<(StreamKind, String)>>>,
    pub breakpoints: Arc<Mutex<Vec<Breakpoint>>>,
}

#[derive(Default)]
pub struct TestHooks {
    info: TestInfo,
}

impl TestHooks {
    pub fn new(info: TestInfo) -> Self {
        Self { info }
    }
}

impl EventHook for TestHooks {
    fn on_stopped(&self, reason: &StopReason, thread_id: Option<u32>) -> anyhow::Result<()> {
        self.info
            .stops
            .lock()
            .unwrap()
            .push((reason.clone(), thread_id));
        Ok(())
    }

    fn on_process_exit(&self, code: Option<i32>) {
        *self.info.exit.lock().unwrap() = Some(code);
    }

    fn on_breakpoints_changed(&self, breakpoints: &[Breakpoint]) {
        *self.info.breakpoints.lock().unwrap() = breakpoints.to_vec();
    }

    fn on_stream_text(&self, kind: StreamKind, text: &str) {
        self.info
            .streams
            .lock()
            .unwrap()
            .push((kind, text.to_string()));
    }

    fn on_command_failed(&self, msg: &str) {
        self.info.failures.lock().unwrap().push(msg.to_string());
    }
}

pub fn fake_gdb() -> String {
    let path = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("fake-gdb.sh");
    std::fs::write(&path, FAKE_GDB).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path.to_string_lossy().to_string()
}

pub fn prepare_session(info: TestInfo) -> Session<TestHooks> {
    prepare_session_with_timeout(info, DEFAULT_RESPONSE_TIMEOUT)
}

pub fn prepare_session_with_timeout(info: TestInfo, timeout: Duration) -> Session<TestHooks> {
    let program = fake_gdb();
    let config = SessionConfig {
        debugger_program: Some(program.clone()),
        arguments: vec![],
        response_timeout: timeout,
    };
    let mut session = Session::new(
        backend::select(&program).unwrap(),
        config,
        TestHooks::new(info),
    );
    session.launch().unwrap();
    session
}

/// Pump session output until the condition holds (or panic after 5 seconds).
pub fn pump_until<H: EventHook>(
    session: &mut Session<H>,
    what: &str,
    condition: impl Fn(&Session<H>) -> bool,
) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition(session) {
            return;
        }
        session
            .pump_events(Duration::from_millis(50))
            .expect("pump failed");
    }
    panic!("condition not met in time: {what}");
}
