use super::*;

use std::sync::mpsc;
use std::time::Instant;

use crate::app::config::LaunchFormSettings;
use crate::app::launch::build_launch_uri;

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    crate::app::config::config_env_lock()
}

fn noop_emitter() -> ExecEmitter {
    Arc::new(|_event| {})
}

fn long_running_session(session_id: &str) -> ExecSession {
    let (program, args) = if cfg!(windows) {
        (
            "cmd.exe",
            vec![
                "/C".to_string(),
                "ping 127.0.0.1 -n 30".to_string(),
            ],
        )
    } else {
        ("sh", vec!["-c".to_string(), "sleep 30".to_string()])
    };
    ExecSession::spawn(
        program,
        &args,
        "hdc shell sleep".to_string(),
        session_id.to_string(),
        "trace-spawn".to_string(),
        noop_emitter(),
    )
    .expect("spawn long running child")
}

#[test]
fn execute_launch_inner_rejects_empty_device_id() {
    let sessions = Mutex::new(HashMap::new());

    let err = execute_launch_inner(
        " ",
        "com.extscreen.runtime",
        "EntryAbility",
        &LaunchParams::default(),
        None,
        "hdc",
        &sessions,
        noop_emitter(),
        "trace-1",
    )
    .expect_err("expected error");

    assert_eq!(err.code, "ERR_VALIDATION");
    assert_eq!(err.trace_id, "trace-1");
    assert!(err.error.contains("device_id"));
}

#[test]
fn execute_launch_inner_rejects_tool_name_only_edited_command() {
    let sessions = Mutex::new(HashMap::new());

    let err = execute_launch_inner(
        "FMR0223C13000649",
        "com.extscreen.runtime",
        "EntryAbility",
        &LaunchParams::default(),
        Some("hdc".to_string()),
        "hdc",
        &sessions,
        noop_emitter(),
        "trace-2",
    )
    .expect_err("expected error");

    assert_eq!(err.code, "ERR_VALIDATION");
    assert!(err.error.to_lowercase().contains("command is empty"));
}

#[test]
fn execute_launch_inner_treats_blank_edited_command_as_absent() {
    let sessions = Mutex::new(HashMap::new());

    let err = execute_launch_inner(
        " ",
        "com.extscreen.runtime",
        "EntryAbility",
        &LaunchParams::default(),
        Some("   ".to_string()),
        "hdc",
        &sessions,
        noop_emitter(),
        "trace-3",
    )
    .expect_err("expected error");

    assert_eq!(err.code, "ERR_VALIDATION");
    assert!(err.error.contains("device_id"));
}

// The preview collapses the remote part into one quoted segment, so it
// retokenizes into the four-token argv a pass-through execution spawns.
#[test]
fn preview_for_default_form_retokenizes_into_spawn_args() {
    let params = LaunchFormSettings::default().launch_params();
    let preview = build_preview_command(
        "FMR0223C13000649",
        "com.extscreen.runtime",
        "EntryAbility",
        &params,
    );

    let expected = vec![
        "-t".to_string(),
        "FMR0223C13000649".to_string(),
        "shell".to_string(),
        format!(
            "aa start -b com.extscreen.runtime -a EntryAbility -U '{}'",
            build_launch_uri(&params)
        ),
    ];
    assert_eq!(command_line_to_args(&preview), expected);
}

#[test]
fn execute_launch_inner_streams_edited_command_and_saves_history() {
    let _guard = env_lock();
    let tmp = tempfile::TempDir::new().expect("tmp");
    let config_path = tmp.path().join("config.json");
    std::env::set_var("HDC_RUNNER_CONFIG_PATH", &config_path);

    let (program, edited) = if cfg!(windows) {
        ("cmd.exe", "hdc /C \"echo alpha && echo beta\"")
    } else {
        ("sh", "hdc -c 'echo alpha && echo beta'")
    };

    let sessions = Mutex::new(HashMap::new());
    let (tx, rx) = mpsc::channel();
    let emitter: ExecEmitter = Arc::new(move |event| {
        let _ = tx.send(event);
    });

    let result = execute_launch_inner(
        "",
        "",
        "",
        &LaunchParams::default(),
        Some(edited.to_string()),
        program,
        &sessions,
        emitter,
        "trace-4",
    )
    .expect("launch");

    assert_eq!(result.command_line, edited);
    assert!(!result.session_id.is_empty());
    {
        let guard = sessions.lock().expect("registry");
        assert!(guard.contains_key(&result.session_id));
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut stdout_lines: Vec<String> = Vec::new();
    let mut exit_code = None;
    while Instant::now() < deadline {
        let event = match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(event) => event,
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };
        match event.event.as_str() {
            "output" => {
                if event.stream.as_deref() == Some("stdout") {
                    stdout_lines.extend(event.lines);
                }
            }
            "exit" => {
                exit_code = event.exit_code;
                break;
            }
            _ => {}
        }
    }

    assert_eq!(exit_code, Some(0));
    assert!(stdout_lines.iter().any(|line| line.contains("alpha")));
    assert!(stdout_lines.iter().any(|line| line.contains("beta")));

    let config = load_config("trace-4").expect("load config");
    assert_eq!(config.command_history.last().map(String::as_str), Some(edited));

    std::env::remove_var("HDC_RUNNER_CONFIG_PATH");
}

#[test]
fn stop_exec_inner_rejects_empty_session_id() {
    let sessions = Mutex::new(HashMap::new());
    let err = stop_exec_inner("  ", &sessions, "trace-5").expect_err("expected err");
    assert_eq!(err.code, "ERR_VALIDATION");
    assert_eq!(err.trace_id, "trace-5");
}

#[test]
fn stop_exec_inner_reports_missing_session() {
    let sessions = Mutex::new(HashMap::new());
    let stopped = stop_exec_inner("absent", &sessions, "trace-6").expect("stop ok");
    assert!(!stopped);
}

#[test]
fn stop_exec_inner_stops_and_removes_session() {
    let sessions = Mutex::new(HashMap::new());
    let session = long_running_session("session-1");
    assert!(session.is_running());
    sessions
        .lock()
        .expect("registry")
        .insert("session-1".to_string(), session);

    let stopped = stop_exec_inner("session-1", &sessions, "trace-7").expect("stop ok");
    assert!(stopped);

    let guard = sessions.lock().expect("registry");
    assert!(!guard.contains_key("session-1"));
}

#[test]
fn append_command_history_dedupes_and_caps() {
    let _guard = env_lock();
    let tmp = tempfile::TempDir::new().expect("tmp");
    let config_path = tmp.path().join("config.json");
    std::env::set_var("HDC_RUNNER_CONFIG_PATH", &config_path);

    let mut config = AppConfig::default();
    config.command.max_history_size = 3;
    save_config(&config, "trace-8").expect("seed config");

    for command in ["a", "b", "c", "d", "d"] {
        append_command_history(command, "trace-8");
    }

    let config = load_config("trace-8").expect("load config");
    assert_eq!(config.command_history, vec!["b", "c", "d"]);

    std::env::remove_var("HDC_RUNNER_CONFIG_PATH");
}

#[test]
fn reset_config_persists_and_returns_defaults() {
    let _guard = env_lock();
    let tmp = tempfile::TempDir::new().expect("tmp");
    let config_path = tmp.path().join("config.json");
    std::env::set_var("HDC_RUNNER_CONFIG_PATH", &config_path);

    let mut config = AppConfig::default();
    config.form.bundle_name = "com.example.other".to_string();
    config.command_history.push("hdc tconn 127.0.0.1:5555".to_string());
    save_config(&config, "trace-11").expect("seed config");

    let response = reset_config(Some("trace-11".to_string())).expect("reset");
    assert_eq!(response.trace_id, "trace-11");
    assert_eq!(response.data.form, LaunchFormSettings::default());
    assert!(response.data.command_history.is_empty());

    let reloaded = load_config("trace-11").expect("load config");
    assert_eq!(reloaded.form.bundle_name, "com.extscreen.runtime");
    assert!(reloaded.command_history.is_empty());
    assert_eq!(reloaded.version, env!("CARGO_PKG_VERSION"));

    std::env::remove_var("HDC_RUNNER_CONFIG_PATH");
}

#[test]
fn export_run_log_writes_lines_to_requested_dir() {
    let tmp = tempfile::TempDir::new().expect("tmp");
    let lines = vec!["one".to_string(), "two".to_string()];

    let response = export_run_log(
        lines,
        Some(tmp.path().to_string_lossy().to_string()),
        Some("trace-9".to_string()),
    )
    .expect("export");

    assert_eq!(response.trace_id, "trace-9");
    assert_eq!(response.data.line_count, 2);
    let content = fs::read_to_string(&response.data.output_path).expect("read export");
    assert_eq!(content, "one\ntwo\n");
}

#[test]
fn export_run_log_rejects_empty_log() {
    let err = export_run_log(Vec::new(), None, Some("trace-10".to_string()))
        .expect_err("expected err");
    assert_eq!(err.code, "ERR_VALIDATION");
    assert_eq!(err.trace_id, "trace-10");
}

#[test]
fn resolve_trace_id_keeps_caller_value() {
    assert_eq!(resolve_trace_id(Some("abc".to_string())), "abc");
    assert!(!resolve_trace_id(Some("  ".to_string())).is_empty());
    assert!(!resolve_trace_id(None).is_empty());
}
