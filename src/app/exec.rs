use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::warn;

use crate::app::models::ExecEvent;

pub const EXEC_EVENT_NAME: &str = "exec-event";

pub type ExecEmitter = Arc<dyn Fn(ExecEvent) + Send + Sync>;

/// One launched `hdc` invocation with stdout/stderr streamed into the log
/// panel. Lines are batched per stream, at most 50 per event; a batch older
/// than 60 ms is flushed when the next line arrives, or at stream end.
pub struct ExecSession {
    pub session_id: String,
    pub trace_id: String,
    pub command_line: String,
    pub pid: Option<u32>,
    child: Arc<Mutex<Child>>,
    stop_flag: Arc<AtomicBool>,
    emitter: ExecEmitter,
}

impl ExecSession {
    pub fn spawn(
        program: &str,
        args: &[String],
        command_line: String,
        session_id: String,
        trace_id: String,
        emitter: ExecEmitter,
    ) -> Result<Self, std::io::Error> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        let pid = Some(child.id());

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("Failed to capture stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("Failed to capture stderr"))?;

        let stop_flag = Arc::new(AtomicBool::new(false));
        let child = Arc::new(Mutex::new(child));

        spawn_stream_reader(
            StreamSource::Stdout(stdout),
            Arc::clone(&stop_flag),
            Arc::clone(&emitter),
            session_id.clone(),
            trace_id.clone(),
        );
        spawn_stream_reader(
            StreamSource::Stderr(stderr),
            Arc::clone(&stop_flag),
            Arc::clone(&emitter),
            session_id.clone(),
            trace_id.clone(),
        );
        spawn_exit_watcher(
            Arc::clone(&child),
            Arc::clone(&emitter),
            session_id.clone(),
            trace_id.clone(),
        );

        Ok(Self {
            session_id,
            trace_id,
            command_line,
            pid,
            child,
            stop_flag,
            emitter,
        })
    }

    pub fn is_running(&self) -> bool {
        let mut guard = match self.child.lock() {
            Ok(guard) => guard,
            Err(_) => return false,
        };
        matches!(guard.try_wait(), Ok(None))
    }

    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Ok(mut guard) = self.child.lock() {
            let _ = guard.kill();
            let _ = guard.wait();
        }
        (self.emitter)(ExecEvent {
            session_id: self.session_id.clone(),
            event: "stopped".to_string(),
            stream: None,
            lines: Vec::new(),
            exit_code: None,
            trace_id: self.trace_id.clone(),
        });
    }
}

enum StreamSource {
    Stdout(ChildStdout),
    Stderr(ChildStderr),
}

fn spawn_stream_reader(
    source: StreamSource,
    stop_flag: Arc<AtomicBool>,
    emitter: ExecEmitter,
    session_id: String,
    trace_id: String,
) {
    let batch_limit = 50usize;
    let batch_delay = Duration::from_millis(60);

    std::thread::spawn(move || {
        let (stream, reader): (&'static str, Box<dyn BufRead>) = match source {
            StreamSource::Stdout(inner) => ("stdout", Box::new(BufReader::new(inner))),
            StreamSource::Stderr(inner) => ("stderr", Box::new(BufReader::new(inner))),
        };
        let mut pending: Vec<String> = Vec::new();
        let mut last_emit = Instant::now();
        for line_result in reader.lines() {
            if stop_flag.load(Ordering::Relaxed) {
                break;
            }
            let line = match line_result {
                Ok(line) => line,
                Err(err) => {
                    warn!(trace_id = %trace_id, stream, error = %err, "failed to read exec output");
                    break;
                }
            };
            pending.push(line);
            if pending.len() >= batch_limit || last_emit.elapsed() >= batch_delay {
                let batch = std::mem::take(&mut pending);
                (emitter)(ExecEvent {
                    session_id: session_id.clone(),
                    event: "output".to_string(),
                    stream: Some(stream.to_string()),
                    lines: batch,
                    exit_code: None,
                    trace_id: trace_id.clone(),
                });
                last_emit = Instant::now();
            }
        }
        if !pending.is_empty() {
            (emitter)(ExecEvent {
                session_id,
                event: "output".to_string(),
                stream: Some(stream.to_string()),
                lines: pending,
                exit_code: None,
                trace_id,
            });
        }
    });
}

fn spawn_exit_watcher(
    child: Arc<Mutex<Child>>,
    emitter: ExecEmitter,
    session_id: String,
    trace_id: String,
) {
    std::thread::spawn(move || loop {
        let status = {
            let mut guard = match child.lock() {
                Ok(guard) => guard,
                Err(_) => break,
            };
            match guard.try_wait() {
                Ok(Some(status)) => Some(status),
                Ok(None) => None,
                Err(err) => {
                    warn!(trace_id = %trace_id, error = %err, "failed to poll exec process");
                    break;
                }
            }
        };

        if let Some(status) = status {
            (emitter)(ExecEvent {
                session_id,
                event: "exit".to_string(),
                stream: None,
                lines: Vec::new(),
                exit_code: status.code(),
                trace_id,
            });
            break;
        }
        std::thread::sleep(Duration::from_millis(150));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn channel_emitter() -> (ExecEmitter, mpsc::Receiver<ExecEvent>) {
        let (tx, rx) = mpsc::channel::<ExecEvent>();
        let emitter: ExecEmitter = Arc::new(move |event| {
            let _ = tx.send(event);
        });
        (emitter, rx)
    }

    #[test]
    fn exec_session_emits_lines_and_exit() {
        let (emitter, rx) = channel_emitter();

        let (program, args) = if cfg!(windows) {
            (
                "cmd.exe",
                vec![
                    "/C".to_string(),
                    "echo one& echo two 1>&2& exit 3".to_string(),
                ],
            )
        } else {
            (
                "sh",
                vec![
                    "-c".to_string(),
                    "echo one; echo two 1>&2; exit 3".to_string(),
                ],
            )
        };

        let session = ExecSession::spawn(
            program,
            &args,
            format!("{program} (test)"),
            "test-session".to_string(),
            "test-trace".to_string(),
            emitter,
        )
        .expect("spawn exec session");
        assert!(session.pid.is_some());

        let mut stdout_lines: Vec<String> = Vec::new();
        let mut stderr_lines: Vec<String> = Vec::new();
        let mut exit_code = None;
        let start = Instant::now();
        while start.elapsed() < Duration::from_secs(5) {
            let Ok(event) = rx.recv_timeout(Duration::from_millis(250)) else {
                continue;
            };
            match event.event.as_str() {
                "output" => match event.stream.as_deref() {
                    Some("stdout") => stdout_lines.extend(event.lines),
                    Some("stderr") => stderr_lines.extend(event.lines),
                    _ => {}
                },
                "exit" => {
                    exit_code = event.exit_code;
                    break;
                }
                _ => {}
            }
        }

        assert!(stdout_lines.iter().any(|line| line.contains("one")));
        assert!(stderr_lines.iter().any(|line| line.contains("two")));
        assert_eq!(exit_code, Some(3));
    }

    #[test]
    fn stop_kills_long_running_child() {
        let (emitter, rx) = channel_emitter();

        let (program, args) = if cfg!(windows) {
            (
                "cmd.exe",
                vec!["/C".to_string(), "ping -n 30 127.0.0.1 >nul".to_string()],
            )
        } else {
            ("sleep", vec!["30".to_string()])
        };

        let session = ExecSession::spawn(
            program,
            &args,
            format!("{program} (test)"),
            "test-session-stop".to_string(),
            "test-trace".to_string(),
            emitter,
        )
        .expect("spawn exec session");
        assert!(session.is_running());

        session.stop();
        assert!(!session.is_running());

        let start = Instant::now();
        let mut saw_terminal_event = false;
        while start.elapsed() < Duration::from_secs(3) {
            if let Ok(event) = rx.recv_timeout(Duration::from_millis(250)) {
                if event.event == "stopped" || event.event == "exit" {
                    saw_terminal_event = true;
                    break;
                }
            }
        }
        assert!(saw_terminal_event, "expected stopped or exit event");
    }
}
