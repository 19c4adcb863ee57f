use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use hdc_runner_lib::app::commands::{
    check_hdc, get_app_info, list_apps, list_targets, preview_launch_command, smoke_execute_launch,
    smoke_stop_exec,
};
use hdc_runner_lib::app::config::load_config;
use hdc_runner_lib::app::hdc::locator::resolve_hdc_program;
use hdc_runner_lib::app::hdc::parse::parse_list_targets;
use hdc_runner_lib::app::hdc::runner::run_hdc;
use hdc_runner_lib::app::launch::{build_launch_uri, command_line_to_args};
use hdc_runner_lib::app::models::ExecEvent;
use hdc_runner_lib::app::state::AppState;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Args {
    connect_key: Option<String>,
    out_dir: Option<PathBuf>,
    json: bool,
    bundle: Option<String>,
}

#[derive(Serialize)]
struct SmokeSummary {
    tool: &'static str,
    status: &'static str,
    trace_id: String,
    connect_key: Option<String>,
    hdc_program: Option<String>,
    out_dir: String,
    artifacts: HashMap<String, String>,
    checks: Vec<SmokeCheck>,
}

#[derive(Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: &'static str, // pass|fail|warn|skip
    duration_ms: u128,
    artifacts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut connect_key = std::env::var("HDC_CONNECT_KEY")
        .ok()
        .filter(|s| !s.trim().is_empty());
    let mut out_dir: Option<PathBuf> = None;
    let mut json = false;
    let mut bundle: Option<String> = None;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--connect-key" => {
                connect_key = it
                    .next()
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty());
                if connect_key.is_none() {
                    return Err("--connect-key requires a value".to_string());
                }
            }
            "--out" => {
                let value = it
                    .next()
                    .ok_or_else(|| "--out requires a value".to_string())?;
                out_dir = Some(PathBuf::from(value));
            }
            "--json" => {
                json = true;
            }
            "--bundle" => {
                let value = it
                    .next()
                    .ok_or_else(|| "--bundle requires a value".to_string())?;
                bundle = Some(value);
            }
            "-h" | "--help" => {
                return Err(
                    "Usage: cargo run --bin smoke -- [--connect-key KEY] [--out DIR] [--json] [--bundle NAME]\n"
                        .to_string(),
                );
            }
            other => return Err(format!("Unknown arg: {other}")),
        }
    }

    Ok(Args {
        connect_key,
        out_dir,
        json,
        bundle,
    })
}

fn ensure_dir(path: &Path) -> Result<(), String> {
    fs::create_dir_all(path)
        .map_err(|err| format!("Failed to create dir {}: {err}", path.display()))
}

fn pick_single_target(hdc_program: &str, trace_id: &str) -> Result<String, String> {
    let args = vec![
        "list".to_string(),
        "targets".to_string(),
        "-v".to_string(),
    ];
    let out = run_hdc(hdc_program, &args, trace_id).map_err(|err| err.to_string())?;
    if out.exit_code.unwrap_or_default() != 0 {
        return Err(format!("hdc list targets failed: {}", out.stderr.trim()));
    }
    let summaries = parse_list_targets(&out.stdout);
    let online: Vec<_> = summaries
        .into_iter()
        .filter(|t| t.status.eq_ignore_ascii_case("connected"))
        .collect();
    if online.is_empty() {
        return Err("No connected hdc targets found.".to_string());
    }
    if online.len() > 1 {
        let keys = online
            .into_iter()
            .map(|t| t.connect_key)
            .collect::<Vec<_>>()
            .join(", ");
        return Err(format!(
            "Multiple connected targets found ({keys}). Set HDC_CONNECT_KEY or pass --connect-key."
        ));
    }
    Ok(online[0].connect_key.clone())
}

fn run_check<F>(checks: &mut Vec<SmokeCheck>, name: &'static str, f: F) -> Result<(), ()>
where
    F: FnOnce() -> Result<
        (Vec<String>, Option<&'static str>, Option<String>),
        (&'static str, String),
    >,
{
    let start = Instant::now();
    match f() {
        Ok((artifacts, error_code, error)) => {
            checks.push(SmokeCheck {
                name,
                status: if error_code.is_some() || error.is_some() {
                    "warn"
                } else {
                    "pass"
                },
                duration_ms: start.elapsed().as_millis(),
                artifacts,
                error_code,
                error,
            });
            Ok(())
        }
        Err((code, err)) => {
            checks.push(SmokeCheck {
                name,
                status: "fail",
                duration_ms: start.elapsed().as_millis(),
                artifacts: vec![],
                error_code: Some(code),
                error: Some(err),
            });
            Err(())
        }
    }
}

fn main() {
    let args = match parse_args() {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };

    let trace_id = Uuid::new_v4().to_string();

    let out_dir = args.out_dir.unwrap_or_else(|| {
        let mut p = std::env::temp_dir();
        p.push(format!("hdc_runner_smoke_{trace_id}"));
        p
    });
    if let Err(err) = ensure_dir(&out_dir) {
        eprintln!("{err}");
        std::process::exit(1);
    }

    let mut artifacts: HashMap<String, String> = HashMap::new();
    let mut checks: Vec<SmokeCheck> = Vec::new();
    let mut status = "pass";
    let app_state = AppState::new();

    // Resolve the hdc program the same way the app does (config-aware).
    let config = match load_config(&trace_id) {
        Ok(cfg) => cfg,
        Err(err) => {
            checks.push(SmokeCheck {
                name: "load_config",
                status: "fail",
                duration_ms: 0,
                artifacts: vec![],
                error_code: Some("ERR_CONFIG"),
                error: Some(err.to_string()),
            });
            status = "fail";
            let summary = SmokeSummary {
                tool: "hdc_runner_backend_smoke",
                status,
                trace_id,
                connect_key: args.connect_key,
                hdc_program: None,
                out_dir: out_dir.to_string_lossy().to_string(),
                artifacts,
                checks,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).unwrap_or_default()
            );
            std::process::exit(1);
        }
    };
    let hdc_program = resolve_hdc_program(&config.hdc.command_path);

    // check_hdc (real command)
    if run_check(&mut checks, "check_hdc", || {
        let resp = check_hdc(Some(hdc_program.clone()), Some(trace_id.clone()))
            .map_err(|err| ("ERR_CHECK_HDC", err.to_string()))?;
        let path = out_dir.join("check_hdc.txt");
        fs::write(&path, &resp.data.version_output)
            .map_err(|err| ("ERR_IO", format!("Failed to write check_hdc output: {err}")))?;
        artifacts.insert("check_hdc".to_string(), path.to_string_lossy().to_string());
        if resp.data.available {
            Ok((vec![path.to_string_lossy().to_string()], None, None))
        } else {
            Err((
                "ERR_HDC_UNAVAILABLE",
                resp.data.error.unwrap_or_else(|| "hdc not available".to_string()),
            ))
        }
    })
    .is_err()
    {
        status = "fail";
    }

    // Determine connect key.
    let connect_key = match args.connect_key.clone() {
        Some(key) => key,
        None => match pick_single_target(&hdc_program, &trace_id) {
            Ok(key) => key,
            Err(err) => {
                checks.push(SmokeCheck {
                    name: "pick_target",
                    status: "fail",
                    duration_ms: 0,
                    artifacts: vec![],
                    error_code: Some("ERR_PICK_TARGET"),
                    error: Some(err),
                });
                status = "fail";
                let summary = SmokeSummary {
                    tool: "hdc_runner_backend_smoke",
                    status,
                    trace_id,
                    connect_key: None,
                    hdc_program: Some(hdc_program),
                    out_dir: out_dir.to_string_lossy().to_string(),
                    artifacts,
                    checks,
                };
                println!(
                    "{}",
                    serde_json::to_string_pretty(&summary).unwrap_or_default()
                );
                std::process::exit(1);
            }
        },
    };

    // list_targets (real command, with detail probes)
    if run_check(&mut checks, "list_targets", || {
        let resp = list_targets(Some(true), Some(trace_id.clone()))
            .map_err(|err| ("ERR_LIST_TARGETS", err.to_string()))?;
        let path = out_dir.join("targets.json");
        let body = serde_json::to_string_pretty(&resp.data)
            .map_err(|err| ("ERR_IO", format!("Failed to serialize targets: {err}")))?;
        fs::write(&path, body)
            .map_err(|err| ("ERR_IO", format!("Failed to write targets: {err}")))?;
        artifacts.insert("targets".to_string(), path.to_string_lossy().to_string());
        Ok((vec![path.to_string_lossy().to_string()], None, None))
    })
    .is_err()
    {
        status = "fail";
    }

    // Preview round-trip: retokenizing the rendered command must yield the
    // argv that executing the preview text unchanged would spawn.
    if run_check(&mut checks, "preview_round_trip", || {
        let params = config.form.launch_params();
        let resp = preview_launch_command(
            connect_key.clone(),
            config.form.bundle_name.clone(),
            config.form.ability_name.clone(),
            params.clone(),
            Some(trace_id.clone()),
        )
        .map_err(|err| ("ERR_PREVIEW", err.to_string()))?;
        let preview = resp.data;
        let retokenized = command_line_to_args(&preview);
        let expected = vec![
            "-t".to_string(),
            connect_key.clone(),
            "shell".to_string(),
            format!(
                "aa start -b {} -a {} -U '{}'",
                config.form.bundle_name,
                config.form.ability_name,
                build_launch_uri(&params)
            ),
        ];
        if retokenized != expected {
            return Err((
                "ERR_PREVIEW_MISMATCH",
                format!("preview tokens {retokenized:?} != spawn args {expected:?}"),
            ));
        }
        let path = out_dir.join("preview.txt");
        fs::write(&path, preview + "\n")
            .map_err(|err| ("ERR_IO", format!("Failed to write preview: {err}")))?;
        artifacts.insert("preview".to_string(), path.to_string_lossy().to_string());
        Ok((vec![path.to_string_lossy().to_string()], None, None))
    })
    .is_err()
    {
        status = "fail";
    }

    // Exec stream start/stop using the same registry logic as the Tauri command.
    // An echo marker proves stdout lines flow through the emitter.
    if run_check(&mut checks, "exec_stream_start_stop", || {
        let marker = format!("hdc-smoke-{trace_id}");
        let captured: Arc<Mutex<Vec<ExecEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let captured_emit = Arc::clone(&captured);
        let emitter: Arc<dyn Fn(ExecEvent) + Send + Sync> = Arc::new(move |event| {
            let mut buf = captured_emit.lock().unwrap_or_else(|p| p.into_inner());
            buf.push(event);
        });

        let edited = format!("hdc -t {connect_key} shell echo {marker}");
        let started = smoke_execute_launch(
            edited,
            &hdc_program,
            &app_state.exec_sessions,
            emitter,
            &trace_id,
        )
        .map_err(|err| ("ERR_EXEC_START", err.to_string()))?;

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut exited = false;
        while Instant::now() < deadline {
            {
                let buf = captured.lock().unwrap_or_else(|p| p.into_inner());
                if buf.iter().any(|event| event.event == "exit") {
                    exited = true;
                    break;
                }
            }
            std::thread::sleep(Duration::from_millis(150));
        }

        let _ = smoke_stop_exec(&started.session_id, &app_state.exec_sessions, &trace_id);

        let buf = captured.lock().unwrap_or_else(|p| p.into_inner()).clone();
        let lines: Vec<String> = buf
            .iter()
            .filter(|event| event.event == "output")
            .flat_map(|event| event.lines.iter().cloned())
            .collect();
        let path = out_dir.join("exec_stream.txt");
        fs::write(&path, lines.join("\n") + "\n")
            .map_err(|err| ("ERR_IO", format!("Failed to write exec stream: {err}")))?;
        artifacts.insert(
            "exec_stream".to_string(),
            path.to_string_lossy().to_string(),
        );

        if !exited {
            return Err((
                "ERR_EXEC_NO_EXIT",
                "Exec session did not report an exit event.".to_string(),
            ));
        }
        if lines.iter().any(|line| line.contains(&marker)) {
            Ok((vec![path.to_string_lossy().to_string()], None, None))
        } else {
            Ok((
                vec![path.to_string_lossy().to_string()],
                Some("WARN_EXEC_NO_MARKER"),
                Some("Exec stream did not capture the marker line.".to_string()),
            ))
        }
    })
    .is_err()
    {
        status = "fail";
    }

    // list_apps (real command)
    if run_check(&mut checks, "list_apps", || {
        let resp = list_apps(connect_key.clone(), Some(trace_id.clone()))
            .map_err(|err| ("ERR_LIST_APPS", err.to_string()))?;
        let path = out_dir.join("apps.json");
        let body = serde_json::to_string_pretty(&resp.data)
            .map_err(|err| ("ERR_IO", format!("Failed to serialize app list: {err}")))?;
        fs::write(&path, body)
            .map_err(|err| ("ERR_IO", format!("Failed to write app list: {err}")))?;
        artifacts.insert("apps".to_string(), path.to_string_lossy().to_string());
        Ok((vec![path.to_string_lossy().to_string()], None, None))
    })
    .is_err()
    {
        status = "fail";
    }

    // get_app_info (optional, needs --bundle)
    if let Some(bundle) = args.bundle.clone() {
        if run_check(&mut checks, "get_app_info", || {
            let resp = get_app_info(connect_key.clone(), bundle.clone(), Some(trace_id.clone()))
                .map_err(|err| ("ERR_APP_INFO", err.to_string()))?;
            let path = out_dir.join("app_info.json");
            let body = serde_json::to_string_pretty(&resp.data)
                .map_err(|err| ("ERR_IO", format!("Failed to serialize app info: {err}")))?;
            fs::write(&path, body)
                .map_err(|err| ("ERR_IO", format!("Failed to write app info: {err}")))?;
            artifacts.insert("app_info".to_string(), path.to_string_lossy().to_string());
            Ok((vec![path.to_string_lossy().to_string()], None, None))
        })
        .is_err()
        {
            status = "fail";
        }
    } else {
        checks.push(SmokeCheck {
            name: "get_app_info",
            status: "skip",
            duration_ms: 0,
            artifacts: vec![],
            error_code: None,
            error: None,
        });
    }

    let summary = SmokeSummary {
        tool: "hdc_runner_backend_smoke",
        status,
        trace_id: trace_id.clone(),
        connect_key: Some(connect_key),
        hdc_program: Some(hdc_program),
        out_dir: out_dir.to_string_lossy().to_string(),
        artifacts,
        checks,
    };

    let output = if args.json {
        serde_json::to_string_pretty(&summary).unwrap_or_else(|_| "{}".to_string())
    } else {
        format!(
            "status: {}\ntrace_id: {}\nout: {}\n",
            summary.status, summary.trace_id, summary.out_dir
        )
    };

    println!("{output}");
    if summary.status != "pass" {
        std::process::exit(1);
    }
}
