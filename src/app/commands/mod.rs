use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use chrono::Utc;
use tauri::{AppHandle, Emitter, State};
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::config::{load_config, normalize_config_for_save, save_config, AppConfig};
use crate::app::diagnostics;
use crate::app::error::AppError;
use crate::app::exec::{ExecEmitter, ExecSession, EXEC_EVENT_NAME};
use crate::app::hdc::locator::{normalize_command_path, resolve_hdc_program, validate_hdc_program};
use crate::app::hdc::parse::{
    aa_start_succeeded, bm_clean_succeeded, build_target_detail, install_succeeded,
    output_indicates_failure, parse_bundle_dump, parse_bundle_list, parse_hdc_version,
    parse_list_targets, parse_param_map, tconn_succeeded, uninstall_succeeded,
};
use crate::app::hdc::runner::{run_command_with_timeout, run_hdc};
use crate::app::launch::{
    build_launch_args, build_preview_command, command_line_to_args, LaunchParams,
};
use crate::app::models::{
    BundleInfo, ClearDataResult, CommandResponse, ExecStartResult, HdcInfo, HostCommandResult,
    InstallResult, RunLogExportResult, TargetDetail, TargetInfo,
};
use crate::app::state::AppState;

#[cfg(test)]
mod tests;

fn resolve_trace_id(input: Option<String>) -> String {
    input
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn ensure_non_empty(value: &str, field: &str, trace_id: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(
            format!("{field} is required"),
            trace_id,
        ));
    }
    Ok(())
}

fn get_hdc_program(trace_id: &str) -> Result<String, AppError> {
    let config = load_config(trace_id)?;
    let program = resolve_hdc_program(&config.hdc.command_path);
    if let Err(message) = validate_hdc_program(&program) {
        return Err(AppError::validation(message, trace_id));
    }
    Ok(program)
}

fn append_command_history(command_line: &str, trace_id: &str) {
    if command_line.trim().is_empty() {
        return;
    }
    let mut config = match load_config(trace_id) {
        Ok(config) => config,
        Err(err) => {
            warn!(trace_id = %trace_id, error = %err, "Failed to load config for command history");
            return;
        }
    };
    if !config.command.auto_save_history {
        return;
    }
    if config
        .command_history
        .last()
        .map(|last| last == command_line)
        .unwrap_or(false)
    {
        return;
    }
    config.command_history.push(command_line.to_string());
    if config.command_history.len() > config.command.max_history_size {
        let start = config
            .command_history
            .len()
            .saturating_sub(config.command.max_history_size);
        config.command_history = config.command_history.split_off(start);
    }
    if let Err(err) = save_config(&config, trace_id) {
        warn!(trace_id = %trace_id, error = %err, "Failed to save command history");
    }
}

#[tauri::command(async)]
pub fn get_config(trace_id: Option<String>) -> Result<CommandResponse<AppConfig>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    Ok(CommandResponse {
        trace_id,
        data: config,
    })
}

#[tauri::command(async)]
pub fn save_app_config(
    config: AppConfig,
    trace_id: Option<String>,
) -> Result<CommandResponse<AppConfig>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = normalize_config_for_save(config);
    save_config(&config, &trace_id)?;
    Ok(CommandResponse {
        trace_id,
        data: config,
    })
}

#[tauri::command(async)]
pub fn reset_config(trace_id: Option<String>) -> Result<CommandResponse<AppConfig>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = normalize_config_for_save(AppConfig::default());
    save_config(&config, &trace_id)?;
    Ok(CommandResponse {
        trace_id,
        data: config,
    })
}

#[tauri::command(async)]
pub fn check_hdc(
    command_path: Option<String>,
    trace_id: Option<String>,
) -> Result<CommandResponse<HdcInfo>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    info!(trace_id = %trace_id, "check_hdc");

    let config = load_config(&trace_id)?;
    let program = command_path
        .as_deref()
        .map(normalize_command_path)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| resolve_hdc_program(&config.hdc.command_path));

    if let Err(message) = validate_hdc_program(&program) {
        warn!(trace_id = %trace_id, error = %message, "hdc validation failed");
        return Ok(CommandResponse {
            trace_id,
            data: HdcInfo {
                available: false,
                version_output: String::new(),
                version: None,
                command_path: program,
                error: Some(message),
            },
        });
    }

    let args = vec!["-v".to_string()];
    let output = match run_command_with_timeout(&program, &args, Duration::from_secs(5), &trace_id)
    {
        Ok(output) => output,
        Err(err) => {
            warn!(trace_id = %trace_id, error = %err.error, "hdc check failed");
            return Ok(CommandResponse {
                trace_id,
                data: HdcInfo {
                    available: false,
                    version_output: String::new(),
                    version: None,
                    command_path: program,
                    error: Some(err.error),
                },
            });
        }
    };

    let mut version_output = output.stdout.trim().to_string();
    let stderr = output.stderr.trim();
    if !stderr.is_empty() {
        if !version_output.is_empty() {
            version_output.push('\n');
        }
        version_output.push_str(stderr);
    }

    let available = output.exit_code.unwrap_or_default() == 0;
    let version = parse_hdc_version(&version_output);
    Ok(CommandResponse {
        trace_id,
        data: HdcInfo {
            available,
            version,
            command_path: program,
            error: if available {
                None
            } else if output.stderr.trim().is_empty() {
                Some("hdc command returned a non-zero exit code".to_string())
            } else {
                Some(output.stderr.trim().to_string())
            },
            version_output,
        },
    })
}

#[tauri::command(async)]
pub fn export_diagnostics_bundle(
    output_dir: Option<String>,
    trace_id: Option<String>,
) -> Result<CommandResponse<String>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    info!(trace_id = %trace_id, "export_diagnostics_bundle");

    // Best-effort: diagnostics bundle should still be generated even if config is broken.
    let hdc_program = match load_config(&trace_id) {
        Ok(config) => resolve_hdc_program(&config.hdc.command_path),
        Err(err) => {
            warn!(
                trace_id = %trace_id,
                error = %err,
                "Failed to load config for diagnostics hdc program, falling back to default"
            );
            "hdc".to_string()
        }
    };

    let bundle_path = diagnostics::export_diagnostics_bundle(&hdc_program, output_dir, &trace_id)?;
    Ok(CommandResponse {
        trace_id,
        data: bundle_path.to_string_lossy().to_string(),
    })
}

fn load_target_detail(program: &str, connect_key: &str, trace_id: &str) -> Option<TargetDetail> {
    let args = vec![
        "-t".to_string(),
        connect_key.to_string(),
        "shell".to_string(),
        "param".to_string(),
        "get".to_string(),
    ];
    let output = match run_command_with_timeout(program, &args, Duration::from_secs(5), trace_id) {
        Ok(output) => output,
        Err(err) => {
            warn!(
                trace_id = %trace_id,
                connect_key = %connect_key,
                error = %err,
                "target detail probe failed"
            );
            return None;
        }
    };
    if output.exit_code.unwrap_or_default() != 0 {
        return None;
    }
    let params = parse_param_map(&output.stdout);
    if params.is_empty() {
        return None;
    }
    Some(build_target_detail(connect_key, &params))
}

#[tauri::command(async)]
pub fn list_targets(
    detailed: Option<bool>,
    trace_id: Option<String>,
) -> Result<CommandResponse<Vec<TargetInfo>>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    info!(trace_id = %trace_id, "list_targets");

    let program = get_hdc_program(&trace_id)?;
    let config = load_config(&trace_id)?;
    let args = vec![
        "list".to_string(),
        "targets".to_string(),
        "-v".to_string(),
    ];
    let output = run_hdc(&program, &args, &trace_id)?;
    if output.exit_code.unwrap_or_default() != 0 {
        return Err(AppError::dependency(
            format!("hdc list targets failed: {}", output.stderr),
            &trace_id,
        ));
    }

    let summaries = parse_list_targets(&output.stdout);
    let need_detail = detailed.unwrap_or(config.hdc.detail_on_refresh);
    let mut targets = Vec::with_capacity(summaries.len());

    if need_detail
        && summaries
            .iter()
            .any(|summary| summary.status.eq_ignore_ascii_case("connected"))
    {
        let detail_slots: Arc<Vec<OnceLock<Option<TargetDetail>>>> = Arc::new(
            (0..summaries.len())
                .map(|_| OnceLock::new())
                .collect::<Vec<_>>(),
        );

        let mut handles = Vec::new();
        for (index, summary) in summaries.iter().enumerate() {
            if !summary.status.eq_ignore_ascii_case("connected") {
                continue;
            }

            let connect_key = summary.connect_key.clone();
            let program_spawn = program.clone();
            let trace_spawn = trace_id.clone();
            let detail_slots = Arc::clone(&detail_slots);

            handles.push(std::thread::spawn(move || {
                let detail = load_target_detail(&program_spawn, &connect_key, &trace_spawn);
                let _ = detail_slots[index].set(detail);
            }));
        }

        for handle in handles {
            if handle.join().is_err() {
                warn!(trace_id = %trace_id, "target detail thread panicked");
            }
        }

        for (index, summary) in summaries.into_iter().enumerate() {
            let detail = detail_slots[index].get().cloned().unwrap_or(None);
            targets.push(TargetInfo { summary, detail });
        }
    } else {
        for summary in summaries {
            targets.push(TargetInfo {
                summary,
                detail: None,
            });
        }
    }

    Ok(CommandResponse {
        trace_id,
        data: targets,
    })
}

#[tauri::command(async)]
pub fn connect_target(
    address: String,
    trace_id: Option<String>,
) -> Result<CommandResponse<HostCommandResult>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    ensure_non_empty(&address, "address", &trace_id)?;

    let program = get_hdc_program(&trace_id)?;
    let args = vec!["tconn".to_string(), address.clone()];
    let output = run_command_with_timeout(&program, &args, Duration::from_secs(10), &trace_id)?;
    let combined = output.combined();
    if !tconn_succeeded(&combined)
        && (output.exit_code.unwrap_or_default() != 0 || output_indicates_failure(&combined))
    {
        let detail = if output.stderr.trim().is_empty() {
            output.stdout.trim()
        } else {
            output.stderr.trim()
        };
        return Err(AppError::dependency(
            format!("hdc tconn failed: {detail}"),
            &trace_id,
        ));
    }

    Ok(CommandResponse {
        trace_id,
        data: HostCommandResult {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.exit_code,
        },
    })
}

#[tauri::command(async)]
pub fn preview_launch_command(
    device_id: String,
    bundle_name: String,
    ability_name: String,
    params: LaunchParams,
    trace_id: Option<String>,
) -> Result<CommandResponse<String>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let preview = build_preview_command(&device_id, &bundle_name, &ability_name, &params);
    Ok(CommandResponse {
        trace_id,
        data: preview,
    })
}

fn execute_launch_inner(
    device_id: &str,
    bundle_name: &str,
    ability_name: &str,
    params: &LaunchParams,
    edited_command: Option<String>,
    program: &str,
    sessions: &Mutex<HashMap<String, ExecSession>>,
    emitter: ExecEmitter,
    trace_id: &str,
) -> Result<ExecStartResult, AppError> {
    let edited = edited_command
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    let (args, command_line) = match edited {
        Some(line) => {
            let args = command_line_to_args(&line);
            if args.is_empty() {
                return Err(AppError::validation("command is empty", trace_id));
            }
            (args, line)
        }
        None => {
            ensure_non_empty(device_id, "device_id", trace_id)?;
            ensure_non_empty(bundle_name, "bundle_name", trace_id)?;
            ensure_non_empty(ability_name, "ability_name", trace_id)?;
            (
                build_launch_args(device_id, bundle_name, ability_name, params),
                build_preview_command(device_id, bundle_name, ability_name, params),
            )
        }
    };

    let session_id = Uuid::new_v4().to_string();
    let session = ExecSession::spawn(
        program,
        &args,
        command_line.clone(),
        session_id.clone(),
        trace_id.to_string(),
        emitter,
    )
    .map_err(|err| AppError::dependency(format!("Failed to start {program}: {err}"), trace_id))?;
    let pid = session.pid;

    let mut guard = sessions
        .lock()
        .map_err(|_| AppError::system("Exec session registry locked", trace_id))?;
    guard.retain(|_, existing| existing.is_running());
    guard.insert(session_id.clone(), session);
    drop(guard);

    append_command_history(&command_line, trace_id);

    Ok(ExecStartResult {
        session_id,
        pid,
        command_line,
    })
}

#[tauri::command(async)]
pub fn execute_launch(
    device_id: String,
    bundle_name: String,
    ability_name: String,
    params: LaunchParams,
    edited_command: Option<String>,
    app: AppHandle,
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<ExecStartResult>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    info!(trace_id = %trace_id, device_id = %device_id, "execute_launch");

    let program = get_hdc_program(&trace_id)?;
    let emitter: ExecEmitter = Arc::new(move |event| {
        if let Err(err) = app.emit(EXEC_EVENT_NAME, &event) {
            warn!(error = %err, "failed to emit exec event");
        }
    });
    let result = execute_launch_inner(
        &device_id,
        &bundle_name,
        &ability_name,
        &params,
        edited_command,
        &program,
        &state.exec_sessions,
        emitter,
        &trace_id,
    )?;

    Ok(CommandResponse {
        trace_id,
        data: result,
    })
}

fn stop_exec_inner(
    session_id: &str,
    sessions: &Mutex<HashMap<String, ExecSession>>,
    trace_id: &str,
) -> Result<bool, AppError> {
    ensure_non_empty(session_id, "session_id", trace_id)?;
    let mut guard = sessions
        .lock()
        .map_err(|_| AppError::system("Exec session registry locked", trace_id))?;
    match guard.remove(session_id) {
        Some(session) => {
            session.stop();
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Drives the launch session registry from the smoke binary without a Tauri
/// runtime.
pub fn smoke_execute_launch(
    edited_command: String,
    program: &str,
    sessions: &Mutex<HashMap<String, ExecSession>>,
    emitter: ExecEmitter,
    trace_id: &str,
) -> Result<ExecStartResult, AppError> {
    execute_launch_inner(
        "",
        "",
        "",
        &LaunchParams::default(),
        Some(edited_command),
        program,
        sessions,
        emitter,
        trace_id,
    )
}

pub fn smoke_stop_exec(
    session_id: &str,
    sessions: &Mutex<HashMap<String, ExecSession>>,
    trace_id: &str,
) -> Result<bool, AppError> {
    stop_exec_inner(session_id, sessions, trace_id)
}

#[tauri::command(async)]
pub fn stop_exec(
    session_id: String,
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<bool>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    info!(trace_id = %trace_id, session_id = %session_id, "stop_exec");

    let stopped = stop_exec_inner(&session_id, &state.exec_sessions, &trace_id)?;
    Ok(CommandResponse {
        trace_id,
        data: stopped,
    })
}

#[tauri::command(async)]
pub fn export_run_log(
    lines: Vec<String>,
    output_dir: Option<String>,
    trace_id: Option<String>,
) -> Result<CommandResponse<RunLogExportResult>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    info!(trace_id = %trace_id, line_count = lines.len(), "export_run_log");

    if lines.is_empty() {
        return Err(AppError::validation("log is empty", &trace_id));
    }

    let dir = resolve_export_dir(output_dir, &trace_id);
    fs::create_dir_all(&dir).map_err(|err| {
        AppError::system(
            format!("Failed to create output directory: {err}"),
            &trace_id,
        )
    })?;

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let file_path = Path::new(&dir).join(format!("run_log_{timestamp}.txt"));
    let mut payload = lines.join("\n");
    payload.push('\n');
    fs::write(&file_path, payload)
        .map_err(|err| AppError::system(format!("Failed to write run log: {err}"), &trace_id))?;

    Ok(CommandResponse {
        trace_id,
        data: RunLogExportResult {
            output_path: file_path.to_string_lossy().to_string(),
            line_count: lines.len(),
        },
    })
}

fn resolve_export_dir(output_dir: Option<String>, trace_id: &str) -> String {
    if let Some(dir) = output_dir
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
    {
        return dir;
    }
    match load_config(trace_id) {
        Ok(config) => {
            let configured = config.output_path.trim().to_string();
            if !configured.is_empty() {
                return configured;
            }
        }
        Err(err) => {
            warn!(trace_id = %trace_id, error = %err, "Failed to load config for export dir");
        }
    }
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("hdc_runner")
        .join("run_logs")
        .to_string_lossy()
        .to_string()
}

#[tauri::command(async)]
pub fn list_apps(
    device_id: String,
    trace_id: Option<String>,
) -> Result<CommandResponse<Vec<String>>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    ensure_non_empty(&device_id, "device_id", &trace_id)?;

    let program = get_hdc_program(&trace_id)?;
    let config = load_config(&trace_id)?;
    let timeout = Duration::from_secs(config.hdc.command_timeout_secs.max(1));
    let args = vec![
        "-t".to_string(),
        device_id.clone(),
        "shell".to_string(),
        "bm".to_string(),
        "dump".to_string(),
        "-a".to_string(),
    ];
    let output = run_command_with_timeout(&program, &args, timeout, &trace_id)?;
    if output.exit_code.unwrap_or_default() != 0 {
        return Err(AppError::dependency(
            format!("bm dump failed: {}", output.stderr),
            &trace_id,
        ));
    }

    Ok(CommandResponse {
        trace_id,
        data: parse_bundle_list(&output.stdout),
    })
}

#[tauri::command(async)]
pub fn get_app_info(
    device_id: String,
    bundle_name: String,
    trace_id: Option<String>,
) -> Result<CommandResponse<BundleInfo>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    ensure_non_empty(&device_id, "device_id", &trace_id)?;
    ensure_non_empty(&bundle_name, "bundle_name", &trace_id)?;

    let program = get_hdc_program(&trace_id)?;
    let config = load_config(&trace_id)?;
    let timeout = Duration::from_secs(config.hdc.command_timeout_secs.max(1));
    let args = vec![
        "-t".to_string(),
        device_id.clone(),
        "shell".to_string(),
        "bm".to_string(),
        "dump".to_string(),
        "-n".to_string(),
        bundle_name.clone(),
    ];
    let output = run_command_with_timeout(&program, &args, timeout, &trace_id)?;

    match parse_bundle_dump(&bundle_name, &output.stdout) {
        Some(info) => Ok(CommandResponse {
            trace_id,
            data: info,
        }),
        None => {
            let detail = if output.stderr.trim().is_empty() {
                output.stdout.trim()
            } else {
                output.stderr.trim()
            };
            Err(AppError::dependency(
                format!("bm dump did not return bundle info: {detail}"),
                &trace_id,
            ))
        }
    }
}

#[tauri::command(async)]
pub fn install_package(
    device_id: String,
    package_path: String,
    replace_existing: Option<bool>,
    trace_id: Option<String>,
) -> Result<CommandResponse<InstallResult>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    ensure_non_empty(&device_id, "device_id", &trace_id)?;
    ensure_non_empty(&package_path, "package_path", &trace_id)?;

    let package = Path::new(&package_path);
    if !package.is_file() {
        return Err(AppError::validation(
            format!("Package file not found: {package_path}"),
            &trace_id,
        ));
    }
    let is_package = package
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("hap") || ext.eq_ignore_ascii_case("app"))
        .unwrap_or(false);
    if !is_package {
        return Err(AppError::validation(
            "package_path must point to a .hap or .app file",
            &trace_id,
        ));
    }

    let program = get_hdc_program(&trace_id)?;
    let mut args = vec![
        "-t".to_string(),
        device_id.clone(),
        "install".to_string(),
    ];
    if replace_existing.unwrap_or(false) {
        args.push("-r".to_string());
    }
    args.push(package_path.clone());
    let output = run_command_with_timeout(&program, &args, Duration::from_secs(120), &trace_id)?;
    let combined = output.combined();
    let success = install_succeeded(&combined)
        || (output.exit_code.unwrap_or_default() == 0 && !output_indicates_failure(&combined));

    Ok(CommandResponse {
        trace_id,
        data: InstallResult {
            connect_key: device_id,
            package_path,
            success,
            raw_output: combined,
        },
    })
}

#[tauri::command(async)]
pub fn uninstall_app(
    device_id: String,
    bundle_name: String,
    keep_data: bool,
    trace_id: Option<String>,
) -> Result<CommandResponse<bool>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    ensure_non_empty(&device_id, "device_id", &trace_id)?;
    ensure_non_empty(&bundle_name, "bundle_name", &trace_id)?;

    let program = get_hdc_program(&trace_id)?;
    let mut args = vec![
        "-t".to_string(),
        device_id.clone(),
        "uninstall".to_string(),
    ];
    if keep_data {
        args.push("-k".to_string());
    }
    args.push(bundle_name);
    let output = run_command_with_timeout(&program, &args, Duration::from_secs(30), &trace_id)?;
    let combined = output.combined();
    let success = uninstall_succeeded(&combined)
        || (output.exit_code.unwrap_or_default() == 0 && !output_indicates_failure(&combined));

    Ok(CommandResponse {
        trace_id,
        data: success,
    })
}

#[tauri::command(async)]
pub fn launch_app(
    device_id: String,
    bundle_name: String,
    ability_name: String,
    trace_id: Option<String>,
) -> Result<CommandResponse<bool>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    ensure_non_empty(&device_id, "device_id", &trace_id)?;
    ensure_non_empty(&bundle_name, "bundle_name", &trace_id)?;
    ensure_non_empty(&ability_name, "ability_name", &trace_id)?;

    let program = get_hdc_program(&trace_id)?;
    let args = vec![
        "-t".to_string(),
        device_id.clone(),
        "shell".to_string(),
        "aa".to_string(),
        "start".to_string(),
        "-b".to_string(),
        bundle_name,
        "-a".to_string(),
        ability_name,
    ];
    let output = run_command_with_timeout(&program, &args, Duration::from_secs(10), &trace_id)?;
    let combined = output.combined();
    let success = aa_start_succeeded(&combined)
        || (output.exit_code.unwrap_or_default() == 0 && !output_indicates_failure(&combined));

    Ok(CommandResponse {
        trace_id,
        data: success,
    })
}

#[tauri::command(async)]
pub fn force_stop_app(
    device_id: String,
    bundle_name: String,
    trace_id: Option<String>,
) -> Result<CommandResponse<bool>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    ensure_non_empty(&device_id, "device_id", &trace_id)?;
    ensure_non_empty(&bundle_name, "bundle_name", &trace_id)?;

    let program = get_hdc_program(&trace_id)?;
    let args = vec![
        "-t".to_string(),
        device_id.clone(),
        "shell".to_string(),
        "aa".to_string(),
        "force-stop".to_string(),
        bundle_name,
    ];
    let output = run_command_with_timeout(&program, &args, Duration::from_secs(10), &trace_id)?;
    let combined = output.combined();
    let success =
        output.exit_code.unwrap_or_default() == 0 && !output_indicates_failure(&combined);

    Ok(CommandResponse {
        trace_id,
        data: success,
    })
}

#[tauri::command(async)]
pub fn clear_app_data(
    device_id: String,
    bundle_name: String,
    trace_id: Option<String>,
) -> Result<CommandResponse<ClearDataResult>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    ensure_non_empty(&device_id, "device_id", &trace_id)?;
    ensure_non_empty(&bundle_name, "bundle_name", &trace_id)?;

    let program = get_hdc_program(&trace_id)?;
    let base_args = vec![
        "-t".to_string(),
        device_id.clone(),
        "shell".to_string(),
        "bm".to_string(),
        "clean".to_string(),
        "-n".to_string(),
        bundle_name.clone(),
    ];

    let mut data_args = base_args.clone();
    data_args.push("-d".to_string());
    let data_output =
        run_command_with_timeout(&program, &data_args, Duration::from_secs(20), &trace_id)?;
    let data_combined = data_output.combined();
    let data_cleared = bm_clean_succeeded(&data_combined)
        || (data_output.exit_code.unwrap_or_default() == 0
            && !output_indicates_failure(&data_combined));

    let mut cache_args = base_args;
    cache_args.push("-c".to_string());
    let cache_output =
        run_command_with_timeout(&program, &cache_args, Duration::from_secs(20), &trace_id)?;
    let cache_combined = cache_output.combined();
    let cache_cleared = bm_clean_succeeded(&cache_combined)
        || (cache_output.exit_code.unwrap_or_default() == 0
            && !output_indicates_failure(&cache_combined));

    let mut raw_output = data_combined;
    if !cache_combined.trim().is_empty() {
        if !raw_output.is_empty() && !raw_output.ends_with('\n') {
            raw_output.push('\n');
        }
        raw_output.push_str(&cache_combined);
    }

    Ok(CommandResponse {
        trace_id,
        data: ClearDataResult {
            connect_key: device_id,
            data_cleared,
            cache_cleared,
            raw_output,
        },
    })
}
