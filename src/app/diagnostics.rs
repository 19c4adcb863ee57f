use crate::app::config::{load_config, AppConfig};
use crate::app::error::AppError;
use crate::app::hdc::parse::{parse_hdc_version, parse_list_targets};
use crate::app::hdc::runner::run_hdc;
use crate::app::models::TargetSummary;
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;
use zip::write::FileOptions;

#[derive(Debug, Serialize)]
struct DiagnosticsManifest {
    app_version: &'static str,
    os: &'static str,
    arch: &'static str,
    timestamp_utc: String,
    trace_id: String,
}

#[derive(Debug, Serialize)]
struct ToolPayload {
    raw_output: String,
    version: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct TargetsPayload {
    parsed: Vec<TargetSummary>,
    raw_stdout: String,
    raw_stderr: String,
    exit_code: Option<i32>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct DiagnosticsPayload {
    manifest: DiagnosticsManifest,
    config: Option<AppConfig>,
    tool: ToolPayload,
    targets: TargetsPayload,
}

fn resolve_output_dir(config: Option<&AppConfig>, output_dir: Option<String>) -> String {
    if let Some(dir) = output_dir
        .as_ref()
        .map(|value| value.trim())
        .filter(|v| !v.is_empty())
    {
        return dir.to_string();
    }
    if let Some(config) = config {
        if !config.output_path.trim().is_empty() {
            return config.output_path.clone();
        }
    }
    std::env::temp_dir()
        .join("hdc_runner_diagnostics")
        .to_string_lossy()
        .to_string()
}

pub fn sanitize_filename_component(value: &str) -> String {
    value
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

pub fn export_diagnostics_bundle(
    hdc_program: &str,
    output_dir: Option<String>,
    trace_id: &str,
) -> Result<PathBuf, AppError> {
    let config = match load_config(trace_id) {
        Ok(config) => Some(config),
        Err(err) => {
            warn!(trace_id = %trace_id, error = %err, "Failed to load config for diagnostics");
            None
        }
    };

    let resolved_dir = resolve_output_dir(config.as_ref(), output_dir);
    fs::create_dir_all(&resolved_dir).map_err(|err| {
        AppError::system(format!("Failed to create output dir: {err}"), trace_id)
    })?;

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
    let safe_trace = sanitize_filename_component(trace_id);
    let trace_short = safe_trace.chars().take(8).collect::<String>();
    let filename = format!("diagnostics_{}_{}.zip", timestamp, trace_short);
    let bundle_path = PathBuf::from(&resolved_dir).join(filename);

    let manifest = DiagnosticsManifest {
        app_version: env!("CARGO_PKG_VERSION"),
        os: std::env::consts::OS,
        arch: std::env::consts::ARCH,
        timestamp_utc: Utc::now().to_rfc3339(),
        trace_id: trace_id.to_string(),
    };

    let mut tool_payload = ToolPayload {
        raw_output: String::new(),
        version: None,
        error: None,
    };
    match run_hdc(hdc_program, &["-v".to_string()], trace_id) {
        Ok(output) => {
            tool_payload.raw_output = output.combined();
            tool_payload.version = parse_hdc_version(&tool_payload.raw_output);
        }
        Err(err) => {
            warn!(trace_id = %trace_id, error = %err.error, "Failed to probe hdc for diagnostics");
            tool_payload.error = Some(err.error);
        }
    }

    let mut targets_payload = TargetsPayload {
        parsed: Vec::new(),
        raw_stdout: String::new(),
        raw_stderr: String::new(),
        exit_code: None,
        error: None,
    };
    let args = vec!["list".to_string(), "targets".to_string(), "-v".to_string()];
    match run_hdc(hdc_program, &args, trace_id) {
        Ok(output) => {
            targets_payload.exit_code = output.exit_code;
            targets_payload.raw_stdout = output.stdout.clone();
            targets_payload.raw_stderr = output.stderr.clone();
            targets_payload.parsed = parse_list_targets(&output.stdout);
        }
        Err(err) => {
            warn!(
                trace_id = %trace_id,
                error = %err.error,
                code = %err.code,
                "Failed to list targets for diagnostics"
            );
            targets_payload.error = Some(err.error);
        }
    }

    let payload = DiagnosticsPayload {
        manifest,
        config,
        tool: tool_payload,
        targets: targets_payload,
    };

    let json = serde_json::to_vec_pretty(&payload).map_err(|err| {
        AppError::system(
            format!("Failed to serialize diagnostics payload: {err}"),
            trace_id,
        )
    })?;

    let file = fs::File::create(&bundle_path)
        .map_err(|err| AppError::system(format!("Failed to create bundle: {err}"), trace_id))?;
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file("diagnostics.json", FileOptions::<()>::default())
        .map_err(|err| AppError::system(format!("Failed to write bundle: {err}"), trace_id))?;
    zip.write_all(&json)
        .map_err(|err| AppError::system(format!("Failed to write bundle: {err}"), trace_id))?;
    zip.finish()
        .map_err(|err| AppError::system(format!("Failed to finalize bundle: {err}"), trace_id))?;

    Ok(bundle_path)
}
