use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetSummary {
    pub connect_key: String,
    pub transport: Option<String>,
    pub status: String,
    pub host: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetDetail {
    pub connect_key: String,
    pub product_name: Option<String>,
    pub model: Option<String>,
    pub brand: Option<String>,
    pub software_version: Option<String>,
    pub api_version: Option<String>,
    pub os_full_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetInfo {
    pub summary: TargetSummary,
    pub detail: Option<TargetDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostCommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HdcInfo {
    pub available: bool,
    pub version_output: String,
    pub version: Option<String>,
    pub command_path: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BundleInfo {
    pub bundle_name: String,
    pub version_name: Option<String>,
    pub version_code: Option<String>,
    pub vendor: Option<String>,
    pub app_id: Option<String>,
    pub main_ability: Option<String>,
    pub abilities: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstallResult {
    pub connect_key: String,
    pub package_path: String,
    pub success: bool,
    pub raw_output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClearDataResult {
    pub connect_key: String,
    pub data_cleared: bool,
    pub cache_cleared: bool,
    pub raw_output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecStartResult {
    pub session_id: String,
    pub pid: Option<u32>,
    pub command_line: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecEvent {
    pub session_id: String,
    pub event: String,
    pub stream: Option<String>,
    pub lines: Vec<String>,
    pub exit_code: Option<i32>,
    pub trace_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunLogExportResult {
    pub output_path: String,
    pub line_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandResponse<T> {
    pub trace_id: String,
    pub data: T,
}
