use std::collections::HashMap;

use regex::Regex;

use crate::app::models::{BundleInfo, TargetDetail, TargetSummary};

/// Scrapes `hdc list targets -v`. Verbose rows carry whitespace-separated
/// columns `<connect_key> <transport> <status> [<host>]`; plain rows from the
/// non-verbose fallback are a bare connect key. `[Empty]` (and other bracketed
/// daemon chatter) is not a target.
pub fn parse_list_targets(output: &str) -> Vec<TargetSummary> {
    output
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with('['))
        .filter_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.as_slice() {
                [key] => Some(TargetSummary {
                    connect_key: key.to_string(),
                    transport: None,
                    status: "Connected".to_string(),
                    host: None,
                }),
                [key, status] => Some(TargetSummary {
                    connect_key: key.to_string(),
                    transport: None,
                    status: status.to_string(),
                    host: None,
                }),
                [key, transport, status, rest @ ..] => Some(TargetSummary {
                    connect_key: key.to_string(),
                    transport: Some(transport.to_string()),
                    status: status.to_string(),
                    host: rest.first().map(|host| host.to_string()),
                }),
                _ => None,
            }
        })
        .collect()
}

/// Scrapes `param get` output into a key/value map. Lines look like
/// `const.product.name = OpenHarmony`.
pub fn parse_param_map(output: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if !key.is_empty() {
            map.insert(key.to_string(), value.trim().to_string());
        }
    }
    map
}

pub fn build_target_detail(connect_key: &str, params: &HashMap<String, String>) -> TargetDetail {
    TargetDetail {
        connect_key: connect_key.to_string(),
        product_name: params.get("const.product.name").cloned(),
        model: params.get("const.product.model").cloned(),
        brand: params.get("const.product.brand").cloned(),
        software_version: params.get("const.product.software.version").cloned(),
        api_version: params.get("const.ohos.apiversion").cloned(),
        os_full_name: params.get("const.ohos.fullname").cloned(),
    }
}

pub fn parse_hdc_version(output: &str) -> Option<String> {
    let re = Regex::new(r"(?i)\bver:\s*(\S+)").ok()?;
    let caps = re.captures(output)?;
    Some(caps.get(1)?.as_str().to_string())
}

/// Scrapes `bm dump -a`. Bundle names follow a `bundle name list:` header;
/// stray `OK` acknowledgements are dropped. Without the header every
/// non-chatter line is taken as a bundle name.
pub fn parse_bundle_list(output: &str) -> Vec<String> {
    let mut bundles = Vec::new();
    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("ok") {
            continue;
        }
        if trimmed.to_lowercase().contains("bundle name list") {
            bundles.clear();
            continue;
        }
        if trimmed.ends_with(':') || trimmed.starts_with('[') {
            continue;
        }
        bundles.push(trimmed.to_string());
    }
    bundles
}

/// Scrapes `bm dump -n <bundle>`: a JSON document after a `<bundle>:`
/// preamble. Missing keys degrade to `None` instead of failing the lookup.
pub fn parse_bundle_dump(bundle: &str, output: &str) -> Option<BundleInfo> {
    let start = output.find('{')?;
    let end = output.rfind('}')?;
    if end < start {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(&output[start..=end]).ok()?;

    let mut abilities = Vec::new();
    let mut main_ability = None;
    if let Some(modules) = value.get("hapModuleInfos").and_then(|v| v.as_array()) {
        for module in modules {
            if main_ability.is_none() {
                if let Some(name) = module.get("mainAbility").and_then(|v| v.as_str()) {
                    if !name.is_empty() {
                        main_ability = Some(name.to_string());
                    }
                }
            }
            if let Some(infos) = module.get("abilityInfos").and_then(|v| v.as_array()) {
                for info in infos {
                    if let Some(name) = info.get("name").and_then(|v| v.as_str()) {
                        if !name.is_empty() {
                            abilities.push(name.to_string());
                        }
                    }
                }
            }
        }
    }
    if main_ability.is_none() {
        main_ability = abilities.first().cloned();
    }

    Some(BundleInfo {
        bundle_name: bundle.to_string(),
        version_name: value
            .get("versionName")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        version_code: value.get("versionCode").map(json_scalar_to_string),
        vendor: value
            .get("vendor")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        app_id: value
            .get("appId")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        main_ability,
        abilities,
    })
}

fn json_scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn output_indicates_failure(output: &str) -> bool {
    let lower = output.to_lowercase();
    lower.contains("fail") || lower.contains("error") || lower.contains("unable")
}

pub fn tconn_succeeded(output: &str) -> bool {
    output.to_lowercase().contains("connect ok")
}

pub fn aa_start_succeeded(output: &str) -> bool {
    output.to_lowercase().contains("start ability successfully")
}

pub fn bm_clean_succeeded(output: &str) -> bool {
    let lower = output.to_lowercase();
    lower.contains("successfully") && !output_indicates_failure(&lower)
}

pub fn install_succeeded(output: &str) -> bool {
    let lower = output.to_lowercase();
    if output_indicates_failure(&lower) {
        return false;
    }
    lower.contains("successfully") || lower.contains("appmod finish")
}

pub fn uninstall_succeeded(output: &str) -> bool {
    let lower = output.to_lowercase();
    !output_indicates_failure(&lower) && lower.contains("successfully")
}
