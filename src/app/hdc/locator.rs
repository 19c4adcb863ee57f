use std::path::Path;

pub fn normalize_command_path(value: &str) -> String {
    let trimmed = value.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|candidate| candidate.strip_suffix(quote))
        {
            return inner.trim().to_string();
        }
    }
    trimmed.to_string()
}

pub fn resolve_hdc_program(config_command_path: &str) -> String {
    let normalized = normalize_command_path(config_command_path);
    if normalized.is_empty() {
        "hdc".to_string()
    } else {
        normalized
    }
}

pub fn validate_hdc_program(program: &str) -> Result<(), String> {
    if program.trim().is_empty() {
        return Err("hdc command is empty".to_string());
    }
    if program == "hdc" {
        return Ok(());
    }
    let path = Path::new(program);
    if path.is_dir() {
        return Err("hdc path must point to an executable file".to_string());
    }
    if !path.exists() {
        return Err("hdc executable not found at the configured path".to_string());
    }
    Ok(())
}
