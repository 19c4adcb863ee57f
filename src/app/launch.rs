use regex::Regex;
use serde::{Deserialize, Serialize};

/// Launch form fields that shape the quick-app URI. Every field is optional in
/// practice; empty values change the output shape instead of failing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LaunchParams {
    pub pkg_name: String,
    pub version: String,
    pub uri: String,
    pub is_debug: bool,
    pub extra: String,
    pub entry: Option<String>,
    pub params_json: Option<String>,
}

pub fn build_launch_uri(params: &LaunchParams) -> String {
    let mut uri = format!("esapp://{}", params.pkg_name);
    if !params.version.is_empty() {
        uri.push('/');
        uri.push_str(&params.version);
    }

    // Token order is part of the rendered string: entry, uri, params, debug, extra.
    let mut query: Vec<String> = Vec::new();
    if let Some(entry) = params.entry.as_deref() {
        if !entry.is_empty() {
            query.push(format!("entry={entry}"));
        }
    }
    if !params.uri.is_empty() {
        query.push(format!("uri={}", urlencoding::encode(&params.uri)));
    }
    if let Some(json) = params.params_json.as_deref() {
        if !json.is_empty() && json != "{}" {
            query.push(format!("params={}", urlencoding::encode(json)));
        }
    }
    if params.is_debug {
        query.push("debug=true".to_string());
    }
    if !params.extra.is_empty() {
        query.push(params.extra.clone());
    }

    if !query.is_empty() {
        uri.push('?');
        uri.push_str(&query.join("&"));
    }
    uri
}

pub fn build_preview_command(
    device_id: &str,
    bundle: &str,
    ability: &str,
    params: &LaunchParams,
) -> String {
    let uri = build_launch_uri(params);
    format!("hdc -t {device_id} shell \"aa start -b {bundle} -a {ability} -U '{uri}'\"")
}

pub fn build_launch_args(
    device_id: &str,
    bundle: &str,
    ability: &str,
    params: &LaunchParams,
) -> Vec<String> {
    vec![
        "-t".to_string(),
        device_id.to_string(),
        "shell".to_string(),
        "aa".to_string(),
        "start".to_string(),
        "-b".to_string(),
        bundle.to_string(),
        "-a".to_string(),
        ability.to_string(),
        "-U".to_string(),
        build_launch_uri(params),
    ]
}

/// Splits an operator-edited command line into process arguments. Runs wrapped
/// in matching double or single quotes become one token with the quotes
/// stripped. Not a shell parser: no escaped quotes, no nesting, no backslash
/// handling.
pub fn split_command_line(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for caps in token_regex().captures_iter(line) {
        if let Some(quoted) = caps.get(1) {
            tokens.push(quoted.as_str().to_string());
        } else if let Some(quoted) = caps.get(2) {
            tokens.push(quoted.as_str().to_string());
        } else if let Some(bare) = caps.get(3) {
            tokens.push(bare.as_str().to_string());
        }
    }
    tokens
}

/// Tokenizes an edited command line and drops a leading literal `hdc`; the
/// program name is supplied separately at spawn time.
pub fn command_line_to_args(line: &str) -> Vec<String> {
    let mut tokens = split_command_line(line);
    if tokens.first().map(String::as_str) == Some("hdc") {
        tokens.remove(0);
    }
    tokens
}

fn token_regex() -> Regex {
    Regex::new(r#""([^"]*)"|'([^']*)'|(\S+)"#).expect("token regex should compile")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_params() -> LaunchParams {
        LaunchParams {
            pkg_name: "es.com.elsbharmony.tv".to_string(),
            version: "0.0.2".to_string(),
            uri: "assets:///vue".to_string(),
            is_debug: true,
            extra: "from=cmd".to_string(),
            entry: Some("Application".to_string()),
            params_json: Some(String::new()),
        }
    }

    #[test]
    fn builds_uri_for_example_form() {
        assert_eq!(
            build_launch_uri(&example_params()),
            "esapp://es.com.elsbharmony.tv/0.0.2?entry=Application&uri=assets%3A%2F%2F%2Fvue&debug=true&from=cmd"
        );
    }

    #[test]
    fn omits_version_segment_when_empty() {
        let mut params = example_params();
        params.version = String::new();
        assert_eq!(
            build_launch_uri(&params),
            "esapp://es.com.elsbharmony.tv?entry=Application&uri=assets%3A%2F%2F%2Fvue&debug=true&from=cmd"
        );
    }

    #[test]
    fn emits_bare_authority_when_no_query_tokens() {
        let params = LaunchParams {
            pkg_name: "com.example.app".to_string(),
            ..LaunchParams::default()
        };
        assert_eq!(build_launch_uri(&params), "esapp://com.example.app");
    }

    #[test]
    fn keeps_scheme_prefix_for_empty_package() {
        let params = LaunchParams {
            is_debug: true,
            ..LaunchParams::default()
        };
        assert_eq!(build_launch_uri(&params), "esapp://?debug=true");
    }

    #[test]
    fn encodes_reserved_characters_in_uri_token() {
        let params = LaunchParams {
            pkg_name: "pkg".to_string(),
            uri: "https://h.example/page?a=1&b=2 c".to_string(),
            ..LaunchParams::default()
        };
        assert_eq!(
            build_launch_uri(&params),
            "esapp://pkg?uri=https%3A%2F%2Fh.example%2Fpage%3Fa%3D1%26b%3D2%20c"
        );
    }

    #[test]
    fn suppresses_empty_and_empty_object_params_json() {
        let mut params = example_params();
        params.params_json = None;
        assert!(!build_launch_uri(&params).contains("params="));
        params.params_json = Some(String::new());
        assert!(!build_launch_uri(&params).contains("params="));
        params.params_json = Some("{}".to_string());
        assert!(!build_launch_uri(&params).contains("params="));
    }

    #[test]
    fn encodes_params_json_object() {
        let mut params = example_params();
        params.params_json = Some(r#"{"a":1}"#.to_string());
        assert!(build_launch_uri(&params).contains("params=%7B%22a%22%3A1%7D"));
    }

    #[test]
    fn keeps_extra_fragment_verbatim() {
        let params = LaunchParams {
            pkg_name: "pkg".to_string(),
            uri: "a&b".to_string(),
            extra: "from=cmd&channel=ops".to_string(),
            ..LaunchParams::default()
        };
        assert_eq!(
            build_launch_uri(&params),
            "esapp://pkg?uri=a%26b&from=cmd&channel=ops"
        );
    }

    #[test]
    fn never_emits_debug_false() {
        let mut params = example_params();
        params.is_debug = false;
        assert!(!build_launch_uri(&params).contains("debug"));
    }

    #[test]
    fn query_token_order_is_stable() {
        let mut params = example_params();
        params.params_json = Some(r#"{"k":"v"}"#.to_string());
        let uri = build_launch_uri(&params);
        let entry = uri.find("entry=").unwrap();
        let embedded = uri.find("&uri=").unwrap();
        let json = uri.find("&params=").unwrap();
        let debug = uri.find("&debug=true").unwrap();
        let extra = uri.find("&from=cmd").unwrap();
        assert!(entry < embedded);
        assert!(embedded < json);
        assert!(json < debug);
        assert!(debug < extra);
    }

    #[test]
    fn builds_preview_command_for_example_form() {
        let preview = build_preview_command(
            "127.0.0.1:5555",
            "com.extscreen.runtime",
            "EntryAbility",
            &example_params(),
        );
        assert_eq!(
            preview,
            "hdc -t 127.0.0.1:5555 shell \"aa start -b com.extscreen.runtime -a EntryAbility -U 'esapp://es.com.elsbharmony.tv/0.0.2?entry=Application&uri=assets%3A%2F%2F%2Fvue&debug=true&from=cmd'\""
        );
    }

    #[test]
    fn builds_discrete_launch_args() {
        let params = LaunchParams {
            pkg_name: "pkg".to_string(),
            uri: "assets:///vue".to_string(),
            ..LaunchParams::default()
        };
        let args = build_launch_args("dev-1", "com.example", "MainAbility", &params);
        assert_eq!(
            args,
            vec![
                "-t",
                "dev-1",
                "shell",
                "aa",
                "start",
                "-b",
                "com.example",
                "-a",
                "MainAbility",
                "-U",
                "esapp://pkg?uri=assets%3A%2F%2F%2Fvue",
            ]
        );
    }

    #[test]
    fn retokenizes_preview_shape_with_quoted_remote_segment() {
        let args = command_line_to_args("hdc -t X shell \"aa start -b b -a a -U 'u'\"");
        assert_eq!(args, vec!["-t", "X", "shell", "aa start -b b -a a -U 'u'"]);
    }

    #[test]
    fn retokenizes_generated_preview() {
        let preview = build_preview_command(
            "127.0.0.1:5555",
            "com.extscreen.runtime",
            "EntryAbility",
            &example_params(),
        );
        let args = command_line_to_args(&preview);
        assert_eq!(args.len(), 4);
        assert_eq!(args[0], "-t");
        assert_eq!(args[1], "127.0.0.1:5555");
        assert_eq!(args[2], "shell");
        assert_eq!(
            args[3],
            "aa start -b com.extscreen.runtime -a EntryAbility -U 'esapp://es.com.elsbharmony.tv/0.0.2?entry=Application&uri=assets%3A%2F%2F%2Fvue&debug=true&from=cmd'"
        );
    }

    #[test]
    fn strips_single_quotes_from_tokens() {
        assert_eq!(split_command_line("-U 'a b'"), vec!["-U", "a b"]);
    }

    #[test]
    fn keeps_unbalanced_quote_as_bare_token() {
        assert_eq!(split_command_line("-U \"abc"), vec!["-U", "\"abc"]);
    }

    #[test]
    fn drops_leading_tool_name_only_when_literal() {
        assert_eq!(command_line_to_args("hdc -t X"), vec!["-t", "X"]);
        assert_eq!(
            command_line_to_args("/usr/local/bin/hdc -t X"),
            vec!["/usr/local/bin/hdc", "-t", "X"]
        );
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(split_command_line("").is_empty());
        assert!(split_command_line("   ").is_empty());
        assert!(command_line_to_args("hdc").is_empty());
    }
}
