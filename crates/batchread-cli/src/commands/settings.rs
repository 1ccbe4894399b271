//! Reader settings layering: built-in defaults < config file < flags.

use std::path::Path;

use anyhow::anyhow;
use batchread_core::{ReadMode, ReadModeRuleSpec, ReaderSettings};

use crate::cli::ReaderArgs;
use crate::error::{CliError, CliResult};

/// Load the optional config file and layer the flag values over it.
pub(crate) fn resolve_settings(args: &ReaderArgs) -> CliResult<ReaderSettings> {
    let from_file = match &args.config {
        Some(path) => load_settings_file(path)?,
        None => ReaderSettings::default(),
    };
    Ok(from_file.layered(settings_from_flags(args)))
}

pub(crate) fn load_settings_file(path: &Path) -> CliResult<ReaderSettings> {
    let raw = std::fs::read_to_string(path).map_err(|err| {
        CliError::failure(anyhow!("failed to read config '{}': {err}", path.display()))
    })?;
    serde_json::from_str(&raw).map_err(|err| {
        CliError::validation(format!("invalid config '{}': {err}", path.display()))
    })
}

fn settings_from_flags(args: &ReaderArgs) -> ReaderSettings {
    ReaderSettings {
        accept: args.accept.clone(),
        drag_class: None,
        read_as_map: (!args.rules.is_empty()).then(|| args.rules.clone()),
        read_as_default: args.default_mode,
    }
}

/// Parse a `PATTERN=MODE` rule flag; the split happens at the last `=`.
pub(crate) fn parse_rule(value: &str) -> Result<ReadModeRuleSpec, String> {
    let (pattern, mode) = value
        .rsplit_once('=')
        .ok_or_else(|| format!("expected PATTERN=MODE, got '{value}'"))?;
    if pattern.is_empty() {
        return Err("rule pattern must not be empty".to_string());
    }
    let mode = mode
        .parse::<ReadMode>()
        .map_err(|_| format!("unknown read mode '{mode}'"))?;
    Ok(ReadModeRuleSpec {
        pattern: pattern.to_string(),
        mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_rule_splits_on_last_equals() {
        let rule = parse_rule("a=b/*=Text").expect("rule");
        assert_eq!(rule.pattern, "a=b/*");
        assert_eq!(rule.mode, ReadMode::Text);
        assert!(parse_rule("image/*").is_err());
        assert!(parse_rule("=Text").is_err());
        assert!(parse_rule("image/*=jpeg").is_err());
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"{{"accept":"image/*","read_as_default":"ArrayBuffer","read_as_map":[{{"pattern":"png","mode":"Text"}}]}}"#
        )
        .expect("write");

        let args = ReaderArgs {
            config: Some(file.path().to_path_buf()),
            accept: Some("text/*".into()),
            rules: Vec::new(),
            default_mode: None,
            chunk_size: 1024,
        };
        let settings = resolve_settings(&args).expect("settings");
        assert_eq!(settings.accept.as_deref(), Some("text/*"));
        assert_eq!(settings.read_as_default, Some(ReadMode::ArrayBuffer));
        assert_eq!(settings.read_as_map.map(|rules| rules.len()), Some(1));
    }

    #[test]
    fn malformed_config_is_a_validation_error() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "{{\"accept\": 5}}").expect("write");
        let err = load_settings_file(file.path()).expect_err("should fail");
        assert_eq!(err.exit_code(), 2);
    }
}
