use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{CommandSpec, NO_ARG_COMMANDS, SETTING_COMMANDS, SINGLE_PATH_COMMANDS};

#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            command_args: BTreeMap::new(),
        }
    }

    fn with_arg(mut self, key: &str, value: String) -> Self {
        self.command_args
            .insert(key.to_string(), Value::String(value));
        self
    }

    /// String argument, `None` when missing or blank.
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.command_args
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn parse_path_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn parse_single_path_arg(arg: &str) -> String {
    let parts = parse_path_args(arg);
    match parts.len() {
        0 => String::new(),
        1 => parts[0].clone(),
        _ => parts.join(" "),
    }
}

/// Maps one line of front-end input to an action.
///
/// Slash commands select an action; any other non-empty line is treated as
/// the path of an image to pixelize.
pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop", text);
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        let looks_like_path = matches!(
            slash_tail[command_len..].chars().next(),
            Some('/') | Some('.') | Some('\\')
        );
        if command_len > 0 && !looks_like_path {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            if let Some((spec, key)) = SETTING_COMMANDS
                .iter()
                .find(|(spec, _)| spec.command == command)
            {
                return Intent::new(spec.action, text).with_arg(key, arg.to_string());
            }

            if let Some(action) = find_action(&command, SINGLE_PATH_COMMANDS) {
                return Intent::new(action, text).with_arg("path", parse_single_path_arg(arg));
            }

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return Intent::new(action, text);
            }

            return Intent::new("unknown", text)
                .with_arg("command", command)
                .with_arg("arg", arg.to_string());
        }
    }

    Intent::new("pixelize", text).with_arg("path", parse_single_path_arg(raw_trimmed))
}
