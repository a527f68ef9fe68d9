use crate::cli::ConfigCommands;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output;
use anyhow::anyhow;

pub fn run(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => show(),
        ConfigCommands::Path => path(),
        ConfigCommands::Get { key } => get(&key),
        ConfigCommands::Set { key, value, unset } => set(&key, value.as_deref(), unset),
    }
}

fn show() -> Result<()> {
    let config = Config::load()?;
    output::print_json(&config.redacted())?;
    Ok(())
}

fn path() -> Result<()> {
    match Config::config_path() {
        Some(path) => {
            output::print_raw(&path.display().to_string());
            Ok(())
        }
        None => Err(anyhow!("Could not determine config path").into()),
    }
}

fn get(key: &str) -> Result<()> {
    let config = Config::load()?;
    let value = get_value(&config, key)?;
    output::print_raw(&value);
    Ok(())
}

fn set(key: &str, value: Option<&str>, unset: bool) -> Result<()> {
    let mut config = Config::load()?;
    set_value(&mut config, key, value, unset)?;
    config.save()?;
    output::print_success("Config updated");
    Ok(())
}

fn get_value(config: &Config, key: &str) -> Result<String> {
    match normalize_key(key).as_str() {
        "api_url" => Ok(config.api_url.clone().unwrap_or_default()),
        "web_url" => Ok(config.web_url.clone().unwrap_or_default()),
        "function_service_url" => Ok(config.function_service_url.clone().unwrap_or_default()),
        "default_workspace" => Ok(config.default_workspace.clone().unwrap_or_default()),
        "page_size" => Ok(config.page_size.to_string()),
        "readonly" => Ok(config.readonly.to_string()),
        "timeout_secs" => Ok(config.timeout_secs.to_string()),
        "api_key" => Err(CliError::invalid(
            "api_key is not shown; use 'slcli auth status'",
        )),
        _ => Err(CliError::invalid(format!("Unknown config key: {}", key))),
    }
}

fn required(value: Option<&str>) -> Result<&str> {
    value.ok_or_else(|| CliError::invalid("Value is required"))
}

fn optional_string(value: Option<&str>, unset: bool) -> Result<Option<String>> {
    if unset {
        Ok(None)
    } else {
        Ok(Some(required(value)?.to_string()))
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(CliError::invalid(format!("Expected true or false, got {}", other))),
    }
}

fn set_value(config: &mut Config, key: &str, value: Option<&str>, unset: bool) -> Result<()> {
    match normalize_key(key).as_str() {
        "api_url" => config.api_url = optional_string(value, unset)?,
        "web_url" => config.web_url = optional_string(value, unset)?,
        "function_service_url" => config.function_service_url = optional_string(value, unset)?,
        "default_workspace" => config.default_workspace = optional_string(value, unset)?,
        "page_size" => {
            config.page_size = if unset {
                Config::default().page_size
            } else {
                let v = required(value)?;
                let size: usize = v
                    .parse()
                    .map_err(|_| CliError::invalid(format!("Invalid page size: {}", v)))?;
                if size == 0 {
                    return Err(CliError::invalid("Page size must be at least 1"));
                }
                size
            };
        }
        "readonly" => {
            config.readonly = if unset { false } else { parse_bool(required(value)?)? };
        }
        "timeout_secs" => {
            config.timeout_secs = if unset {
                Config::default().timeout_secs
            } else {
                let v = required(value)?;
                v.parse()
                    .map_err(|_| CliError::invalid(format!("Invalid timeout: {}", v)))?
            };
        }
        "api_key" => {
            return Err(CliError::invalid(
                "api_key is managed by 'slcli auth login' and 'slcli auth logout'",
            ))
        }
        _ => return Err(CliError::invalid(format!("Unknown config key: {}", key))),
    }

    Ok(())
}

fn normalize_key(key: &str) -> String {
    key.trim()
        .to_lowercase()
        .replace('-', "_")
        .replace(' ', "")
}
