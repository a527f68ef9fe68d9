use crate::api::{ApiClient, ErrorHandling, ServerUrl};
use crate::auth::{mask_key, CredentialStore, Credentials};
use crate::cli::AuthCommands;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::format::text;
use crate::output;
use colored::Colorize;
use reqwest::Method;
use serde_json::Value;
use std::io::{self, Write};
use std::time::Duration;

const AUTH_PATH: &str = "/niuser/v1/auth";

pub async fn run(command: AuthCommands, store: CredentialStore) -> Result<()> {
    match command {
        AuthCommands::Login {
            url,
            api_key,
            web_url,
            config_file,
        } => login(store, url, api_key, web_url, config_file).await,
        AuthCommands::Logout => logout(store),
        AuthCommands::Status => status(store).await,
    }
}

fn ask(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(answer.trim().to_string())
}

/// Ask the server who we are; `None` when the key is rejected
async fn validate(credentials: &Credentials, timeout: Duration) -> Result<Option<Value>> {
    let client = ApiClient::new(&credentials.api_url, &credentials.api_key, timeout)?;
    let response = client
        .execute(Method::GET, AUTH_PATH, &[], None, ErrorHandling::Passthrough)
        .await?;
    match response.status().as_u16() {
        200..=299 => Ok(Some(crate::api::client::read_json(response).await?)),
        401 | 403 => Ok(None),
        _ => {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(crate::error::ApiError::from_body(status, body).into())
        }
    }
}

fn describe_user(info: &Value) -> Option<String> {
    let email = text(info, "user.email");
    let name = match (text(info, "user.firstName"), text(info, "user.lastName")) {
        (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
        (Some(first), None) => Some(first),
        _ => None,
    };
    match (name, email) {
        (Some(name), Some(email)) => Some(format!("{} <{}>", name, email)),
        (Some(name), None) => Some(name),
        (None, Some(email)) => Some(email),
        (None, None) => None,
    }
}

async fn login(
    store: CredentialStore,
    url: Option<String>,
    api_key: Option<String>,
    web_url: Option<String>,
    config_file: bool,
) -> Result<()> {
    output::print_raw(&"SystemLink Login".bold().to_string());

    let url = match url {
        Some(url) => url,
        None => ask("API server URL")?,
    };
    let server = ServerUrl::parse(&url)?;
    let web_url = web_url.unwrap_or_else(|| server.web_url());

    let api_key = match api_key {
        Some(key) => key,
        None => {
            let keys_page = format!("{}/security", web_url);
            output::print_raw(&format!("Create an API key under Security > API Keys: {}", keys_page));
            if open::that(&keys_page).is_err() {
                output::print_warning("Could not open browser automatically.");
            }
            ask("API key")?
        }
    };
    if api_key.is_empty() {
        return Err(CliError::invalid("no API key provided"));
    }

    let credentials = Credentials {
        api_url: server.api.as_str().trim_end_matches('/').to_string(),
        api_key,
        web_url: Some(web_url),
    };

    print!("Validating credentials... ");
    io::stdout().flush()?;
    let timeout = Duration::from_secs(Config::load()?.timeout_secs.max(1));
    let Some(info) = validate(&credentials, timeout).await? else {
        output::print_raw(&"rejected".red().to_string());
        return Err(CliError::invalid("the server rejected this API key"));
    };
    output::print_raw(&"valid!".green().to_string());
    if let Some(who) = describe_user(&info) {
        output::print_info(&format!("Logged in as {}", who));
    }

    let use_keychain = !config_file && store.keychain_enabled();
    if use_keychain {
        match store.store_in_keychain(&credentials) {
            Ok(()) => {
                output::print_success("Credentials stored securely in keychain.");
                return Ok(());
            }
            Err(e) => output::print_warning(&format!("{}; falling back to config file.", e)),
        }
    }

    store.store_in_config(&credentials)?;
    let config_path = Config::config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "config.json".to_string());
    output::print_success(&format!("Credentials stored in config file ({}).", config_path));
    output::print_warning("Config file storage is plaintext. Keep this file secure.");
    Ok(())
}

fn logout(store: CredentialStore) -> Result<()> {
    store.remove()?;
    output::print_success("Credentials removed.");
    Ok(())
}

async fn status(store: CredentialStore) -> Result<()> {
    let config = Config::load()?;
    let resolved = match store.resolve(&config) {
        Ok(resolved) => resolved,
        Err(_) => {
            output::print_raw(&"Not authenticated".red().bold().to_string());
            return Err(CliError::MissingCredentials);
        }
    };

    let credentials = &resolved.credentials;
    output::print_raw(&format!("  Source:  {}", resolved.source));
    output::print_raw(&format!("  Server:  {}", credentials.api_url));
    if let Some(web) = &credentials.web_url {
        output::print_raw(&format!("  Web UI:  {}", web));
    }
    output::print_raw(&format!("  API key: {}", mask_key(&credentials.api_key)));
    if config.readonly {
        output::print_raw(&format!("  Mode:    {}", "readonly".yellow()));
    }

    let timeout = Duration::from_secs(config.timeout_secs.max(1));
    match validate(credentials, timeout).await? {
        Some(info) => {
            output::print_raw(&format!("  Status:  {}", "valid".green()));
            if let Some(who) = describe_user(&info) {
                output::print_raw(&format!("  User:    {}", who));
            }
            Ok(())
        }
        None => {
            output::print_raw(&format!("  Status:  {}", "invalid or expired".red()));
            Err(CliError::invalid("stored API key was rejected"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;
    use serde_json::json;

    fn creds(server: &MockServer) -> Credentials {
        Credentials {
            api_url: server.base_url(),
            api_key: "k".into(),
            web_url: None,
        }
    }

    #[tokio::test]
    async fn test_validate_accepts_and_rejects() {
        let server = MockServer::start_async().await;
        let mut ok = server
            .mock_async(|when, then| {
                when.method("GET").path(AUTH_PATH);
                then.status(200)
                    .json_body(json!({"user": {"firstName": "Ada", "email": "ada@example.com"}}));
            })
            .await;

        let info = validate(&creds(&server), Duration::from_secs(5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(describe_user(&info).unwrap(), "Ada <ada@example.com>");
        ok.delete_async().await;

        server
            .mock_async(|when, then| {
                when.method("GET").path(AUTH_PATH);
                then.status(401);
            })
            .await;
        assert!(validate(&creds(&server), Duration::from_secs(5))
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_describe_user_variants() {
        assert_eq!(describe_user(&json!({})), None);
        assert_eq!(
            describe_user(&json!({"user": {"email": "x@y.z"}})),
            Some("x@y.z".to_string())
        );
    }
}
