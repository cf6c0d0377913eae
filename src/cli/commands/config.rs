//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::schema::{SharedBackend, StoreBackend};
use crate::config::{Config, ConfigManager};
use crate::error::{SwatchError, SwatchResult};
use crate::ui::{self, UiContext};
use std::path::PathBuf;

/// Keys accepted by `config set`
const VALID_KEYS: &[&str] = &[
    "general.log_format",
    "general.ledger",
    "mint.cache_prefix",
    "mint.lock_prefix",
    "mint.cache_ttl_secs",
    "mint.lock_ttl_secs",
    "mint.lock_wait_ms",
    "mint.lock_retry_ms",
    "cache.backend",
    "cache.dir",
    "lock.backend",
    "lock.dir",
    "store.backend",
    "store.api_url",
    "store.timeout_secs",
    "store.dir",
    "store.gateway",
];

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    manager: &ConfigManager,
    config: &Config,
) -> SwatchResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => show_path(manager),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, config, &key, &value).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> SwatchResult<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn show_path(manager: &ConfigManager) {
    println!("{}", manager.path().display());
}

async fn init_config(manager: &ConfigManager, force: bool) -> SwatchResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;

    ui::step_ok_detail(
        &ctx,
        "Configuration initialized",
        &path.display().to_string(),
    );

    Ok(())
}

async fn set_value(
    manager: &ConfigManager,
    config: &Config,
    key: &str,
    value: &str,
) -> SwatchResult<()> {
    let ctx = UiContext::detect();
    let mut config = config.clone();

    if let Err(e) = apply(&mut config, key, value) {
        if !VALID_KEYS.contains(&key) {
            ui::step_error_detail(&ctx, "Unknown config key", key);
            ui::remark(&ctx, "Valid keys:");
            for valid in VALID_KEYS {
                eprintln!("  {}", valid);
            }
        }
        return Err(e);
    }

    config.validate().map_err(|reason| SwatchError::ConfigInvalid {
        path: manager.path().to_path_buf(),
        reason,
    })?;

    manager.save(&config).await?;
    ui::step_ok(&ctx, &format!("Set {} = {}", key, value));

    Ok(())
}

/// Apply one dot-separated `key = value` assignment
fn apply(config: &mut Config, key: &str, value: &str) -> SwatchResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => config.general.log_format = value.to_string(),
        ["general", "ledger"] => config.general.ledger = parse_bool(value)?,

        ["mint", "cache_prefix"] => config.mint.cache_prefix = value.to_string(),
        ["mint", "lock_prefix"] => config.mint.lock_prefix = value.to_string(),
        ["mint", "cache_ttl_secs"] => config.mint.cache_ttl_secs = parse_u64(value)?,
        ["mint", "lock_ttl_secs"] => config.mint.lock_ttl_secs = parse_u64(value)?,
        ["mint", "lock_wait_ms"] => config.mint.lock_wait_ms = parse_u64(value)?,
        ["mint", "lock_retry_ms"] => config.mint.lock_retry_ms = parse_u64(value)?,

        ["cache", "backend"] => config.cache.backend = parse_shared_backend(value)?,
        ["cache", "dir"] => config.cache.dir = Some(PathBuf::from(value)),

        ["lock", "backend"] => config.lock.backend = parse_shared_backend(value)?,
        ["lock", "dir"] => config.lock.dir = Some(PathBuf::from(value)),

        ["store", "backend"] => {
            config.store.backend = match value {
                "ipfs" => StoreBackend::Ipfs,
                "local" => StoreBackend::Local,
                _ => {
                    return Err(SwatchError::User(format!(
                        "Invalid store backend: {}. Use ipfs/local",
                        value
                    )))
                }
            }
        }
        ["store", "api_url"] => config.store.api_url = value.to_string(),
        ["store", "timeout_secs"] => config.store.timeout_secs = parse_u64(value)?,
        ["store", "dir"] => config.store.dir = Some(PathBuf::from(value)),
        ["store", "gateway"] => config.store.gateway = value.to_string(),

        _ => return Err(SwatchError::User(format!("Unknown config key: {}", key))),
    }

    Ok(())
}

fn parse_shared_backend(value: &str) -> SwatchResult<SharedBackend> {
    match value {
        "file" => Ok(SharedBackend::File),
        "memory" => Ok(SharedBackend::Memory),
        _ => Err(SwatchError::User(format!(
            "Invalid backend: {}. Use file/memory",
            value
        ))),
    }
}

fn parse_bool(value: &str) -> SwatchResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(SwatchError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_u64(value: &str) -> SwatchResult<u64> {
    value
        .parse()
        .map_err(|_| SwatchError::User(format!("Invalid number: {}", value)))
}
