//! Broker credentials from the environment, falling back to the `[broker]`
//! section of the INI file.
//!
//! Recognised variables: `CLIENT_ID`, `REDIRECT_URI` (or `REDIRECT_URL`),
//! `CREDENTIALS_PATH` (or `JSON_PATH`), `ACCOUNT_NUMBER`. A `.env` file is
//! loaded by the binary before these are read.

use crate::domain::error::AutotraderError;
use crate::domain::robot::RobotConfig;
use crate::ports::config_port::ConfigPort;

const SECTION: &str = "broker";

fn lookup(
    env: &dyn Fn(&str) -> Option<String>,
    config: &dyn ConfigPort,
    vars: &[&str],
    key: &str,
) -> Option<String> {
    let non_blank = |value: String| {
        let value = value.trim().to_string();
        (!value.is_empty()).then_some(value)
    };
    vars.iter()
        .find_map(|var| env(var).and_then(non_blank))
        .or_else(|| config.get_string(SECTION, key).and_then(non_blank))
}

/// Builds the robot configuration from `env` and `config`. Only the client
/// id is required.
pub fn robot_config_with(
    config: &dyn ConfigPort,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<RobotConfig, AutotraderError> {
    let client_id = lookup(env, config, &["CLIENT_ID"], "client_id").ok_or_else(|| {
        AutotraderError::ConfigMissing {
            section: SECTION.into(),
            key: "client_id".into(),
        }
    })?;
    Ok(RobotConfig {
        client_id,
        redirect_uri: lookup(env, config, &["REDIRECT_URI", "REDIRECT_URL"], "redirect_uri")
            .unwrap_or_default(),
        credentials_path: lookup(
            env,
            config,
            &["CREDENTIALS_PATH", "JSON_PATH"],
            "credentials_path",
        ),
        trading_account: lookup(env, config, &["ACCOUNT_NUMBER"], "account_number"),
        paper_trading: config.get_bool(SECTION, "paper_trading", true),
    })
}

/// [`robot_config_with`] over the process environment.
pub fn robot_config(config: &dyn ConfigPort) -> Result<RobotConfig, AutotraderError> {
    robot_config_with(config, &|var| std::env::var(var).ok())
}
