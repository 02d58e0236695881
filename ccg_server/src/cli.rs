use std::{env, env::VarError};

/// There's no real CLI for the server, so any argument prints the help and the current configuration.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

// Only these are printed. API keys and shared secrets must never appear here.
const DISPLAY_ENVS: [&str; 16] = [
    "RUST_LOG",
    "CCG_HOST",
    "CCG_PORT",
    "CCG_DATABASE_URL",
    "CCG_USE_X_FORWARDED_FOR",
    "CCG_USE_FORWARDED",
    "CCG_WEBHOOK_IP_WHITELIST",
    "CCG_COINBASE_API_URL",
    "CCG_COINBASE_API_VERSION",
    "CCG_COINBASE_TIMEOUT_SECS",
    "CCG_COINBASE_REDIRECT_URL",
    "CCG_COINBASE_CANCEL_URL",
    "CCG_CURRENCY",
    "CCG_SHOP_NAME",
    "CCG_PAYMENT_CLAIM_TIMEOUT_SECS",
    "CCG_COINBASE_API_KEY",
];

/// Credentials are reported as set or not set, never by value.
const REDACTED_ENVS: [&str; 1] = ["CCG_COINBASE_API_KEY"];

fn display_envs() {
    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| println!("  {name:<35} {:<15}", env_value(name)));
}

fn env_value(name: &str) -> String {
    match env::var(name) {
        Ok(s) if REDACTED_ENVS.contains(&name) && !s.is_empty() => "Set (hidden)".into(),
        Ok(s) => s,
        Err(VarError::NotPresent) => "Not set".into(),
        Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
    }
}
