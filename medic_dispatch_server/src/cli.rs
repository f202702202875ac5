use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
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

fn display_envs() {
    // MDP_AUTH_SECRET and MDP_TELEGRAM_BOT_TOKEN are deliberately absent
    const DISPLAY_ENVS: [&str; 13] = [
        "RUST_LOG",
        "MDP_HOST",
        "MDP_PORT",
        "MDP_DATABASE_URL",
        "MDP_ACCESS_TOKEN_TTL",
        "MDP_NOTIFICATION_TIMEOUT_MS",
        "MDP_EVENT_BUFFER_SIZE",
        "MDP_REALTIME_BUFFER_SIZE",
        "MDP_PROVIDER_SEARCH_RADIUS_KM",
        "MDP_TELEGRAM_API_URL",
        "MDP_MOBILE_PUSH_URL",
        "MDP_WEB_PUSH_ENABLED",
        "MDP_WEB_PUSH_TTL",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
