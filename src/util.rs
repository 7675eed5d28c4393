use sysinfo::System;

const ATELLA_SECRET: &str = "ATELLA_SECRET";

/// Shared secret from the environment, if set.
pub fn get_secret() -> Option<String> {
    let secret_from_env = std::env::var(ATELLA_SECRET);
    secret_from_env.ok()
}

const ATELLA_CONFIG: &str = "ATELLA_CONFIG";

const DEFAULT_CONFIG: &str = "/etc/atella/atella.json";

pub fn get_config_path() -> String {
    std::env::var(ATELLA_CONFIG).unwrap_or_else(|_| String::from(DEFAULT_CONFIG))
}

/// Configured hostname, falling back to the one reported by the OS.
pub fn resolve_hostname(configured: Option<&str>) -> Option<String> {
    match configured {
        Some(hostname) if !hostname.is_empty() => Some(hostname.to_string()),
        _ => System::host_name(),
    }
}
