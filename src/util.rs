const WATCHPOST_CONFIG: &str = "WATCHPOST_CONFIG";

const DEFAULT_CONFIG: &str = "./watchpost.json";

pub fn get_default_config() -> String {
    DEFAULT_CONFIG.to_string()
}

pub fn get_config_path() -> String {
    std::env::var(WATCHPOST_CONFIG).unwrap_or_else(|_| get_default_config())
}

const WATCHPOST_SERVER: &str = "WATCHPOST_SERVER";

/// Server name of this unit: configured value, then `WATCHPOST_SERVER`, then
/// the host name.
pub fn get_server_name(configured: Option<&str>) -> String {
    if let Some(server) = configured {
        return server.to_string();
    }

    std::env::var(WATCHPOST_SERVER)
        .ok()
        .or_else(sysinfo::System::host_name)
        .unwrap_or_else(|| String::from("unknown"))
}
