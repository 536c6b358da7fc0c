use std::path::PathBuf;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "FINDER_CONFIG";

pub fn data_dir() -> PathBuf {
    // On macOS and Linux, use ~/.local/share/finder/ (XDG standard)
    // instead of macOS Application Support for consistency
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join("finder")
    }
    #[cfg(windows)]
    {
        // Portable layout: a `data` directory next to the executable wins
        if let Some(dir) = exe_sibling("data") {
            return dir;
        }

        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("finder")
    }
}

pub fn config_dir() -> PathBuf {
    #[cfg(windows)]
    {
        if exe_sibling("config.toml").is_some() {
            if let Some(dir) = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.to_path_buf()))
            {
                return dir;
            }
        }
    }

    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".config")
            .join("finder")
    }
    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("finder")
    }
}

/// Location of the config file, honouring `FINDER_CONFIG` when set.
pub fn config_file() -> PathBuf {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => config_dir().join("config.toml"),
    }
}

pub fn log_file() -> PathBuf {
    data_dir().join("finder.log")
}

#[cfg(windows)]
fn exe_sibling(name: &str) -> Option<PathBuf> {
    let exe_path = std::env::current_exe().ok()?;
    let candidate = exe_path.parent()?.join(name);
    candidate.exists().then_some(candidate)
}
