use std::path::PathBuf;

const APP_DIR: &str = "laud";

/// Override for the config/data root, mainly for tests and portable installs.
pub const HOME_ENV: &str = "LAUD_HOME";

fn home_override() -> Option<PathBuf> {
    std::env::var_os(HOME_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

pub fn data_dir() -> PathBuf {
    if let Some(root) = home_override() {
        return root.join("data");
    }

    // On macOS and Linux, use ~/.local/share/laud/ (XDG standard)
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join(APP_DIR)
    }
    #[cfg(not(unix))]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }
}

pub fn config_dir() -> PathBuf {
    if let Some(root) = home_override() {
        return root;
    }

    // On macOS and Linux, always use ~/.config/laud/
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join(APP_DIR)
    }
    #[cfg(not(unix))]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }
}
