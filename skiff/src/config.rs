use std::path::{Path, PathBuf};

/// Default config file location: `~/.config/skiff/config.yaml`
pub fn get_default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("skiff").join("config.yaml"))
}

/// Pick the configuration file to load.
///
/// An explicit path (flag or `SKIFF_CONFIG`, which clap folds into the flag)
/// is always returned so a missing file is reported. The default location is
/// only used when the file exists.
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    resolve_config_path_from(cli_path, get_default_config_path())
}

fn resolve_config_path_from(cli_path: Option<&Path>, default: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    default.filter(|path| path.is_file())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
