use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("halftype"),
            )
        } else {
            ProjectDirs::from("", "", "halftype").map(|pd| pd.data_local_dir().to_path_buf())
        }
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "halftype").map(|pd| pd.config_dir().join("config.json"))
    }

    pub fn history_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("history.csv"))
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("halftype.log"))
    }
}
