use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = discover_project_root();
        let user_data_dir = discover_user_data_dir(&project_root);
        Self::with_dirs(project_root, user_data_dir)
    }

    /// Builds the layout from explicit directories, creating the data and log
    /// dirs if needed.
    pub fn with_dirs(project_root: PathBuf, user_data_dir: PathBuf) -> Self {
        let log_dir = user_data_dir.join("logs");
        let secrets_path = user_data_dir.join("secrets.yaml");

        for dir in [&user_data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            project_root,
            user_data_dir,
            log_dir,
            secrets_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_project_root() -> PathBuf {
    if let Some(root) = env_path("RAG_ASSISTANT_ROOT") {
        return root;
    }

    // Working directory first, then the crate dir.
    let cwd = env::current_dir().ok();
    if let Some(dir) = cwd.as_ref().filter(|dir| dir.join("config.yml").exists()) {
        return dir.clone();
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("config.yml").exists() {
        return manifest_dir;
    }

    cwd.unwrap_or(manifest_dir)
}

/// Debug builds keep data next to the project; release builds use the
/// platform data directory.
fn discover_user_data_dir(project_root: &Path) -> PathBuf {
    if let Some(dir) = env_path("RAG_ASSISTANT_DATA_DIR") {
        return dir;
    }
    if cfg!(debug_assertions) {
        return project_root.join("data");
    }

    match env::consts::OS {
        "windows" => env_path("LOCALAPPDATA")
            .unwrap_or_else(|| PathBuf::from("."))
            .join("RagAssistant"),
        "macos" => env_path("HOME")
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Library/Application Support/RagAssistant"),
        _ => env_path("XDG_DATA_HOME")
            .or_else(|| env_path("HOME").map(|home| home.join(".local/share")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rag-assistant"),
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_dirs_derives_log_and_secrets_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data = dir.path().join("data");

        let paths = AppPaths::with_dirs(dir.path().to_path_buf(), data.clone());

        assert_eq!(paths.log_dir, data.join("logs"));
        assert_eq!(paths.secrets_path, data.join("secrets.yaml"));
        assert!(paths.log_dir.is_dir());
    }
}
