use crate::constants::PROMPTDECK_CLI;
use confy::ConfyError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::env::home_dir;
use std::path::PathBuf;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PromptDeckConfig {
    pub library_path: String,
    pub state_dir: String,
}

impl Default for PromptDeckConfig {
    fn default() -> Self {
        let base_path = home_dir()
            .map(|p| p.join(PROMPTDECK_CLI))
            .unwrap_or_else(|| PathBuf::from(PROMPTDECK_CLI));

        Self {
            library_path: base_path.join("prompts.json").display().to_string(),
            state_dir: base_path.join("state").display().to_string(),
        }
    }
}

/// Where the library file and the saved state live for this run.
#[derive(Debug, Clone, PartialEq)]
pub struct Paths {
    pub library_path: PathBuf,
    pub state_dir: PathBuf,
}

impl PromptDeckConfig {
    /// Command line flags win over the configured values.
    pub fn resolve(self, library: Option<PathBuf>, state_dir: Option<PathBuf>) -> Paths {
        Paths {
            library_path: library.unwrap_or_else(|| PathBuf::from(self.library_path)),
            state_dir: state_dir.unwrap_or_else(|| PathBuf::from(self.state_dir)),
        }
    }
}

pub fn get_paths(library: Option<PathBuf>, state_dir: Option<PathBuf>) -> Paths {
    let config: Result<PromptDeckConfig, ConfyError> = confy::load(PROMPTDECK_CLI, None);
    match config {
        Ok(config) => {
            let paths = config.resolve(library, state_dir);
            debug!("Using {:?}", paths);
            paths
        }
        Err(e) => {
            eprintln!("Error: Problem loading config ({}). Exiting...", e);
            std::process::exit(exitcode::CONFIG);
        }
    }
}
