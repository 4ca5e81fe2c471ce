//! Process-lifetime solver configuration, read once from the environment.
//!
//! Mirrors `tbnexplorer2/config.py`: an optional adjacent `.env` file supplies
//! defaults for keys the process environment does not already define. Unlike
//! the source, this never mutates the process environment — `.env` values are
//! parsed into a local map and consulted only as a fallback.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub normaliz_path: PathBuf,
    pub fourtitwo_path: PathBuf,
    pub coffee_path: PathBuf,
    pub nupack_concentrations_path: PathBuf,
}

const DEFAULT_NORMALIZ: &str = "normaliz";
const DEFAULT_FOURTITWO: &str = "4ti2";
const DEFAULT_COFFEE: &str = "coffee-cli";
const DEFAULT_NUPACK: &str = "concentrations";

impl SolverConfig {
    /// Loads configuration from the process environment, falling back to an
    /// optional `.env` file located in `dotenv_dir` (typically the current
    /// working directory), then to hard-coded defaults.
    pub fn load(dotenv_dir: &Path) -> Self {
        let dotenv = read_dotenv(&dotenv_dir.join(".env"));
        let lookup = |key: &str, default: &str| -> PathBuf {
            PathBuf::from(
                env::var(key)
                    .ok()
                    .or_else(|| dotenv.get(key).cloned())
                    .unwrap_or_else(|| default.to_string()),
            )
        };

        Self {
            normaliz_path: lookup("NORMALIZ_PATH", DEFAULT_NORMALIZ),
            fourtitwo_path: lookup("FOURTI2_PATH", DEFAULT_FOURTITWO),
            coffee_path: lookup("COFFEE_CLI_PATH", DEFAULT_COFFEE),
            nupack_concentrations_path: lookup("NUPACK_CONCENTRATIONS_PATH", DEFAULT_NUPACK),
        }
    }
}

fn read_dotenv(path: &Path) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let Ok(content) = std::fs::read_to_string(path) else {
        return map;
    };
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            map.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn dotenv_is_used_only_as_fallback() {
        let dir = tempdir();
        let mut f = std::fs::File::create(dir.join(".env")).unwrap();
        writeln!(f, "NORMALIZ_PATH=/opt/normaliz\nCOFFEE_CLI_PATH=/opt/coffee").unwrap();

        env::remove_var("NORMALIZ_PATH");
        env::set_var("COFFEE_CLI_PATH", "/usr/bin/coffee");

        let cfg = SolverConfig::load(&dir);
        assert_eq!(cfg.normaliz_path, PathBuf::from("/opt/normaliz"));
        assert_eq!(cfg.coffee_path, PathBuf::from("/usr/bin/coffee"));

        env::remove_var("COFFEE_CLI_PATH");
        std::fs::remove_dir_all(dir).ok();
    }

    fn tempdir() -> PathBuf {
        let mut dir = env::temp_dir();
        dir.push(format!("tbn-core-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
