//! Workspace resolution for stepwise.
//!
//! A workspace is a directory holding `stepwise.yaml` (optional), the skill
//! registry file and the plans directory. Every command resolves one
//! [`Workspace`] first so that all paths agree regardless of where the
//! command is invoked from.

use crate::config::Config;
use crate::error::{Result, StepwiseError};
use crate::skills::SkillsConfig;
use std::env;
use std::path::{Path, PathBuf};

/// Config file name at the workspace root.
pub const CONFIG_FILE: &str = "stepwise.yaml";

/// Resolved paths and configuration for one workspace. All paths are absolute
/// when the root is.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub config: Config,
    pub plans_dir: PathBuf,
    pub skills_path: PathBuf,
}

impl Workspace {
    /// Resolve the workspace at `root`, or at the current directory when
    /// `root` is `None`.
    pub fn resolve(root: Option<&Path>) -> Result<Self> {
        match root {
            Some(root) => Self::resolve_from(root),
            None => {
                let cwd = env::current_dir().map_err(|e| {
                    StepwiseError::UserError(format!(
                        "failed to get current working directory: {}",
                        e
                    ))
                })?;
                Self::resolve_from(&cwd)
            }
        }
    }

    /// Resolve the workspace rooted at `root`, loading `stepwise.yaml` if
    /// present.
    pub fn resolve_from<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(StepwiseError::UserError(format!(
                "workspace root '{}' is not a directory",
                root.display()
            )));
        }

        let config = Config::load_or_default(root.join(CONFIG_FILE))?;
        let plans_dir = join_relative(root, &config.plans_dir);
        let skills_path = join_relative(root, &config.skills_file);

        Ok(Self {
            root: root.to_path_buf(),
            config,
            plans_dir,
            skills_path,
        })
    }

    /// Get the path to the config file.
    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Load the skill registry, or an empty one if the file does not exist.
    pub fn load_skills(&self) -> Result<SkillsConfig> {
        Ok(SkillsConfig::load(&self.skills_path)?.unwrap_or_default())
    }
}

fn join_relative(root: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
