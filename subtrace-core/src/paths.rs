use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use dirs::home_dir;

use crate::error::{Result, TraceError};

const TRACE_FILE_NAME: &str = "subagent-trace.jsonl";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracePaths {
    pub agent_root: PathBuf,
}

impl TracePaths {
    pub fn new(agent_root: impl Into<PathBuf>) -> Self {
        Self {
            agent_root: agent_root.into(),
        }
    }

    pub fn from_env_or_home() -> Result<Self> {
        let home = home_dir().ok_or(TraceError::HomeDirectoryNotFound)?;
        Ok(Self::resolve(env::var_os("PI_CODING_AGENT_DIR"), &home))
    }

    // Precedence:
    // 1) PI_CODING_AGENT_DIR (pi coding agent root env)
    // 2) ~/.pi/agent (pi default)
    fn resolve(agent_dir: Option<OsString>, home: &Path) -> Self {
        let agent_root = agent_dir
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(".pi/agent"));
        Self::new(agent_root)
    }

    pub fn trace_file(&self) -> PathBuf {
        self.agent_root.join("logs").join(TRACE_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::path::{Path, PathBuf};

    use crate::paths::TracePaths;

    #[test]
    fn defaults_to_pi_agent_dir_under_home() {
        let paths = TracePaths::resolve(None, Path::new("/home/dev"));
        assert_eq!(
            paths.trace_file(),
            PathBuf::from("/home/dev/.pi/agent/logs/subagent-trace.jsonl")
        );
    }

    #[test]
    fn env_override_takes_precedence() {
        let paths = TracePaths::resolve(
            Some(OsString::from("/opt/agent")),
            Path::new("/home/dev"),
        );
        assert_eq!(
            paths.trace_file(),
            PathBuf::from("/opt/agent/logs/subagent-trace.jsonl")
        );
    }

    #[test]
    fn empty_env_override_is_ignored() {
        let paths = TracePaths::resolve(Some(OsString::new()), Path::new("/home/dev"));
        assert_eq!(paths.agent_root, PathBuf::from("/home/dev/.pi/agent"));
    }
}
