//! Process-level settings shared by sessions and one-shot invocations.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Environment variable that overrides the executable in [`Config::from_env`].
pub const ENV_EXECUTABLE: &str = "HGCMD_HG";

/// How to launch Mercurial.
///
/// Defaults: `hg` from `PATH`, `HGPLAIN=1`, no extra environment.
#[derive(Debug, Clone)]
#[must_use]
pub struct Config {
    /// Path or name of the Mercurial executable.
    executable: PathBuf,
    /// Set `HGPLAIN=1` so user config cannot alter output formats.
    plain: bool,
    /// Extra environment variables for every spawned process.
    env: Vec<(OsString, OsString)>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new("hg")
    }
}

impl Config {
    /// Creates a config that launches `executable`.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            plain: true,
            env: Vec::new(),
        }
    }

    /// Default config, with the executable taken from `HGCMD_HG` if set.
    pub fn from_env() -> Self {
        std::env::var_os(ENV_EXECUTABLE)
            .filter(|v| !v.is_empty())
            .map_or_else(Self::default, Self::new)
    }

    /// Enables or disables `HGPLAIN=1` (default: enabled).
    pub const fn plain(mut self, enable: bool) -> Self {
        self.plain = enable;
        self
    }

    /// Adds an environment variable for spawned processes.
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Path or name of the Mercurial executable.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Builds a [`Command`] for the executable with the standard environment.
    pub(crate) fn command(&self) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.env("HGENCODING", "UTF-8");
        if self.plain {
            cmd.env("HGPLAIN", "1");
        }
        for (k, v) in &self.env {
            cmd.env(k, v);
        }
        hide_console(&mut cmd);
        cmd
    }
}

#[cfg(windows)]
fn hide_console(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;

    /// `CREATE_NO_WINDOW` process creation flag.
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console(_cmd: &mut Command) {}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::*;

    #[test]
    fn command_sets_encoding_and_plain() {
        let cmd = Config::new("/opt/hg/bin/hg").env("HGUSER", "test").command();
        assert_eq!(cmd.get_program(), "/opt/hg/bin/hg");
        let envs: Vec<_> = cmd.get_envs().collect();
        assert!(envs.contains(&(OsStr::new("HGENCODING"), Some(OsStr::new("UTF-8")))));
        assert!(envs.contains(&(OsStr::new("HGPLAIN"), Some(OsStr::new("1")))));
        assert!(envs.contains(&(OsStr::new("HGUSER"), Some(OsStr::new("test")))));
    }

    #[test]
    fn plain_can_be_disabled() {
        let cmd = Config::default().plain(false).command();
        assert!(cmd.get_envs().all(|(k, _)| k != "HGPLAIN"));
    }
}
