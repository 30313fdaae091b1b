use std::{
    ffi::OsStr,
    io::Write,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tokio::process::Command;

/// Snapshot of a process description, written ahead of its output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInfo {
    /// Program resolved through `PATH` when given as a bare name; kept verbatim otherwise.
    pub exe_path: String,
    /// Full argument vector, `argv[0]` included.
    pub args: Vec<String>,
    /// Working directory; empty when inherited.
    pub workdir: String,
    /// Explicitly set environment as `KEY=VALUE`; removed variables are skipped.
    pub env: Vec<String>,
}

impl CommandInfo {
    pub fn from_command(cmd: &Command) -> Self {
        let std_cmd = cmd.as_std();
        let program = std_cmd.get_program();
        Self {
            exe_path: resolve_program(program, command_path(cmd))
                .to_string_lossy()
                .into_owned(),
            args: std::iter::once(program)
                .chain(std_cmd.get_args())
                .map(|a| a.to_string_lossy().into_owned())
                .collect(),
            workdir: std_cmd
                .get_current_dir()
                .map(|d| d.to_string_lossy().into_owned())
                .unwrap_or_default(),
            env: std_cmd
                .get_envs()
                .filter_map(|(k, v)| {
                    v.map(|v| format!("{}={}", k.to_string_lossy(), v.to_string_lossy()))
                })
                .collect(),
        }
    }

    /// Write as indented JSON followed by a newline.
    pub fn write_pretty<W: Write>(&self, mut w: W) -> Result<(), serde_json::Error> {
        serde_json::to_writer_pretty(&mut w, self)?;
        w.write_all(b"\n").map_err(serde_json::Error::io)
    }
}

/// `PATH` the child will search: its own when set, ours otherwise.
fn command_path(cmd: &Command) -> Option<std::ffi::OsString> {
    cmd.as_std()
        .get_envs()
        .find(|(k, _)| *k == OsStr::new("PATH"))
        .and_then(|(_, v)| v.map(OsStr::to_os_string))
        .or_else(|| std::env::var_os("PATH"))
}

fn resolve_program(program: &OsStr, path: Option<std::ffi::OsString>) -> PathBuf {
    let as_path = Path::new(program);
    if as_path.components().count() != 1 {
        return as_path.to_path_buf();
    }
    path.iter()
        .flat_map(|dirs| std::env::split_paths(dirs))
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
        .unwrap_or_else(|| as_path.to_path_buf())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_of_a_command() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5").current_dir("/tmp").env_clear().env("PATH", "/bin");

        let info = CommandInfo::from_command(&cmd);
        assert_eq!(info.args, vec!["sleep", "5"]);
        assert_eq!(info.workdir, "/tmp");
        assert_eq!(info.env, vec!["PATH=/bin"]);
    }

    #[cfg(unix)]
    #[test]
    fn bare_program_is_resolved_through_the_command_path() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("mytool");
        std::fs::write(&tool, "#!/bin/sh\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let mut cmd = Command::new("mytool");
        cmd.env_clear()
            .env("PATH", format!("/nonexistent:{}", dir.path().display()));

        let info = CommandInfo::from_command(&cmd);
        assert_eq!(info.exe_path, tool.to_string_lossy());
        assert_eq!(info.args, vec!["mytool"]);
    }

    #[test]
    fn explicit_or_unknown_programs_are_kept_verbatim() {
        let mut cmd = Command::new("/opt/cmdvisor/no-such-tool");
        cmd.env_clear().env("PATH", "/bin");
        assert_eq!(
            CommandInfo::from_command(&cmd).exe_path,
            "/opt/cmdvisor/no-such-tool"
        );

        let mut cmd = Command::new("cmdvisor-surely-not-installed");
        cmd.env_clear().env("PATH", "/bin:/usr/bin");
        assert_eq!(
            CommandInfo::from_command(&cmd).exe_path,
            "cmdvisor-surely-not-installed"
        );
    }

    #[test]
    fn json_uses_stable_keys() {
        let info = CommandInfo {
            exe_path: "/bin/sleep".into(),
            args: vec!["sleep".into(), "5".into()],
            workdir: String::new(),
            env: vec![],
        };

        let mut buf = Vec::new();
        info.write_pretty(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.ends_with("}\n"));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["exe_path"], "/bin/sleep");
        assert_eq!(value["args"][1], "5");
        assert_eq!(value["workdir"], "");
        assert!(value["env"].as_array().unwrap().is_empty());
    }
}
