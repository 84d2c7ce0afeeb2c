//! Process invocations: permission changes, version probes and install steps.

use kubetools_core::{Error, Result};
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Mark a file as executable (`0o755`).
pub(crate) fn make_executable(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)?.permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms)?;
    }
    #[cfg(not(unix))]
    {
        std::fs::metadata(path)?;
    }
    Ok(())
}

/// Run `program` with `args` and return its combined stdout and stderr.
///
/// `path` replaces the child's `PATH` when given.
///
/// # Errors
///
/// Returns an error message if the program cannot be spawned or exits with
/// a non-zero status.
pub async fn run_capture(
    program: impl AsRef<OsStr>,
    args: &[impl AsRef<OsStr>],
    path: Option<&OsStr>,
) -> std::result::Result<String, String> {
    run_capture_with_home(program, args, path, None).await
}

/// [`run_capture`] with `HOME` replaced by `home` when given.
///
/// # Errors
///
/// Returns an error message if the program cannot be spawned or exits with
/// a non-zero status.
pub async fn run_capture_with_home(
    program: impl AsRef<OsStr>,
    args: &[impl AsRef<OsStr>],
    path: Option<&OsStr>,
    home: Option<&Path>,
) -> std::result::Result<String, String> {
    let program = program.as_ref();
    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null());
    if let Some(path) = path {
        command.env("PATH", path);
    }
    if let Some(home) = home {
        command.env("HOME", home);
    }

    let output = command
        .output()
        .await
        .map_err(|e| format!("Failed to run {}: {e}", program.to_string_lossy()))?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if output.status.success() {
        Ok(combined)
    } else {
        Err(format!(
            "{} exited with {}: {}",
            program.to_string_lossy(),
            output.status,
            combined.trim()
        ))
    }
}

/// Whether a version report mentions `version`.
#[must_use]
pub fn reports_version(output: &str, version: &str) -> bool {
    !version.is_empty() && output.contains(version)
}

/// Ask an installed binary for its version.
pub(crate) async fn probe_version(tool: &str, binary: &Path, args: &[String]) -> Result<String> {
    debug!(tool, ?binary, ?args, "Probing installed version");
    run_capture(binary, args, None)
        .await
        .map_err(|message| Error::version_check(tool, message))
}

/// Run a self-installing tool's installer with `HOME` pointing at `home`.
pub(crate) async fn self_install(
    tool: &str,
    installer: &Path,
    args: &[String],
    home: &Path,
) -> Result<()> {
    debug!(tool, ?installer, ?args, ?home, "Running self-install");

    let output = Command::new(installer)
        .args(args)
        .env("HOME", home)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| Error::install(tool, format!("Failed to run installer: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::install(
            tool,
            format!("installer exited with {}: {}", output.status, stderr.trim()),
        ));
    }

    Ok(())
}

/// Copy `source` to `dest` with `install -m <mode>`, prefixed by the
/// elevation command when one is configured.
pub(crate) async fn elevated_install(
    tool: &str,
    elevate_with: Option<&str>,
    source: &Path,
    dest: &Path,
    mode: u32,
) -> Result<()> {
    let mode = format!("{mode:o}");
    let mut words: Vec<&str> = elevate_with
        .map(|e| e.split_whitespace().collect())
        .unwrap_or_default();
    words.push("install");

    let (program, prefix) = words
        .split_first()
        .ok_or_else(|| Error::permission(tool, dest, "empty install command"))?;

    debug!(tool, program, ?source, ?dest, %mode, "Running elevated install");

    let output = Command::new(program)
        .args(prefix)
        .args(["-m", mode.as_str()])
        .arg(source)
        .arg(dest)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| Error::permission(tool, dest, format!("Failed to run {program}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::permission(
            tool,
            dest,
            format!("{program} install exited with {}: {}", output.status, stderr.trim()),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reports_version() {
        assert!(reports_version(
            "yq (https://github.com/mikefarah/yq/) version v4.40.5",
            "4.40.5"
        ));
        assert!(!reports_version("yq version v4.35.1", "4.40.5"));
        assert!(!reports_version("anything", ""));
    }

    #[cfg(unix)]
    #[test]
    fn test_make_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let file = temp.path().join("kubectl");
        std::fs::write(&file, b"bin").unwrap();

        make_executable(&file).unwrap();
        let mode = std::fs::metadata(&file).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_make_executable_missing_file() {
        let temp = TempDir::new().unwrap();
        assert!(make_executable(&temp.path().join("missing")).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_capture_combines_streams() {
        let out = run_capture("sh", &["-c", "echo out; echo err >&2"], None)
            .await
            .unwrap();
        assert!(out.contains("out"));
        assert!(out.contains("err"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_capture_reports_failure() {
        let err = run_capture("sh", &["-c", "echo broken >&2; exit 3"], None)
            .await
            .unwrap_err();
        assert!(err.contains("broken"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_capture_with_home() {
        let temp = TempDir::new().unwrap();
        let out = run_capture_with_home("sh", &["-c", "echo $HOME"], None, Some(temp.path()))
            .await
            .unwrap();
        assert_eq!(out.trim(), temp.path().to_string_lossy());
    }

    #[tokio::test]
    async fn test_run_capture_missing_program() {
        let err = run_capture("kubetools-definitely-missing", &["--version"], None)
            .await
            .unwrap_err();
        assert!(err.contains("Failed to run"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_elevated_install_without_elevation() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let source = temp.path().join("argocd-linux-amd64");
        let dest = temp.path().join("argocd");
        std::fs::write(&source, b"argocd").unwrap();

        elevated_install("argocd", None, &source, &dest, 0o555)
            .await
            .unwrap();

        let mode = std::fs::metadata(&dest).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o555);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_elevated_install_failure_is_permission_error() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("argocd-linux-amd64");
        std::fs::write(&source, b"argocd").unwrap();

        let err = elevated_install("argocd", Some("false"), &source, &temp.path().join("argocd"), 0o555)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Permission { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_self_install_sets_home() {
        let temp = TempDir::new().unwrap();
        let home = temp.path().join("home");
        std::fs::create_dir_all(&home).unwrap();

        let installer = temp.path().join("installer");
        std::fs::write(&installer, "#!/bin/sh\ntouch \"$HOME/installed-$1\"\n").unwrap();
        make_executable(&installer).unwrap();

        self_install("krew", &installer, &["krew".to_string()], &home)
            .await
            .unwrap();
        assert!(home.join("installed-krew").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_self_install_failure() {
        let temp = TempDir::new().unwrap();
        let installer = temp.path().join("installer");
        std::fs::write(&installer, "#!/bin/sh\necho nope >&2\nexit 1\n").unwrap();
        make_executable(&installer).unwrap();

        let err = self_install("krew", &installer, &[], temp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Install { .. }));
        assert!(err.to_string().contains("nope"));
    }
}
