//! OpenSSH-backed remote-copy channel.
//!
//! `connect` opens a multiplexed master connection (`ssh -M`) on a private
//! control socket; directory creation and every `scp` transfer reuse it, and
//! `close` tears it down. With a non-empty password the programs are wrapped
//! in `sshpass -e`, which reads the password from `SSHPASS` so it never shows
//! up in a process listing.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use frs_publish_core::contract::{Credentials, RemoteCopy, RemoteCopySession};
use frs_publish_core::error::RemoteCopyError;

static SESSIONS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone)]
pub struct OpenSshCopy {
    pub ssh: PathBuf,
    pub scp: PathBuf,
    pub sshpass: PathBuf,
    /// Extra `-o` options passed to every invocation, e.g. `StrictHostKeyChecking=accept-new`.
    pub options: Vec<String>,
}

impl Default for OpenSshCopy {
    fn default() -> Self {
        Self {
            ssh: PathBuf::from("ssh"),
            scp: PathBuf::from("scp"),
            sshpass: PathBuf::from("sshpass"),
            options: vec!["StrictHostKeyChecking=accept-new".to_string()],
        }
    }
}

#[async_trait]
impl RemoteCopy for OpenSshCopy {
    async fn connect(
        &self,
        host: &str,
        credentials: &Credentials,
    ) -> Result<Box<dyn RemoteCopySession>, RemoteCopyError> {
        let control_path = std::env::temp_dir().join(format!(
            "frs-publish-{}-{}.sock",
            std::process::id(),
            SESSIONS.fetch_add(1, Ordering::Relaxed)
        ));
        let session = OpenSshSession {
            tools: self.clone(),
            user: credentials.user.clone(),
            host: host.to_string(),
            password: Some(credentials.password.clone()).filter(|p| !p.is_empty()),
            control_path,
        };

        info!(host, user = %session.user, "[UPLOAD] Opening ssh master connection");
        let mut args = session.common_args();
        args.extend(["-M", "-f", "-N", "-o", "ControlPersist=yes"].map(OsString::from));
        args.push(session.destination().into());
        session.start_master(args).await?;
        Ok(Box::new(session))
    }
}

struct OpenSshSession {
    tools: OpenSshCopy,
    user: String,
    host: String,
    password: Option<String>,
    control_path: PathBuf,
}

impl OpenSshSession {
    fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    fn common_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-o".into()];
        let mut control = OsString::from("ControlPath=");
        control.push(&self.control_path);
        args.push(control);
        for option in &self.tools.options {
            args.push("-o".into());
            args.push(option.into());
        }
        args
    }

    fn command(&self, program: &Path) -> Command {
        match &self.password {
            Some(password) => {
                let mut c = Command::new(&self.tools.sshpass);
                c.arg("-e").arg(program).env("SSHPASS", password);
                c
            }
            None => Command::new(program),
        }
    }

    /// `ssh -f` keeps running after authentication, so its output is not
    /// captured; only the exit status of the foreground part is checked.
    async fn start_master(&self, args: Vec<OsString>) -> Result<(), RemoteCopyError> {
        let described = describe(&self.tools.ssh, &args);
        debug!(command = %described, "[UPLOAD] Running");
        let status = self
            .command(&self.tools.ssh)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;
        if status.success() {
            return Ok(());
        }
        Err(RemoteCopyError::Command {
            command: described,
            status: status.to_string(),
            stderr: String::new(),
        })
    }

    async fn run(&self, program: &Path, args: Vec<OsString>) -> Result<(), RemoteCopyError> {
        let described = describe(program, &args);
        let mut command = self.command(program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        debug!(command = %described, "[UPLOAD] Running");
        let output = command.output().await?;
        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.contains("Permission denied") {
            return Err(RemoteCopyError::Authentication {
                user: self.user.clone(),
                host: self.host.clone(),
            });
        }
        Err(RemoteCopyError::Command {
            command: described,
            status: output.status.to_string(),
            stderr,
        })
    }
}

#[async_trait]
impl RemoteCopySession for OpenSshSession {
    async fn make_directories(&self, remote_dir: &str) -> Result<(), RemoteCopyError> {
        let mut args = self.common_args();
        args.push(self.destination().into());
        args.push(format!("mkdir -p '{}'", remote_dir.replace('\'', r"'\''")).into());
        self.run(&self.tools.ssh, args).await
    }

    async fn put(&self, local: &Path, remote: &str) -> Result<(), RemoteCopyError> {
        let mut args = self.common_args();
        args.push("-q".into());
        args.push(local.as_os_str().to_owned());
        args.push(format!("{}:{}", self.destination(), remote).into());
        self.run(&self.tools.scp, args).await
    }

    async fn close(&self) -> Result<(), RemoteCopyError> {
        let mut args = self.common_args();
        args.extend(["-O", "exit"].map(OsString::from));
        args.push(self.destination().into());
        let result = self.run(&self.tools.ssh, args).await;
        if let Err(e) = std::fs::remove_file(&self.control_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(error = ?e, path = %self.control_path.display(), "[UPLOAD] Could not remove control socket");
            }
        }
        result
    }
}

/// The command line as it can be logged: the password only ever travels in
/// the environment.
fn describe(program: &Path, args: &[OsString]) -> String {
    std::iter::once(program.as_os_str())
        .chain(args.iter().map(OsString::as_os_str))
        .map(|a| a.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
