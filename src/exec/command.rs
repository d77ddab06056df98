// src/exec/command.rs

use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// Build a shell command appropriate for the platform.
pub fn shell(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

/// Run `cmd` as a filter: `input` on stdin, stdout returned as text.
///
/// A non-zero exit status is an error carrying the command's stderr.
pub async fn run_filter(cmd: &str, input: &str) -> Result<String> {
    debug!(cmd = %cmd, bytes = input.len(), "running filter command");

    let mut child = shell(cmd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("spawning filter command '{cmd}'"))?;

    // Feed stdin from a separate task so a chatty child cannot deadlock us
    // on a full stdout pipe.
    let stdin = child.stdin.take();
    let input = input.to_owned();
    let feeder = tokio::spawn(async move {
        if let Some(mut stdin) = stdin {
            stdin.write_all(input.as_bytes()).await?;
            stdin.shutdown().await?;
        }
        Ok::<(), std::io::Error>(())
    });

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for filter command '{cmd}'"))?;

    match feeder.await {
        Ok(Ok(())) => {}
        // The child may exit without reading all of its input.
        Ok(Err(err)) if err.kind() == std::io::ErrorKind::BrokenPipe => {}
        Ok(Err(err)) => return Err(err).context("writing filter stdin"),
        Err(join) => bail!("filter stdin writer panicked: {join}"),
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "command '{cmd}' exited with {}: {}",
            output.status.code().unwrap_or(-1),
            stderr.trim()
        );
    }

    String::from_utf8(output.stdout).with_context(|| format!("command '{cmd}' printed invalid UTF-8"))
}

/// Run `cmd` to completion, discarding its output.
pub async fn run_command(cmd: &str) -> Result<()> {
    info!(cmd = %cmd, "running command");

    let output = shell(cmd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("spawning command '{cmd}'"))?;

    for line in String::from_utf8_lossy(&output.stderr).lines() {
        debug!(cmd = %cmd, "stderr: {}", line);
    }

    if !output.status.success() {
        bail!(
            "command '{cmd}' exited with {}",
            output.status.code().unwrap_or(-1)
        );
    }
    Ok(())
}
