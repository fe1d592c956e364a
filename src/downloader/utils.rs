// Helper functions shared by the external-tool collaborators

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration};

use crate::downloader::config::ToolsConfig;
use crate::downloader::errors::DownloadError;

/// Run command with timeout, capturing stdout and stderr
pub async fn run_output_with_timeout(
    program: &Path,
    args: Vec<OsString>,
    timeout_secs: u64,
) -> Result<std::process::Output, DownloadError> {
    let program_name = program.display().to_string();
    tracing::debug!(program = %program_name, ?args, "Spawning external command");

    let mut child = TokioCommand::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DownloadError::ToolNotFound(program_name.clone()),
            _ => DownloadError::ExecutionError(format!("Failed to start {}: {}", program_name, e)),
        })?;

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| {
        DownloadError::ExecutionError(format!("Failed to capture stdout from {}", program_name))
    })?;
    let mut stderr_pipe = child.stderr.take().ok_or_else(|| {
        DownloadError::ExecutionError(format!("Failed to capture stderr from {}", program_name))
    })?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    match timeout(Duration::from_secs(timeout_secs), child.wait()).await {
        Ok(status_res) => {
            let status = status_res.map_err(|e| {
                DownloadError::ExecutionError(format!("Failed to wait for {}: {}", program_name, e))
            })?;
            let stdout = join_pipe(stdout_task, "stdout").await?;
            let stderr = join_pipe(stderr_task, "stderr").await?;
            Ok(std::process::Output {
                status,
                stdout,
                stderr,
            })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(DownloadError::NetworkTimeout)
        }
    }
}

async fn join_pipe(
    task: tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
    pipe: &str,
) -> Result<Vec<u8>, DownloadError> {
    task.await
        .map_err(|e| DownloadError::ExecutionError(format!("{} task failed: {}", pipe, e)))?
        .map_err(|e| DownloadError::ExecutionError(format!("Failed to read {}: {}", pipe, e)))
}

/// Build proxy arguments for yt-dlp
pub fn get_proxy_args(config: &ToolsConfig) -> Vec<OsString> {
    let mut args = Vec::new();

    if let Some(proxy) = &config.proxy {
        args.push("--proxy".into());
        args.push(proxy.into());
    }

    args
}

/// Build timeout and cookie arguments for yt-dlp
pub fn get_network_args(config: &ToolsConfig) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--socket-timeout".into(),
        config.socket_timeout_secs.to_string().into(),
    ];

    if let Some(path) = &config.cookies_path {
        args.push("--cookies".into());
        args.push(path.into());
    }

    args.extend(get_proxy_args(config));
    args
}

/// Last few lines of tool output, for error messages
pub fn tail_lines(output: &[u8], lines: usize) -> String {
    let text = String::from_utf8_lossy(output);
    let collected: Vec<&str> = text.lines().rev().take(lines).collect();
    collected.into_iter().rev().collect::<Vec<_>>().join("\n")
}
