use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::{DownloadConfig, FfmpegConfig, ServerConfig};
use crate::error::{Result, TrimError};
use crate::models::{InputSource, TimeRange, TrimJob, TrimResult};
use crate::workspace::{input_file_name, output_file_name, Workspace};

/// Name of the downloaded input inside the workspace.
const URL_INPUT_NAME: &str = "input";

pub fn build_http_client(config: &DownloadConfig) -> Result<Client> {
    Client::builder()
        .timeout(config.timeout())
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .user_agent(concat!("scenetrim/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(TrimError::from)
}

fn write_error(e: std::io::Error) -> TrimError {
    TrimError::Download(format!("failed to store download: {e}"))
}

/// Streams `url` into `dest`, failing on non-2xx statuses and oversized bodies.
pub async fn download_to(client: &Client, url: &str, dest: &Path, max_bytes: u64) -> Result<u64> {
    let mut response = client.get(url).send().await?.error_for_status()?;

    if let Some(len) = response.content_length() {
        if len > max_bytes {
            return Err(TrimError::Download(format!(
                "remote file is {len} bytes, limit is {max_bytes}"
            )));
        }
    }

    let mut file = tokio::fs::File::create(dest).await.map_err(write_error)?;
    let mut written: u64 = 0;
    while let Some(chunk) = response.chunk().await? {
        written += chunk.len() as u64;
        if written > max_bytes {
            return Err(TrimError::Download(format!(
                "remote file exceeds limit of {max_bytes} bytes"
            )));
        }
        file.write_all(&chunk).await.map_err(write_error)?;
    }
    file.flush().await.map_err(write_error)?;

    Ok(written)
}

impl InputSource {
    /// Materializes the input inside `workspace` and returns its path.
    pub async fn resolve(
        &self,
        client: &Client,
        config: &ServerConfig,
        workspace: &Workspace,
    ) -> Result<PathBuf> {
        match self {
            InputSource::Url(url) => {
                let path = workspace.input_path(URL_INPUT_NAME);
                let bytes = download_to(client, url, &path, config.download.max_bytes).await?;
                tracing::debug!("downloaded {} bytes from {}", bytes, url);
                Ok(path)
            }
            InputSource::Upload { file_name, data } => {
                let name = input_file_name(file_name.as_deref(), &config.upload.default_filename);
                let path = workspace.input_path(&name);
                tokio::fs::write(&path, data).await?;
                tracing::debug!("stored {} uploaded bytes as {}", data.len(), name);
                Ok(path)
            }
        }
    }
}

/// Arguments for one ffmpeg trim-and-encode run.
#[derive(Debug, Clone)]
pub struct TrimCommand<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub range: TimeRange,
}

impl TrimCommand<'_> {
    pub fn args(&self, config: &FfmpegConfig) -> Vec<OsString> {
        vec![
            "-y".into(),
            "-i".into(),
            self.input.as_os_str().to_owned(),
            "-ss".into(),
            self.range.start().to_string().into(),
            "-to".into(),
            self.range.end().to_string().into(),
            "-vn".into(),
            "-acodec".into(),
            config.audio_codec.clone().into(),
            "-b:a".into(),
            config.audio_bitrate.clone().into(),
            self.output.as_os_str().to_owned(),
        ]
    }

    /// Runs ffmpeg to completion without blocking the runtime.
    ///
    /// The child is killed if this future is dropped.
    pub async fn run(&self, config: &FfmpegConfig) -> Result<()> {
        let args = self.args(config);
        tracing::debug!("running {} {:?}", config.binary.display(), args);

        let output = Command::new(&config.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| TrimError::ToolUnavailable {
                tool: config.binary.display().to_string(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!("ffmpeg exited with {}", output.status);
            return Err(TrimError::Transcode {
                tail: stderr_tail(&stderr, config.stderr_tail_chars).to_string(),
            });
        }

        Ok(())
    }
}

/// The last `max_chars` characters of `stderr`.
pub fn stderr_tail(stderr: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return "";
    }
    match stderr.char_indices().rev().nth(max_chars - 1) {
        Some((idx, _)) => &stderr[idx..],
        None => stderr,
    }
}

/// A produced file together with the workspace that holds it.
#[derive(Debug)]
pub struct TrimOutput {
    pub result: TrimResult,
    pub workspace: Workspace,
}

pub async fn process_trim_job(
    job: TrimJob,
    client: &Client,
    config: &ServerConfig,
) -> Result<TrimOutput> {
    let started = Instant::now();
    let workspace = Workspace::allocate(&config.workspace)?;
    tracing::debug!("allocated workspace {}", workspace.path().display());

    let input = job.source.resolve(client, config, &workspace).await?;

    let file_name = output_file_name(job.scene_index);
    let output = workspace.output_path(&file_name);

    TrimCommand {
        input: &input,
        output: &output,
        range: job.range,
    }
    .run(&config.ffmpeg)
    .await?;

    tracing::info!(
        "trimmed {:.3}s..{:.3}s ({:.3}s) into {} in {:.2?}",
        job.range.start(),
        job.range.end(),
        job.range.duration(),
        file_name,
        started.elapsed()
    );

    Ok(TrimOutput {
        result: TrimResult {
            path: output,
            media_type: "audio/mpeg",
            file_name,
        },
        workspace,
    })
}
