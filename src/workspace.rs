//! Per-request scratch directories.
//!
//! A [`Workspace`] wraps a [`TempDir`]; the directory and everything in it
//! is removed when the workspace is dropped. The response body keeps the
//! workspace alive through [`WorkspaceFile`] until the output has been sent.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use tempfile::TempDir;
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};
use uuid::Uuid;

use crate::config::WorkspaceConfig;

#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Creates a fresh uniquely named directory under the configured root.
    pub fn allocate(config: &WorkspaceConfig) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(&config.prefix);
        let dir = match &config.root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn input_path(&self, file_name: &str) -> PathBuf {
        self.dir.path().join(file_name)
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.dir.path().join(file_name)
    }

    /// Opens a file inside the workspace for streaming; the returned reader
    /// owns the workspace.
    pub async fn into_file(self, path: &Path) -> io::Result<WorkspaceFile> {
        let file = File::open(path).await?;
        Ok(WorkspaceFile {
            file,
            _workspace: self,
        })
    }
}

/// `scene_<index>.mp3`, or `scene_<random hex>.mp3` without an index.
pub fn output_file_name(scene_index: Option<i64>) -> String {
    match scene_index {
        Some(index) => format!("scene_{index}.mp3"),
        None => format!("scene_{}.mp3", Uuid::new_v4().simple()),
    }
}

/// Reduces a client supplied filename to a single safe path component.
pub fn sanitize_file_name(name: Option<&str>, default: &str) -> String {
    name.and_then(|n| {
        // Clients on Windows send backslash separated paths.
        let n = n.rsplit(['/', '\\']).next().unwrap_or_default();
        match Path::new(n).components().next() {
            Some(Component::Normal(c)) => c.to_str().map(str::to_string),
            _ => None,
        }
    })
    .unwrap_or_else(|| default.to_string())
}

/// Input filename for an upload: a fixed `input` stem that keeps the
/// extension of the sanitized client name, so it never matches an output
/// name.
pub fn input_file_name(name: Option<&str>, default: &str) -> String {
    let name = sanitize_file_name(name, default);
    match Path::new(&name).extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("input.{ext}"),
        None => "input".to_string(),
    }
}

/// An open file that also holds its workspace alive.
#[derive(Debug)]
pub struct WorkspaceFile {
    file: File,
    _workspace: Workspace,
}

impl AsyncRead for WorkspaceFile {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.file).poll_read(cx, buf)
    }
}
