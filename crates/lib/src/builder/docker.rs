//! [`ImageBuilder`] backed by the `docker` CLI.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::consts::OUTPUT_INDENT;

use super::types::{BuildRequest, BuilderError, DockerfileSource, ImageBuilder};

/// Runs `docker pull`, `docker tag` and `docker build`.
///
/// Child output is passed through to stderr line by line, indented so it
/// nests under the log lines. The child is killed if the calling future is dropped.
#[derive(Debug, Clone)]
pub struct DockerBuilder {
  program: String,
}

impl Default for DockerBuilder {
  fn default() -> Self {
    Self::new("docker")
  }
}

impl DockerBuilder {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
    }
  }

  pub fn program(&self) -> &str {
    &self.program
  }

  /// Arguments for `docker build`, without the program name.
  pub fn build_args(request: &BuildRequest) -> Vec<String> {
    let mut args = vec!["build".to_string()];
    for (key, value) in &request.build_args {
      args.push("--build-arg".to_string());
      args.push(format!("{key}={value}"));
    }
    for tag in &request.tags {
      args.push("--tag".to_string());
      args.push(tag.clone());
    }
    args.push("-f".to_string());
    match &request.dockerfile {
      DockerfileSource::Inline(_) => args.push("-".to_string()),
      DockerfileSource::Path(path) => args.push(path.display().to_string()),
    }
    args.push(request.context.display().to_string());
    args
  }

  async fn run(&self, args: Vec<String>, stdin: Option<&str>) -> Result<(), BuilderError> {
    let command_line = format!("{} {}", self.program, args.join(" "));
    debug!(command = %command_line, "running builder");

    let mut command = Command::new(&self.program);
    command
      .args(&args)
      .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);

    let mut child = command.spawn().map_err(|source| BuilderError::Spawn {
      program: self.program.clone(),
      source,
    })?;

    let io_error = |source| BuilderError::Io {
      program: self.program.clone(),
      source,
    };

    let pipe = child.stdin.take();
    let feed = async move {
      if let (Some(input), Some(mut pipe)) = (stdin, pipe) {
        pipe.write_all(input.as_bytes()).await?;
        pipe.shutdown().await?;
      }
      Ok::<_, std::io::Error>(())
    };
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (fed, out, err) = tokio::join!(
      feed,
      passthrough(stdout, tokio::io::stderr()),
      passthrough(stderr, tokio::io::stderr()),
    );
    let status = child.wait().await.map_err(io_error)?;
    // A builder that exits early closes its stdin; report the exit, not the broken pipe.
    if !status.success() {
      return Err(BuilderError::Failed {
        command: command_line,
        code: status.code(),
      });
    }
    fed.map_err(io_error)?;
    out.map_err(io_error)?;
    err.map_err(io_error)
  }
}

/// Copy `reader` to `writer` line by line, indenting each line.
///
/// Lines are copied as raw bytes; builder output need not be UTF-8.
async fn passthrough<R, W>(reader: Option<R>, mut writer: W) -> std::io::Result<()>
where
  R: AsyncRead + Unpin,
  W: AsyncWrite + Unpin,
{
  let Some(reader) = reader else {
    return Ok(());
  };
  let indent = vec![b' '; OUTPUT_INDENT];
  let mut reader = BufReader::new(reader);
  let mut line = Vec::new();
  loop {
    line.clear();
    if reader.read_until(b'\n', &mut line).await? == 0 {
      break;
    }
    if !line.ends_with(b"\n") {
      line.push(b'\n');
    }
    writer.write_all(&indent).await?;
    writer.write_all(&line).await?;
  }
  writer.flush().await
}

impl ImageBuilder for DockerBuilder {
  async fn pull(&self, image: &str) -> Result<(), BuilderError> {
    self.run(vec!["pull".to_string(), image.to_string()], None).await
  }

  async fn tag(&self, source: &str, target: &str) -> Result<(), BuilderError> {
    self
      .run(vec!["tag".to_string(), source.to_string(), target.to_string()], None)
      .await
  }

  async fn build(&self, request: &BuildRequest) -> Result<(), BuilderError> {
    let stdin = match &request.dockerfile {
      DockerfileSource::Inline(text) => Some(*text),
      DockerfileSource::Path(_) => None,
    };
    debug!(
      tag = %request.primary_tag(),
      args = ?request.build_args,
      "docker build"
    );
    self.run(Self::build_args(request), stdin).await
  }
}
