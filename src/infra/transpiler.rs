//! Source-to-JavaScript compilation through an external command.

use std::{
    io::ErrorKind,
    path::PathBuf,
    process::Stdio,
    time::Instant,
};

use async_trait::async_trait;
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{info, warn};

use crate::application::ContentProductionError;

const TARGET: &str = "infra::transpiler";

#[async_trait]
pub trait Transpiler: Send + Sync {
    /// Compile `source` to JavaScript. `name` identifies the source in errors.
    async fn transpile(&self, name: &str, source: &str) -> Result<String, ContentProductionError>;
}

/// Runs a compiler that reads TypeScript on stdin and writes JavaScript to
/// stdout, e.g. `esbuild --loader=ts`.
#[derive(Debug, Clone)]
pub struct CommandTranspiler {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandTranspiler {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl Transpiler for CommandTranspiler {
    async fn transpile(&self, name: &str, source: &str) -> Result<String, ContentProductionError> {
        let started_at = Instant::now();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                warn!(
                    target = TARGET,
                    op = "transpiler::transpile",
                    result = "error",
                    error_code = "spawn",
                    program = %self.program.display(),
                    error = %err,
                    "Failed to spawn transpiler"
                );
                ContentProductionError::TranspilerUnavailable {
                    name: name.to_string(),
                    error: err,
                }
            })?;

        let mut stdin = child.stdin.take();
        let write = async move {
            if let Some(stdin) = stdin.as_mut() {
                stdin.write_all(source.as_bytes()).await?;
                stdin.shutdown().await?;
            }
            drop(stdin);
            Ok::<_, std::io::Error>(())
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());

        let output = output.map_err(|err| ContentProductionError::TranspilerUnavailable {
            name: name.to_string(),
            error: err,
        })?;
        if let Err(err) = written
            && err.kind() != ErrorKind::BrokenPipe
        {
            return Err(ContentProductionError::TranspilerUnavailable {
                name: name.to_string(),
                error: err,
            });
        }

        if !output.status.success() {
            let exit_code = output.status.code();
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            warn!(
                target = TARGET,
                op = "transpiler::transpile",
                result = "error",
                error_code = "exit_status",
                exit_code = exit_code.map(i64::from).unwrap_or(-1),
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                stderr = %stderr,
                "Transpiler invocation failed"
            );
            return Err(ContentProductionError::Transpiler {
                name: name.to_string(),
                exit_code,
                stderr,
            });
        }

        let javascript = String::from_utf8_lossy(&output.stdout).into_owned();
        if javascript.trim().is_empty() {
            return Err(ContentProductionError::empty_transform(name));
        }

        info!(
            target = TARGET,
            op = "transpiler::transpile",
            result = "ok",
            source_name = name,
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            output_bytes = javascript.len(),
            "Source transpiled"
        );
        Ok(javascript)
    }
}
