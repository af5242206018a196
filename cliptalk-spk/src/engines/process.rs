//! Streaming audio out of speech subprocesses

use crate::engines::AudioStream;
use crate::error::SpeechError;
use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;

const READ_CHUNK: usize = 8 * 1024;

struct ChildReader {
    program: String,
    child: Child,
    stdout: ChildStdout,
    stderr: JoinHandle<String>,
}

/// Spawn `command`, feed `input` to its stdin and stream its stdout.
///
/// The child is killed if the stream is dropped early. A non-zero exit after
/// stdout closes ends the stream with an error.
pub(crate) async fn spawn_streaming(
    mut command: Command,
    input: Option<String>,
) -> Result<AudioStream, SpeechError> {
    let program = command.as_std().get_program().to_string_lossy().into_owned();

    command
        .stdin(if input.is_some() {
            std::process::Stdio::piped()
        } else {
            std::process::Stdio::null()
        })
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .map_err(|e| SpeechError::Engine(format!("Failed to run {}: {}", program, e)))?;

    if let Some(input) = input {
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SpeechError::Engine(format!("{} has no stdin", program)))?;
        // Fed concurrently with the stdout reads
        tokio::spawn(async move {
            if stdin.write_all(input.as_bytes()).await.is_ok() {
                let _ = stdin.shutdown().await;
            }
        });
    }

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| SpeechError::Engine(format!("{} has no stdout", program)))?;

    let mut stderr_pipe = child.stderr.take();
    let stderr = tokio::spawn(async move {
        let mut text = String::new();
        if let Some(pipe) = stderr_pipe.as_mut() {
            let _ = pipe.read_to_string(&mut text).await;
        }
        text
    });

    let reader = ChildReader {
        program,
        child,
        stdout,
        stderr,
    };
    Ok(stream::unfold(Some(reader), next_chunk).boxed())
}

async fn next_chunk(
    state: Option<ChildReader>,
) -> Option<(Result<Bytes, SpeechError>, Option<ChildReader>)> {
    let mut reader = state?;
    let mut buf = BytesMut::with_capacity(READ_CHUNK);

    match reader.stdout.read_buf(&mut buf).await {
        Ok(0) => finish(reader).await.map(|err| (Err(err), None)),
        Ok(_) => Some((Ok(buf.freeze()), Some(reader))),
        Err(e) => Some((Err(SpeechError::Io(e)), None)),
    }
}

/// Reap the child; `Some` carries the failure to report
async fn finish(mut reader: ChildReader) -> Option<SpeechError> {
    let status = reader.child.wait().await;
    let stderr = reader.stderr.await.unwrap_or_default();

    match status {
        Ok(status) if status.success() => None,
        Ok(status) => Some(SpeechError::Engine(format!(
            "{} exited with {}: {}",
            reader.program,
            status,
            stderr.trim()
        ))),
        Err(e) => Some(SpeechError::Io(e)),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    async fn collect(mut stream: AudioStream) -> (Vec<u8>, Option<String>) {
        let mut data = Vec::new();
        let mut error = None;
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => data.extend_from_slice(&chunk),
                Err(e) => error = Some(e.to_string()),
            }
        }
        (data, error)
    }

    #[tokio::test]
    async fn test_streams_stdout_of_stdin_echo() {
        let stream = spawn_streaming(Command::new("cat"), Some("hello".to_string()))
            .await
            .unwrap();
        let (data, error) = collect(stream).await;
        assert_eq!(data, b"hello");
        assert!(error.is_none());
    }

    #[tokio::test]
    async fn test_failed_exit_ends_with_error() {
        let mut command = Command::new("sh");
        command.arg("-c").arg("printf partial; echo broken >&2; exit 3");
        let stream = spawn_streaming(command, None).await.unwrap();
        let (data, error) = collect(stream).await;
        assert_eq!(data, b"partial");
        assert!(error.unwrap().contains("broken"));
    }

    #[tokio::test]
    async fn test_missing_program_fails_to_start() {
        let result = spawn_streaming(Command::new("cliptalk-no-such-program"), None).await;
        assert!(matches!(result, Err(SpeechError::Engine(_))));
    }
}
