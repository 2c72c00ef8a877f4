//! Background readers for the engine's output streams.
//!
//! One task per stream, alive for the lifetime of one engine process. The
//! stdout reader is the only consumer of that stream, so lines reach the
//! classifier in exactly the order the engine printed them.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::classifier::Classifier;

/// Read stdout line by line until it closes, feeding trimmed non-empty lines
/// to the classifier. Bytes that are not UTF-8 are replaced rather than
/// ending the stream.
pub fn spawn_reader<R>(stdout: R, classifier: Classifier) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut stdout = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match stdout.read_until(b'\n', &mut buf).await {
                Ok(0) => {
                    debug!("engine stdout reached EOF");
                    break;
                }
                Ok(_) => {
                    let text = String::from_utf8_lossy(&buf);
                    let line = text.trim();
                    if !line.is_empty() {
                        classifier.handle(line);
                    }
                }
                Err(e) => {
                    debug!(error = %e, "engine stdout read failed");
                    break;
                }
            }
        }
        classifier.stream_closed();
    })
}

/// Drain stderr so the engine never blocks on a full pipe. Lines are logged
/// and otherwise ignored.
pub fn spawn_stderr_logger<R>(stderr: R) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut stderr = BufReader::new(stderr);
        let mut buf = Vec::new();
        while let Ok(n) = stderr.read_until(b'\n', &mut buf).await {
            if n == 0 {
                break;
            }
            let text = String::from_utf8_lossy(&buf);
            let line = text.trim();
            if !line.is_empty() {
                warn!(target: "usi_bridge::engine_stderr", "{line}");
            }
            buf.clear();
        }
    })
}
