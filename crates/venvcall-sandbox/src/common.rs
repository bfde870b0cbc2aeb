//! Process output capture shared by the subprocess runner.

use std::io::{self, Read};
use std::process::Child;
use std::sync::{Arc, Mutex};
use std::thread;

/// Read buffer size for the capture threads.
const CAPTURE_CHUNK_BYTES: usize = 4096;

fn pump<R: Read + Send + 'static>(
    mut reader: R,
    sink: Arc<Mutex<Vec<u8>>>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut buf = [0u8; CAPTURE_CHUNK_BYTES];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if let Ok(mut out) = sink.lock() {
                        out.extend_from_slice(&buf[..n]);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    })
}

/// Wait for `child` to exit while draining stdout and stderr into one buffer.
///
/// Both pipes are drained in background threads while the process runs, so a
/// chatty child cannot block on a full pipe. Chunks from the two streams are
/// interleaved in arrival order.
///
/// Returns the exit code (`None` when killed by a signal) and the captured text.
pub fn wait_with_merged_output(child: &mut Child) -> io::Result<(Option<i32>, String)> {
    let merged = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = [
        child.stdout.take().map(|out| pump(out, Arc::clone(&merged))),
        child.stderr.take().map(|err| pump(err, Arc::clone(&merged))),
    ]
    .into_iter()
    .flatten()
    .collect();

    let status = child.wait();
    for handle in handles {
        let _ = handle.join();
    }
    let status = status?;

    let bytes = merged
        .lock()
        .map(|guard| guard.clone())
        .unwrap_or_default();
    Ok((
        status.code(),
        String::from_utf8_lossy(&bytes).into_owned(),
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};

    #[test]
    fn test_merges_stdout_and_stderr() {
        let mut child = Command::new("sh")
            .args(["-c", "echo out; echo err 1>&2; exit 3"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let (code, output) = wait_with_merged_output(&mut child).unwrap();
        assert_eq!(code, Some(3));
        assert!(output.contains("out"));
        assert!(output.contains("err"));
    }

    #[test]
    fn test_large_output_does_not_deadlock() {
        let mut child = Command::new("sh")
            .args([
                "-c",
                "i=0; while [ $i -lt 20000 ]; do echo 0123456789; i=$((i+1)); done",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let (code, output) = wait_with_merged_output(&mut child).unwrap();
        assert_eq!(code, Some(0));
        assert_eq!(output.lines().count(), 20000);
    }
}
