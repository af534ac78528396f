//! yt-dlp invocation and textual progress scraping
//!
//! The tool has no structured progress channel; its stdout is scanned
//! line by line and mapped into the pipeline's progress band.

use crate::error::RunnerError;
use crate::timecode::ClipBounds;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Raw 0-100% download progress is compressed into the overall 10-80 band,
/// leaving headroom for the stages before and after acquisition.
const BAND_FLOOR: f32 = 10.0;
const BAND_CEILING: f32 = 80.0;
const BAND_SCALE: f32 = 0.7;

/// Marker printed when the tool starts extracting audio from the download.
const EXTRACT_AUDIO_MARKER: &str = "[ExtractAudio]";

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const METADATA_TIMEOUT: Duration = Duration::from_secs(15);

/// Captured diagnostic output is capped so a chatty tool cannot balloon memory.
const STDERR_CAP: usize = 64 * 1024;

/// A structured update scraped from the tool's output stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunnerProgress {
    /// A download percentage: the tool's own figure plus its mapping into
    /// the overall band.
    Download { raw: f32, overall: u8 },
    /// The one-shot transition into audio extraction.
    Converting,
}

#[derive(Debug, Clone, Deserialize)]
struct SourceMetadata {
    title: String,
}

#[derive(Debug)]
pub struct ToolRunner {
    yt_dlp: PathBuf,
}

impl ToolRunner {
    pub fn new(yt_dlp: PathBuf) -> Self {
        Self { yt_dlp }
    }

    /// Check that the tool answers at all; returns its version string.
    /// Called before a request is accepted and by the status endpoint.
    pub async fn probe(&self) -> Result<String, RunnerError> {
        let output = tokio::time::timeout(
            PROBE_TIMEOUT,
            Command::new(&self.yt_dlp).arg("--version").output(),
        )
        .await
        .map_err(|_| RunnerError::ToolUnavailable)?
        .map_err(|_| RunnerError::ToolUnavailable)?;

        if !output.status.success() {
            return Err(RunnerError::ToolUnavailable);
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Resolve the source's title from its metadata, best-effort. Any
    /// failure returns None and the caller falls back to a placeholder.
    pub async fn resolve_title(&self, source_url: &str) -> Option<String> {
        let result = tokio::time::timeout(
            METADATA_TIMEOUT,
            Command::new(&self.yt_dlp)
                .args(["--dump-json", "--no-download"])
                .arg(source_url)
                .output(),
        )
        .await;

        let output = match result {
            Ok(Ok(output)) if output.status.success() => output,
            Ok(Ok(output)) => {
                debug!(
                    "Title resolution failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                return None;
            }
            Ok(Err(err)) => {
                debug!("Title resolution failed to start: {}", err);
                return None;
            }
            Err(_) => {
                debug!("Title resolution timed out for {}", source_url);
                return None;
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let metadata: SourceMetadata = serde_json::from_str(stdout.trim()).ok()?;
        Some(metadata.title)
    }

    /// Run an audio-only extraction at maximum quality, forwarding scraped
    /// progress updates. Returns the output file's size on success. A
    /// partial file may be left behind on failure.
    pub async fn run(
        &self,
        source_url: &str,
        output_path: &Path,
        clip: Option<&ClipBounds>,
        progress: mpsc::Sender<RunnerProgress>,
    ) -> Result<u64, RunnerError> {
        let mut cmd = Command::new(&self.yt_dlp);
        cmd.args(["-x", "--audio-format", "mp3", "--audio-quality", "0"]);

        if let Some(clip) = clip {
            cmd.arg("--download-sections")
                .arg(format!("*{}-{}", clip.start, clip.end));
        }

        cmd.args(["--progress", "--newline"])
            .arg("-o")
            .arg(output_path)
            .arg(source_url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!("Extracting audio from {}", source_url);
        let mut child = cmd.spawn().map_err(RunnerError::Spawn)?;

        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move { read_capped(stderr).await });

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            let mut converting_seen = false;
            while let Ok(Some(line)) = lines.next_line().await {
                let Some(update) = parse_progress_line(&line) else {
                    continue;
                };
                if matches!(update, RunnerProgress::Converting) {
                    if converting_seen {
                        continue;
                    }
                    converting_seen = true;
                }
                // A closed receiver only means nobody is listening; keep
                // draining so the child never blocks on a full pipe.
                let _ = progress.send(update).await;
            }
        }

        let status = child.wait().await?;
        let stderr_text = stderr_task.await.unwrap_or_default();

        if !status.success() {
            warn!("yt-dlp exited with code {:?}", status.code());
            return Err(RunnerError::ExecutionFailed {
                code: status.code(),
                stderr: stderr_text.trim().to_string(),
            });
        }

        match tokio::fs::metadata(output_path).await {
            Ok(meta) => {
                debug!("Wrote {} ({} bytes)", output_path.display(), meta.len());
                Ok(meta.len())
            }
            Err(_) => Err(RunnerError::OutputMissing(output_path.to_path_buf())),
        }
    }
}

/// Parse one line of tool output into a progress update.
///
/// Download lines carry a decimal percentage (`[download]  45.2% of ...`);
/// the raw value maps to `min(10 + raw * 0.7, 80)` on the overall scale.
/// A line containing the extract-audio marker switches to converting.
pub fn parse_progress_line(line: &str) -> Option<RunnerProgress> {
    if line.contains(EXTRACT_AUDIO_MARKER) {
        return Some(RunnerProgress::Converting);
    }

    let re = regex::Regex::new(r"(\d+\.\d+)%").ok()?;
    let raw: f32 = re.captures(line)?.get(1)?.as_str().parse().ok()?;
    let overall = (BAND_FLOOR + raw * BAND_SCALE).min(BAND_CEILING).round() as u8;
    Some(RunnerProgress::Download { raw, overall })
}

/// Drain a stream to EOF, keeping only the first [`STDERR_CAP`] bytes.
async fn read_capped<R: AsyncRead + Unpin>(handle: Option<R>) -> String {
    let mut kept = Vec::new();
    if let Some(mut h) = handle {
        let mut chunk = [0u8; 4096];
        loop {
            match h.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if kept.len() < STDERR_CAP {
                        let room = STDERR_CAP - kept.len();
                        kept.extend_from_slice(&chunk[..n.min(room)]);
                    }
                }
            }
        }
    }
    String::from_utf8_lossy(&kept).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_download_lines() {
        let cases = [
            ("[download]   0.0% of 3.41MiB at 512.00KiB/s", 0.0, 10),
            ("[download]  45.2% of 3.41MiB at 512.00KiB/s ETA 00:03", 45.2, 42),
            ("[download]  99.9% of 3.41MiB at 1.00MiB/s ETA 00:00", 99.9, 80),
            ("[download] 100.0% of 3.41MiB in 00:06", 100.0, 80),
        ];
        for (line, want_raw, want_overall) in cases {
            match parse_progress_line(line) {
                Some(RunnerProgress::Download { raw, overall }) => {
                    assert!((raw - want_raw).abs() < 0.001, "raw for {:?}", line);
                    assert_eq!(overall, want_overall, "overall for {:?}", line);
                }
                other => panic!("expected download progress for {:?}, got {:?}", line, other),
            }
        }
    }

    #[test]
    fn test_parse_extract_audio_marker() {
        let line = "[ExtractAudio] Destination: media/clip.mp3";
        assert_eq!(parse_progress_line(line), Some(RunnerProgress::Converting));
    }

    #[test]
    fn test_parse_ignores_other_lines() {
        assert_eq!(parse_progress_line("[youtube] dQw4w9WgXcQ: Downloading webpage"), None);
        assert_eq!(parse_progress_line("[download] Destination: media/clip.m4a"), None);
        // Integer percentages are not progress lines
        assert_eq!(parse_progress_line("[download]  45% of 3.41MiB"), None);
        assert_eq!(parse_progress_line(""), None);
    }
}
