//! FFmpeg-based transcoder implementation.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use super::config::ConverterConfig;
use super::error::TranscodeError;
use super::traits::{ExecResult, Transcoder};

/// Bytes of stderr kept in [`TranscodeError::Failed`].
const STDERR_TAIL_BYTES: usize = 4096;

/// Runs `ffmpeg` as a subprocess with a wall-clock timeout.
pub struct FfmpegTranscoder {
    config: ConverterConfig,
}

impl FfmpegTranscoder {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Creates a transcoder with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    /// Global flags placed before the job arguments.
    fn global_args(&self) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
        ]
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn run(&self, args: &[String]) -> Result<ExecResult, TranscodeError> {
        let mut full_args = self.global_args();
        full_args.extend(args.iter().cloned());
        debug!(args = ?full_args, "Running ffmpeg");

        let child = Command::new(&self.config.ffmpeg_path)
            .args(&full_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscodeError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    TranscodeError::Io(e)
                }
            })?;

        // Dropping the future on timeout drops the child, which kills it.
        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let output = match timeout(timeout_duration, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(timeout_secs = self.config.timeout_secs, "ffmpeg timed out");
                return Err(TranscodeError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        };

        let result = ExecResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
        };

        if !output.status.success() {
            return Err(TranscodeError::failed(
                result.exit_code,
                tail(&result.stderr, STDERR_TAIL_BYTES),
            ));
        }

        Ok(result)
    }

    async fn validate(&self) -> Result<(), TranscodeError> {
        let checks = [
            (&self.config.ffmpeg_path, true),
            (&self.config.ffprobe_path, false),
        ];

        for (path, is_ffmpeg) in checks {
            let result = Command::new(path).arg("-version").output().await;
            if let Err(e) = result {
                if e.kind() == std::io::ErrorKind::NotFound {
                    return Err(if is_ffmpeg {
                        TranscodeError::FfmpegNotFound { path: path.clone() }
                    } else {
                        TranscodeError::FfprobeNotFound { path: path.clone() }
                    });
                }
                return Err(TranscodeError::Io(e));
            }
        }

        Ok(())
    }
}

/// Last `max` bytes of `text`, cut on a char boundary.
fn tail(text: &str, max: usize) -> String {
    let text = text.trim_end();
    if text.len() <= max {
        return text.to_string();
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_global_args_carry_log_level() {
        let transcoder = FfmpegTranscoder::with_defaults();
        let args = transcoder.global_args();
        assert_eq!(args[0], "-hide_banner");
        assert!(args.contains(&"-nostdin".to_string()));
        assert_eq!(args.last().map(|s| s.as_str()), Some("error"));
    }

    #[test]
    fn test_tail_keeps_end() {
        assert_eq!(tail("short\n", 100), "short");
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("ééé", 3), "é");
    }

    #[tokio::test]
    async fn test_missing_binary_is_not_found() {
        let config = ConverterConfig::with_paths(
            PathBuf::from("/nonexistent/ffmpeg"),
            PathBuf::from("/nonexistent/ffprobe"),
        );
        let transcoder = FfmpegTranscoder::new(config);

        let err = transcoder.run(&["-version".to_string()]).await.unwrap_err();
        assert!(matches!(err, TranscodeError::FfmpegNotFound { .. }));
        assert!(!err.is_retryable());

        let err = transcoder.validate().await.unwrap_err();
        assert!(matches!(err, TranscodeError::FfmpegNotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_ffmpeg_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("ffmpeg");
        std::fs::write(&script, "#!/bin/sh\nexec sleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = ConverterConfig::with_paths(script, PathBuf::from("/nonexistent/ffprobe"))
            .with_timeout(1);
        let transcoder = FfmpegTranscoder::new(config);

        let started = std::time::Instant::now();
        let err = transcoder.run(&["-version".to_string()]).await.unwrap_err();

        assert!(matches!(err, TranscodeError::Timeout { timeout_secs: 1 }));
        assert!(err.is_retryable());
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
