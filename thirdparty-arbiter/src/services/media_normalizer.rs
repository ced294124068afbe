//! Media normalization
//!
//! Converts an uploaded audio or video file into a small mono speech track by
//! running an external encoder (ffmpeg by default) under a hard deadline.
//!
//! # Temporary files
//! - The upload is written to `original_<uuid><ext>` in the scratch directory
//!   and removed before `normalize` returns, whatever the outcome.
//! - The encoder writes `normalized_<uuid>.<ext>`. On success it is handed to
//!   the caller inside [`NormalizedAudio`], which deletes it on drop. On
//!   failure it is removed immediately.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempPath;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::MediaSettings;

/// Lines of encoder stderr kept in error diagnostics
const DIAGNOSTIC_LINES: usize = 20;

/// Media normalization errors
#[derive(Debug, Error)]
pub enum MediaProcessingError {
    /// Scratch directory or file I/O failed
    #[error("Scratch file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Encoder executable could not be started
    #[error("Encoder could not be started: {0}")]
    EncoderUnavailable(String),

    /// Encoder ran and reported failure
    #[error("Encoder failed ({status}): {diagnostics}")]
    EncoderFailed { status: String, diagnostics: String },

    /// Encoder exceeded its deadline and was killed
    #[error("Encoder timed out after {seconds} s")]
    Timeout { seconds: u64 },
}

/// Raw upload as received at intake
#[derive(Debug, Clone)]
pub struct MediaUpload {
    /// Client-supplied file name, used only for its extension
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl MediaUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Extension of the client file name including the dot, or empty
    ///
    /// Only short alphanumeric extensions are kept so the name cannot carry
    /// path components into the scratch directory.
    pub fn extension(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default()
    }
}

/// Normalized speech track, deleted when dropped
#[derive(Debug)]
pub struct NormalizedAudio {
    path: TempPath,
}

impl NormalizedAudio {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Runs the configured encoder over uploads
#[derive(Debug, Clone)]
pub struct MediaNormalizer {
    settings: MediaSettings,
}

impl MediaNormalizer {
    pub fn new(settings: MediaSettings) -> Self {
        Self { settings }
    }

    /// Normalize an upload to the configured speech format
    ///
    /// # Errors
    /// - `Io` if the scratch directory or upload file cannot be written
    /// - `EncoderUnavailable` if the encoder cannot be spawned
    /// - `EncoderFailed` on non-zero exit or empty output
    /// - `Timeout` if the encoder runs past its deadline (the child is killed)
    pub async fn normalize(&self, upload: &MediaUpload) -> Result<NormalizedAudio, MediaProcessingError> {
        let scratch_dir = self.settings.scratch_dir();
        tokio::fs::create_dir_all(&scratch_dir).await?;

        let id = Uuid::new_v4();
        let original = TempPath::from_path(
            scratch_dir.join(format!("original_{}{}", id, upload.extension())),
        );
        let output = TempPath::from_path(scratch_dir.join(format!(
            "normalized_{}.{}",
            id, self.settings.output_extension
        )));

        tokio::fs::write(&original, &upload.bytes).await?;

        debug!(
            input = %original.display(),
            size = upload.size(),
            "Normalizing upload"
        );

        self.run_encoder(&original, &output).await?;

        let written = tokio::fs::metadata(&output).await.map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(MediaProcessingError::EncoderFailed {
                status: "exit status: 0".to_string(),
                diagnostics: "encoder produced no output".to_string(),
            });
        }

        debug!(output = %output.display(), bytes = written, "Upload normalized");

        // `original` drops here and is removed
        Ok(NormalizedAudio { path: output })
    }

    fn encoder_args(&self, input: &Path, output: &Path) -> Vec<std::ffi::OsString> {
        let s = &self.settings;
        vec![
            "-y".into(),
            "-i".into(),
            input.as_os_str().to_owned(),
            "-vn".into(),
            "-ac".into(),
            s.channels.to_string().into(),
            "-ar".into(),
            s.sample_rate_hz.to_string().into(),
            "-c:a".into(),
            s.codec.clone().into(),
            "-b:a".into(),
            s.bitrate.clone().into(),
            output.as_os_str().to_owned(),
        ]
    }

    async fn run_encoder(&self, input: &Path, output: &Path) -> Result<(), MediaProcessingError> {
        let program = PathBuf::from(&self.settings.encoder_program);

        let child = Command::new(&program)
            .args(self.encoder_args(input, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                MediaProcessingError::EncoderUnavailable(format!("{}: {}", program.display(), e))
            })?;

        let deadline = self.settings.encoder_timeout();

        // Dropping the wait future on expiry drops the child, which kills it
        let result = match tokio::time::timeout(deadline, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                let seconds = self.settings.encoder_timeout_ms.div_ceil(1000);
                warn!(
                    program = %program.display(),
                    seconds,
                    "Encoder exceeded deadline, killed"
                );
                return Err(MediaProcessingError::Timeout { seconds });
            }
        };

        if !result.status.success() {
            return Err(MediaProcessingError::EncoderFailed {
                status: result.status.to_string(),
                diagnostics: stderr_tail(&result.stderr),
            });
        }

        Ok(())
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(DIAGNOSTIC_LINES);
    let tail = lines[start..].join("\n");
    if tail.is_empty() {
        "no diagnostics".to_string()
    } else {
        tail
    }
}
