//! Invocation of the external `kokoro-tts` synthesis engine.
//!
//! The engine is a command-line program: text goes in through a temporary
//! UTF-8 file, raw WAV comes out at the requested path. The subprocess runs
//! under a hard wall-clock timeout with captured stdio, and every exit path
//! removes the temporary input file.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::Config;
use crate::tts::types::{Result, TtsError};
use crate::utils::common::check_file_exists_and_valid;

pub const ENGINE_BINARY: &str = "kokoro-tts";

/// Fixed voice; keeps the engine from dropping into its interactive
/// voice-selection prompt.
pub const DEFAULT_VOICE: &str = "af_sarah";

const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(60);

// Asset files the engine expects next to the working directory. When
// present they are passed explicitly; otherwise the engine locates its own.
const WELL_KNOWN_MODEL: &str = "kokoro-v1.0.onnx";
const WELL_KNOWN_VOICES: &str = "voices-v1.0.bin";

/// Map a caller language code onto the engine's locale tokens.
/// Unknown codes fall back to US English.
pub fn map_language(code: &str) -> &'static str {
    match code.to_ascii_lowercase().as_str() {
        "en" | "en-us" => "en-us",
        "en-gb" => "en-gb",
        "ja" => "ja",
        "zh" | "cmn" => "cmn",
        "es" => "es",
        "fr" | "fr-fr" => "fr-fr",
        "hi" => "hi",
        "it" => "it",
        "pt" | "pt-br" => "pt-br",
        _ => "en-us",
    }
}

/// Typed result of one subprocess run.
#[derive(Debug)]
enum ProcessOutcome {
    Completed { stdout: String, stderr: String },
    NonZeroExit { status: i32, stderr: String },
    NotFound,
    TimedOut,
}

pub struct SynthesisEngine {
    binary: PathBuf,
    model_path: Option<PathBuf>,
    voices_path: Option<PathBuf>,
}

impl SynthesisEngine {
    pub fn new(config: &Config) -> Self {
        let model_path = config
            .kokoro_model_path
            .clone()
            .or_else(|| existing(WELL_KNOWN_MODEL));
        let voices_path = config
            .kokoro_voices_path
            .clone()
            .or_else(|| existing(WELL_KNOWN_VOICES));

        if let (Some(model), Some(voices)) = (&model_path, &voices_path) {
            info!(
                "Using local kokoro assets: {} / {}",
                model.display(),
                voices.display()
            );
        }

        Self {
            binary: PathBuf::from(ENGINE_BINARY),
            model_path,
            voices_path,
        }
    }

    /// Engine with an explicit executable path instead of PATH lookup.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            model_path: None,
            voices_path: None,
        }
    }

    /// Whether the engine executable can currently be resolved.
    pub fn is_available(&self) -> bool {
        which::which(&self.binary).is_ok()
    }

    fn binary_name(&self) -> String {
        self.binary.to_string_lossy().to_string()
    }

    /// Synthesize `text` into a raw WAV file at `output_path`.
    pub async fn synthesize_raw(&self, text: &str, lang: &str, output_path: &Path) -> Result<()> {
        // The input file is a NamedTempFile so it is removed on every exit
        // path, including early returns.
        let mut input_file = tempfile::Builder::new()
            .prefix("voxnova-input-")
            .suffix(".txt")
            .tempfile()?;
        input_file.write_all(text.as_bytes())?;
        input_file.flush()?;

        let locale = map_language(lang);

        let mut cmd = Command::new(&self.binary);
        cmd.arg(input_file.path())
            .arg(output_path)
            .arg("--format")
            .arg("wav")
            .arg("--lang")
            .arg(locale)
            .arg("--voice")
            .arg(DEFAULT_VOICE);

        if let Some(model) = &self.model_path {
            cmd.arg("--model").arg(model);
        }
        if let Some(voices) = &self.voices_path {
            cmd.arg("--voices").arg(voices);
        }

        debug!(
            "Invoking {} (lang: {}, voice: {})",
            self.binary_name(),
            locale,
            DEFAULT_VOICE
        );

        match run_with_timeout(cmd, SYNTHESIS_TIMEOUT).await? {
            ProcessOutcome::Completed { stdout, stderr } => {
                if !stderr.trim().is_empty() {
                    debug!("{} stderr: {}", self.binary_name(), stderr.trim());
                }
                if !stdout.trim().is_empty() {
                    debug!("{} stdout: {}", self.binary_name(), stdout.trim());
                }
                if !check_file_exists_and_valid(output_path).await {
                    return Err(TtsError::EmptyOutput(output_path.to_path_buf()));
                }
                Ok(())
            }
            ProcessOutcome::NonZeroExit { status, stderr } => {
                warn!(
                    "{} exited with status {}: {}",
                    self.binary_name(),
                    status,
                    stderr.trim()
                );
                Err(TtsError::EngineFailed {
                    status,
                    stderr: stderr.trim().to_string(),
                })
            }
            ProcessOutcome::NotFound => Err(TtsError::EngineNotFound(self.binary_name())),
            ProcessOutcome::TimedOut => Err(TtsError::EngineTimeout(SYNTHESIS_TIMEOUT)),
        }
    }
}

fn existing(path: &str) -> Option<PathBuf> {
    let path = PathBuf::from(path);
    path.exists().then_some(path)
}

/// Run a command with captured stdio and a wall-clock limit. The child is
/// killed when the limit elapses.
async fn run_with_timeout(mut cmd: Command, limit: Duration) -> Result<ProcessOutcome> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ProcessOutcome::NotFound);
        }
        Err(e) => return Err(e.into()),
    };

    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();
    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();

    // Drain both pipes while waiting so a chatty child cannot dead-lock on a
    // full pipe buffer.
    let waited = timeout(limit, async {
        let (status, _, _) = tokio::try_join!(
            child.wait(),
            async {
                match stdout_pipe.as_mut() {
                    Some(pipe) => pipe.read_to_end(&mut stdout_buf).await,
                    None => Ok(0),
                }
            },
            async {
                match stderr_pipe.as_mut() {
                    Some(pipe) => pipe.read_to_end(&mut stderr_buf).await,
                    None => Ok(0),
                }
            },
        )?;
        Ok::<_, std::io::Error>(status)
    })
    .await;

    match waited {
        Err(_elapsed) => {
            let _ = child.kill().await;
            Ok(ProcessOutcome::TimedOut)
        }
        Ok(Err(e)) => Err(e.into()),
        Ok(Ok(status)) => {
            let stdout = String::from_utf8_lossy(&stdout_buf).to_string();
            let stderr = String::from_utf8_lossy(&stderr_buf).to_string();
            if status.success() {
                Ok(ProcessOutcome::Completed { stdout, stderr })
            } else {
                Ok(ProcessOutcome::NonZeroExit {
                    status: status.code().unwrap_or(-1),
                    stderr,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_language() {
        assert_eq!(map_language("en"), "en-us");
        assert_eq!(map_language("EN"), "en-us");
        assert_eq!(map_language("en-gb"), "en-gb");
        assert_eq!(map_language("ja"), "ja");
        assert_eq!(map_language("zh"), "cmn");
        assert_eq!(map_language("pt"), "pt-br");
        assert_eq!(map_language("xx"), "en-us");
        assert_eq!(map_language(""), "en-us");
    }

    #[tokio::test]
    async fn test_missing_executable_is_reported() {
        let engine = SynthesisEngine::with_binary("voxnova-no-such-engine");
        assert!(!engine.is_available());

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.wav");
        let err = engine.synthesize_raw("hello", "en", &out).await.unwrap_err();
        match err {
            TtsError::EngineNotFound(name) => assert_eq!(name, "voxnova-no-such-engine"),
            other => panic!("expected EngineNotFound, got {other:?}"),
        }
        assert!(!out.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_reported() {
        let engine = SynthesisEngine::with_binary("false");
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.wav");
        let err = engine.synthesize_raw("hello", "en", &out).await.unwrap_err();
        assert!(matches!(err, TtsError::EngineFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_run_requires_output() {
        // `true` exits cleanly but writes nothing, which must surface as an
        // empty-output error rather than success.
        let engine = SynthesisEngine::with_binary("true");
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.wav");
        let err = engine.synthesize_raw("hello", "en", &out).await.unwrap_err();
        assert!(matches!(err, TtsError::EmptyOutput(_)));
    }
}
