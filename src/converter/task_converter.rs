//! # Task Converter Module
//!
//! Worker per la conversione di un singolo file.
//! Decoder e encoder girano come due processi collegati da una pipe:
//! l'output va su un file temporaneo che viene rinominato solo a fine pipeline.

use crate::{
    codec::{CommandLine, ResolvedCodec},
    converter::{
        path_resolver::PathResolver,
        planner::ConversionJob,
        run_result::{JobOutcome, TagOutcome},
    },
    error::{ConversionError, TagError},
    tags::{self, TagStore},
};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, warn};

/// Per-job behavior switches
#[derive(Debug, Clone, Default)]
pub struct TaskOptions {
    pub copy_tags: bool,
    /// Treat a non-zero codec exit status as a failed conversion
    pub strict_exit_status: bool,
    /// `None` waits for the codecs indefinitely
    pub timeout: Option<Duration>,
    /// Let codec stdout/stderr through instead of discarding them
    pub show_codec_output: bool,
    /// stdout carries JSON events; codec stdout is never passed through
    pub json_output: bool,
}

/// Converts single jobs with a fixed decoder/encoder pair
#[derive(Clone)]
pub struct TaskConverter {
    decoder: Arc<ResolvedCodec>,
    encoder: Arc<ResolvedCodec>,
    tag_store: Arc<dyn TagStore>,
    options: TaskOptions,
}

impl TaskConverter {
    pub fn new(
        decoder: Arc<ResolvedCodec>,
        encoder: Arc<ResolvedCodec>,
        tag_store: Arc<dyn TagStore>,
        options: TaskOptions,
    ) -> Self {
        Self {
            decoder,
            encoder,
            tag_store,
            options,
        }
    }

    /// Run one job to its terminal outcome. Never returns an error: failures
    /// are part of the outcome.
    pub async fn convert(&self, job: &ConversionJob) -> JobOutcome {
        let temporary = PathResolver::temporary_path(&job.destination, self.encoder.extension());

        if let Err(e) = self.run_pipeline(job, &temporary).await {
            error!("Conversion failed for {}: {}", job.source.display(), e);
            if temporary.exists() {
                if let Err(remove_err) = tokio::fs::remove_file(&temporary).await {
                    debug!("Could not remove {}: {}", temporary.display(), remove_err);
                }
            }
            return JobOutcome::ConversionFailed {
                source: job.source.clone(),
                reason: e.to_string(),
            };
        }

        debug!("Converted {} -> {}", job.source.display(), job.destination.display());
        let tags = self.propagate_tags(job).await;
        JobOutcome::Converted {
            source: job.source.clone(),
            destination: job.destination.clone(),
            tags,
        }
    }

    async fn run_pipeline(&self, job: &ConversionJob, temporary: &Path) -> Result<(), ConversionError> {
        let decode = self.decoder.command_line(Some(&job.source), None)?;
        let encode = self.encoder.command_line(None, Some(temporary))?;
        debug!("Decode: {}", decode.display());
        debug!("Encode: {}", encode.display());

        match self.options.timeout {
            Some(limit) => tokio::time::timeout(limit, self.pipe(&decode, &encode))
                .await
                .map_err(|_| ConversionError::Timeout(limit))??,
            None => self.pipe(&decode, &encode).await?,
        }

        tokio::fs::rename(temporary, &job.destination)
            .await
            .map_err(|source| ConversionError::Move {
                from: temporary.to_path_buf(),
                to: job.destination.clone(),
                source,
            })
    }

    /// Spawn decoder | encoder and wait for both
    async fn pipe(&self, decode: &CommandLine, encode: &CommandLine) -> Result<(), ConversionError> {
        let mut decoder = Command::new(&decode.program)
            .args(&decode.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(codec_output(self.passes_stderr()))
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ConversionError::spawn(self.decoder.name(), e))?;

        let decoded = decoder
            .stdout
            .take()
            .ok_or_else(|| ConversionError::Pipe("decoder stdout was not captured".to_string()))?;
        let encoder_stdin: Stdio = decoded
            .try_into()
            .map_err(|e: std::io::Error| ConversionError::Pipe(e.to_string()))?;

        let mut encoder = Command::new(&encode.program)
            .args(&encode.args)
            .stdin(encoder_stdin)
            .stdout(codec_output(self.passes_stdout()))
            .stderr(codec_output(self.passes_stderr()))
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ConversionError::spawn(self.encoder.name(), e))?;

        let (decoder_status, encoder_status) = tokio::join!(decoder.wait(), encoder.wait());
        self.check_status(self.decoder.name(), decoder_status?)?;
        self.check_status(self.encoder.name(), encoder_status?)?;
        Ok(())
    }

    fn check_status(&self, program: &str, status: ExitStatus) -> Result<(), ConversionError> {
        if status.success() {
            return Ok(());
        }
        if self.options.strict_exit_status {
            return Err(ConversionError::ExitStatus {
                program: program.to_string(),
                status,
            });
        }
        warn!("{} exited with {}, keeping output", program, status);
        Ok(())
    }

    fn passes_stderr(&self) -> bool {
        self.options.show_codec_output
    }

    fn passes_stdout(&self) -> bool {
        self.options.show_codec_output && !self.options.json_output
    }

    async fn propagate_tags(&self, job: &ConversionJob) -> TagOutcome {
        if !self.options.copy_tags {
            return TagOutcome::Disabled;
        }

        let store = Arc::clone(&self.tag_store);
        let source = job.source.clone();
        let destination = job.destination.clone();
        let result = tokio::task::spawn_blocking(move || tags::copy_tags(store.as_ref(), &source, &destination))
            .await
            .map_err(|e| TagError::Worker(e.to_string()))
            .and_then(|copied| copied);

        match result {
            Ok(count) => TagOutcome::Copied(count),
            Err(e) => {
                warn!("Tag copy failed for {}: {}", job.destination.display(), e);
                TagOutcome::Failed(e.to_string())
            }
        }
    }
}

fn codec_output(pass_through: bool) -> Stdio {
    if pass_through {
        Stdio::inherit()
    } else {
        Stdio::null()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::codec::descriptor::{ArgTemplate, ArgToken, CodecDescriptor};
    use crate::codec::test_support::{fake_table, resolved};
    use crate::tags::tests::MemoryTagStore;
    use crate::tags::{LoftyTagStore, TagKey, TagMap};
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        job: ConversionJob,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src/album_0/track.flac");
        let destination_dir = temp.path().join("dest/album_0");
        std::fs::create_dir_all(source.parent().unwrap()).unwrap();
        std::fs::create_dir_all(&destination_dir).unwrap();
        std::fs::write(&source, b"raw pcm frames").unwrap();

        Fixture {
            job: ConversionJob {
                source,
                destination: destination_dir.join("track.mp3"),
                destination_dir,
            },
            _temp: temp,
        }
    }

    fn converter(encoder: &str, options: TaskOptions) -> TaskConverter {
        converter_with_store(encoder, options, Arc::new(LoftyTagStore))
    }

    fn converter_with_store(encoder: &str, options: TaskOptions, store: Arc<dyn TagStore>) -> TaskConverter {
        let table = fake_table();
        TaskConverter::new(
            Arc::new(resolved(&table.decoders, "flac")),
            Arc::new(resolved(&table.encoders, encoder)),
            store,
            options,
        )
    }

    fn temporary(job: &ConversionJob) -> PathBuf {
        PathResolver::temporary_path(&job.destination, ".mp3")
    }

    #[tokio::test]
    async fn test_pipeline_writes_destination() {
        let fx = fixture();
        let outcome = converter("mp3", TaskOptions::default()).convert(&fx.job).await;

        assert_eq!(
            outcome,
            JobOutcome::Converted {
                source: fx.job.source.clone(),
                destination: fx.job.destination.clone(),
                tags: TagOutcome::Disabled,
            }
        );
        assert_eq!(std::fs::read(&fx.job.destination).unwrap(), b"raw pcm frames");
        assert!(!temporary(&fx.job).exists());
    }

    #[tokio::test]
    async fn test_encoder_without_output_fails_the_job() {
        let fx = fixture();
        let outcome = converter("broken", TaskOptions::default()).convert(&fx.job).await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.source(), &fx.job.source);
        assert!(!fx.job.destination.exists());
        assert!(!temporary(&fx.job).exists());
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_lenient_by_default() {
        let fx = fixture();
        let outcome = converter("mp3-failing", TaskOptions::default()).convert(&fx.job).await;
        assert!(outcome.is_success());
        assert!(fx.job.destination.exists());
    }

    #[tokio::test]
    async fn test_non_zero_exit_fails_in_strict_mode() {
        let fx = fixture();
        let options = TaskOptions {
            strict_exit_status: true,
            ..Default::default()
        };
        let outcome = converter("mp3-failing", options).convert(&fx.job).await;

        match outcome {
            JobOutcome::ConversionFailed { reason, .. } => assert!(reason.contains("exited with")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(!fx.job.destination.exists());
        assert!(!temporary(&fx.job).exists());
    }

    #[test]
    fn test_codec_stdout_stays_off_the_json_stream() {
        let debug = TaskOptions {
            show_codec_output: true,
            ..Default::default()
        };
        let plain = converter("mp3", debug.clone());
        assert!(plain.passes_stdout());
        assert!(plain.passes_stderr());

        let json = converter("mp3", TaskOptions { json_output: true, ..debug });
        assert!(!json.passes_stdout());
        assert!(json.passes_stderr());

        let quiet = converter("mp3", TaskOptions::default());
        assert!(!quiet.passes_stdout());
        assert!(!quiet.passes_stderr());
    }

    #[tokio::test]
    async fn test_json_debug_run_still_converts() {
        let fx = fixture();
        let options = TaskOptions {
            show_codec_output: true,
            json_output: true,
            ..Default::default()
        };
        let outcome = converter("mp3", options).convert(&fx.job).await;
        assert!(outcome.is_success());
        assert_eq!(std::fs::read(&fx.job.destination).unwrap(), b"raw pcm frames");
    }

    #[tokio::test]
    async fn test_timeout_kills_hung_codecs() {
        let fx = fixture();
        let table = fake_table();
        let hanging = CodecDescriptor::new(
            "hanging",
            "sh",
            ".flac",
            ArgTemplate::from_tokens(vec![
                ArgToken::Executable,
                ArgToken::Literal("-c".to_string()),
                ArgToken::Literal("sleep 30".to_string()),
                ArgToken::Literal("sh".to_string()),
                ArgToken::Input,
            ])
            .unwrap(),
            "",
        );
        let converter = TaskConverter::new(
            Arc::new(resolved(&[hanging], "hanging")),
            Arc::new(resolved(&table.encoders, "mp3")),
            Arc::new(LoftyTagStore),
            TaskOptions {
                timeout: Some(Duration::from_millis(300)),
                ..Default::default()
            },
        );

        let outcome = converter.convert(&fx.job).await;
        match outcome {
            JobOutcome::ConversionFailed { reason, .. } => assert!(reason.contains("timed out")),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(!temporary(&fx.job).exists());
    }

    #[tokio::test]
    async fn test_tags_are_copied_after_conversion() {
        let fx = fixture();
        let store = Arc::new(MemoryTagStore::default());
        let mut source_tags = TagMap::new();
        source_tags.insert(TagKey::Album, "fake_album".to_string());
        source_tags.insert(TagKey::Artist, "fake_artist".to_string());
        store.files.lock().unwrap().insert(fx.job.source.clone(), source_tags.clone());

        let options = TaskOptions {
            copy_tags: true,
            ..Default::default()
        };
        let outcome = converter_with_store("mp3", options, store.clone()).convert(&fx.job).await;

        assert!(matches!(outcome, JobOutcome::Converted { tags: TagOutcome::Copied(2), .. }));
        assert_eq!(store.files.lock().unwrap().get(&fx.job.destination), Some(&source_tags));
    }

    #[tokio::test]
    async fn test_tag_failure_keeps_conversion() {
        let fx = fixture();
        let options = TaskOptions {
            copy_tags: true,
            ..Default::default()
        };
        // fake audio is not parseable by the tag library
        let outcome = converter("mp3", options).convert(&fx.job).await;

        assert!(outcome.is_success());
        assert!(matches!(outcome, JobOutcome::Converted { tags: TagOutcome::Failed(_), .. }));
        assert!(fx.job.destination.exists());
    }
}
