//! Stream command implementation

use std::io::Write;

use anyhow::{Context, Result};

use crate::output::{format_size, print_error, print_state, print_status, print_warning};
use tl_core::config::TtylogConfig;
use tl_core::{ConnectionState, LogLine};
use tl_store::{LogBuffer, LogExporter, LogRecorder};
use tl_stream::LogStreamer;

/// Flags of the `stream` command
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub file: Option<String>,
    /// Record the stream into rotating files
    pub record: bool,
    /// Print bare lines without the `[HH:MM:SS.mmm]` prefix
    pub no_timestamps: bool,
    /// Save a snapshot of the buffer when the command ends
    pub save_on_exit: bool,
}

impl StreamOptions {
    /// Apply the flag overrides on top of the file configuration
    pub fn apply(&self, config: &mut TtylogConfig) {
        if let Some(host) = &self.host {
            config.target.host = host.clone();
        }
        if let Some(port) = self.port {
            config.target.port = port;
        }
        if let Some(user) = &self.user {
            config.target.username = user.clone();
        }
        if let Some(file) = &self.file {
            config.target.remote_path = file.clone();
        }
    }
}

/// Where each streamed line goes
struct Sinks {
    buffer: LogBuffer,
    recorder: Option<LogRecorder>,
    timestamps: bool,
}

impl Sinks {
    /// Returns `false` once stdout is gone
    fn handle(&mut self, line: LogLine) -> bool {
        let printed = {
            let mut stdout = std::io::stdout().lock();
            let result = if self.timestamps {
                writeln!(stdout, "{}", line.to_export_line())
            } else {
                writeln!(stdout, "{}", line.text)
            };
            result.is_ok()
        };

        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(e) = recorder.write_line(&line) {
                print_warning(&format!("Recording stopped: {}", e));
                self.recorder = None;
            }
        }

        self.buffer.push(line);
        printed
    }

    fn finish(mut self, exporter: Option<LogExporter>) {
        if let Some(mut recorder) = self.recorder.take() {
            let size = recorder.current_size();
            match recorder.stop() {
                Ok(Some(path)) => print_status(&format!(
                    "Recording saved to {} ({})",
                    path.display(),
                    format_size(size)
                )),
                Ok(None) => {}
                Err(e) => print_error(&format!("Failed to finish recording: {}", e)),
            }
        }

        if let Some(exporter) = exporter {
            match exporter.save_snapshot(&self.buffer) {
                Ok(path) => print_status(&format!(
                    "Saved {} lines to {}",
                    self.buffer.len(),
                    path.display()
                )),
                Err(e) => print_error(&format!("Failed to save snapshot: {}", e)),
            }
        }
    }
}

/// Follow the remote log until Ctrl-C or until reconnecting gives up
pub async fn stream_command(mut config: TtylogConfig, options: StreamOptions) -> Result<()> {
    options.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    let mut sinks = Sinks {
        buffer: LogBuffer::from_config(&config.buffer),
        recorder: None,
        timestamps: !options.no_timestamps,
    };

    if options.record {
        let mut recorder = LogRecorder::new(config.recorder.clone());
        let path = recorder.start().context("Failed to start recording")?;
        print_status(&format!("Recording to {}", path.display()));
        sinks.recorder = Some(recorder);
    }

    let streamer = LogStreamer::new(config.target.clone());
    let mut states = streamer.subscribe_state();
    let mut lines = streamer.subscribe_lines();

    print_status(&format!(
        "Following {} on {}@{}",
        config.target.remote_path,
        config.target.username,
        config.target.address()
    ));
    streamer.connect().await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let result = loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Received Ctrl+C, disconnecting...");
                break Ok(());
            }
            Some(state) = states.recv() => {
                print_state(&state);
                if let ConnectionState::Error { message } = state {
                    break Err(anyhow::anyhow!(message));
                }
            }
            Some(line) = lines.recv() => {
                if !sinks.handle(line) {
                    tracing::debug!("stdout closed, stopping");
                    break Ok(());
                }
            }
        }
    };

    streamer.disconnect().await;

    // Lines already queued before the disconnect still count
    while let Some(line) = lines.try_recv() {
        sinks.handle(line);
    }

    let dropped = lines.dropped();
    if dropped > 0 {
        print_warning(&format!("{} lines were dropped while output lagged", dropped));
    }

    let exporter = options
        .save_on_exit
        .then(|| LogExporter::from_config(&config.recorder));
    sinks.finish(exporter);

    result
}
