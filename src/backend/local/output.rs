use crate::error::SessionError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where decoded audio ends up. Implementations report a naturally finished
/// track as `SessionEvent::EndOfTrack`; a stopped or replaced one is silent.
pub trait AudioOutput: Send {
    /// Replaces whatever was loaded. The new track starts paused.
    fn load(&mut self, path: &Path) -> Result<(), SessionError>;

    fn play(&mut self) -> Result<(), SessionError>;

    fn pause(&mut self) -> Result<(), SessionError>;

    fn stop(&mut self);
}

/// Output that plays nothing. Used without the `audio` feature and in tests.
#[derive(Debug, Default)]
pub struct NullOutput {
    loaded: Option<PathBuf>,
}

impl AudioOutput for NullOutput {
    fn load(&mut self, path: &Path) -> Result<(), SessionError> {
        if !path.is_file() {
            return Err(SessionError::Load {
                uri: path.display().to_string(),
                reason: "file not found".to_string(),
            });
        }
        self.loaded = Some(path.to_path_buf());
        Ok(())
    }

    fn play(&mut self) -> Result<(), SessionError> {
        match &self.loaded {
            Some(path) => {
                debug!("(null output) playing {}", path.display());
                Ok(())
            }
            None => Err(SessionError::Output("nothing loaded".to_string())),
        }
    }

    fn pause(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    fn stop(&mut self) {
        self.loaded = None;
    }
}

#[cfg(feature = "audio")]
pub use self::rodio_output::RodioOutput;

#[cfg(feature = "audio")]
mod rodio_output {
    use super::AudioOutput;
    use crate::backend::SessionEvent;
    use crate::error::SessionError;
    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
    use std::fs::File;
    use std::io::BufReader;
    use std::path::{Path, PathBuf};
    use std::sync::mpsc::{self, RecvTimeoutError};
    use std::thread;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedSender;
    use tracing::{debug, error, info};

    const POLL_INTERVAL: Duration = Duration::from_millis(200);

    enum OutputCommand {
        Load(PathBuf, mpsc::Sender<Result<(), SessionError>>),
        Play,
        Pause,
        Stop,
    }

    /// rodio output. The `OutputStream` is not `Send`, so it lives on its
    /// own thread and is driven over a channel.
    pub struct RodioOutput {
        commands: mpsc::Sender<OutputCommand>,
    }

    impl RodioOutput {
        pub fn open(session_events: UnboundedSender<SessionEvent>) -> Result<Self, SessionError> {
            let (commands, receiver) = mpsc::channel();
            let (ready_tx, ready_rx) = mpsc::channel();

            thread::Builder::new()
                .name("audio-output".to_string())
                .spawn(move || audio_thread(receiver, ready_tx, session_events))
                .map_err(|e| SessionError::Output(format!("cannot start audio thread: {}", e)))?;

            ready_rx
                .recv()
                .map_err(|_| SessionError::Output("audio thread exited during startup".to_string()))??;

            Ok(Self { commands })
        }

        fn send(&self, command: OutputCommand) -> Result<(), SessionError> {
            self.commands
                .send(command)
                .map_err(|_| SessionError::Output("audio thread is gone".to_string()))
        }
    }

    impl AudioOutput for RodioOutput {
        fn load(&mut self, path: &Path) -> Result<(), SessionError> {
            let (reply_tx, reply_rx) = mpsc::channel();
            self.send(OutputCommand::Load(path.to_path_buf(), reply_tx))?;
            reply_rx
                .recv()
                .map_err(|_| SessionError::Output("audio thread is gone".to_string()))?
        }

        fn play(&mut self) -> Result<(), SessionError> {
            self.send(OutputCommand::Play)
        }

        fn pause(&mut self) -> Result<(), SessionError> {
            self.send(OutputCommand::Pause)
        }

        fn stop(&mut self) {
            let _ = self.send(OutputCommand::Stop);
        }
    }

    fn audio_thread(
        commands: mpsc::Receiver<OutputCommand>,
        ready: mpsc::Sender<Result<(), SessionError>>,
        session_events: UnboundedSender<SessionEvent>,
    ) {
        let (_stream, handle) = match OutputStream::try_default() {
            Ok(stream) => stream,
            Err(e) => {
                error!("No audio output device: {}", e);
                let _ = ready.send(Err(SessionError::Output(e.to_string())));
                return;
            }
        };
        let _ = ready.send(Ok(()));
        info!("Audio output ready");

        let mut sink: Option<Sink> = None;
        loop {
            match commands.recv_timeout(POLL_INTERVAL) {
                Ok(OutputCommand::Load(path, reply)) => {
                    if let Some(old) = sink.take() {
                        old.stop();
                    }
                    let result = match open_sink(&handle, &path) {
                        Ok(new_sink) => {
                            sink = Some(new_sink);
                            Ok(())
                        }
                        Err(e) => Err(e),
                    };
                    let _ = reply.send(result);
                }
                Ok(OutputCommand::Play) => {
                    if let Some(sink) = &sink {
                        sink.play();
                    }
                }
                Ok(OutputCommand::Pause) => {
                    if let Some(sink) = &sink {
                        sink.pause();
                    }
                }
                Ok(OutputCommand::Stop) => {
                    if let Some(old) = sink.take() {
                        old.stop();
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            // A drained sink means the track ran to its end.
            if sink.as_ref().is_some_and(|s| s.empty()) {
                sink = None;
                debug!("Track finished");
                let _ = session_events.send(SessionEvent::EndOfTrack);
            }
        }

        debug!("Audio output thread exiting");
    }

    fn open_sink(handle: &OutputStreamHandle, path: &Path) -> Result<Sink, SessionError> {
        let load_error = |reason: String| SessionError::Load {
            uri: path.display().to_string(),
            reason,
        };

        let file = File::open(path).map_err(|e| load_error(e.to_string()))?;
        let source = Decoder::new(BufReader::new(file)).map_err(|e| load_error(e.to_string()))?;
        let sink = Sink::try_new(handle).map_err(|e| SessionError::Output(e.to_string()))?;
        sink.pause();
        sink.append(source);
        Ok(sink)
    }
}
