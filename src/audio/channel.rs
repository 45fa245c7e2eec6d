use crate::error::{FocusError, Result};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The single ambient playback resource.
///
/// Implementations must release whatever they were playing before `play`
/// attaches a new source, so two tracks never overlap.
pub trait AudioChannel: Send {
    fn play(&mut self, source: &Path, volume: f32, looping: bool) -> Result<()>;
    fn stop(&mut self);
    fn set_volume(&mut self, volume: f32);
    fn set_looping(&mut self, looping: bool);
    /// Housekeeping hook called from the event loop. Returns false once the
    /// channel has gone quiet on its own (end of a non-looping track).
    fn poll(&mut self) -> bool;
}

/// Accepts every request and plays nothing. Used for headless runs.
#[derive(Debug, Default)]
pub struct NullChannel {
    playing: bool,
}

impl AudioChannel for NullChannel {
    fn play(&mut self, source: &Path, _volume: f32, _looping: bool) -> Result<()> {
        debug!(event = "null_channel_play", source = %source.display());
        self.playing = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn set_volume(&mut self, _volume: f32) {}

    fn set_looping(&mut self, _looping: bool) {}

    fn poll(&mut self) -> bool {
        self.playing
    }
}

/// Plays through the default output device with one `rodio` sink.
///
/// The output stream lives on its own thread for as long as the channel
/// exists; the sink is replaced on every `play`.
pub struct SinkChannel {
    handle: OutputStreamHandle,
    sink: Option<Sink>,
    source: Option<PathBuf>,
    volume: f32,
    looping: bool,
    // dropping this ends the output thread
    _output: mpsc::Sender<()>,
}

impl SinkChannel {
    pub fn open() -> Result<Self> {
        let (handle_tx, handle_rx) = mpsc::channel();
        let (output_tx, output_rx) = mpsc::channel::<()>();

        std::thread::Builder::new()
            .name("rfocus-audio".into())
            .spawn(move || match OutputStream::try_default() {
                Ok((_stream, handle)) => {
                    let _ = handle_tx.send(Ok(handle));
                    let _ = output_rx.recv();
                }
                Err(err) => {
                    let _ = handle_tx.send(Err(err.to_string()));
                }
            })
            .map_err(|err| FocusError::Playback(format!("failed to start audio thread: {err}")))?;

        let handle = handle_rx
            .recv()
            .map_err(|_| FocusError::Playback("audio thread exited".into()))?
            .map_err(|err| FocusError::Playback(format!("no audio output device: {err}")))?;
        info!(event = "audio_output_opened");

        Ok(Self {
            handle,
            sink: None,
            source: None,
            volume: 0.5,
            looping: true,
            _output: output_tx,
        })
    }

    fn start(&mut self, path: &Path, resume_at: Option<Duration>) -> Result<()> {
        let decoded = decode(path)?;
        let sink = Sink::try_new(&self.handle)
            .map_err(|err| FocusError::Playback(format!("audio output unavailable: {err}")))?;
        sink.set_volume(self.volume);
        if self.looping {
            sink.append(decoded.repeat_infinite());
        } else {
            sink.append(decoded);
        }
        if let Some(pos) = resume_at {
            // Past the end of a single pass the seek fails and playback
            // starts over.
            let _ = sink.try_seek(pos);
        }
        self.sink = Some(sink);
        self.source = Some(path.to_path_buf());
        Ok(())
    }

    fn release(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.source = None;
    }
}

/// Opens and decodes an audio file without touching the output device.
pub fn decode(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path).map_err(|err| {
        FocusError::Playback(format!("missing audio asset {}: {err}", path.display()))
    })?;
    Decoder::new(BufReader::new(file)).map_err(|err| {
        FocusError::Playback(format!("cannot decode {}: {err}", path.display()))
    })
}

impl AudioChannel for SinkChannel {
    fn play(&mut self, source: &Path, volume: f32, looping: bool) -> Result<()> {
        self.release();
        self.volume = volume;
        self.looping = looping;
        self.start(source, None)
    }

    fn stop(&mut self) {
        self.release();
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        if let Some(sink) = &self.sink {
            sink.set_volume(volume);
        }
    }

    /// A queued source cannot change its repeat mode, so the track is
    /// rebuilt at the current position.
    fn set_looping(&mut self, looping: bool) {
        if self.looping == looping {
            return;
        }
        self.looping = looping;
        let (Some(sink), Some(source)) = (self.sink.take(), self.source.take()) else {
            return;
        };
        let pos = sink.get_pos();
        sink.stop();
        if let Err(err) = self.start(&source, Some(pos)) {
            warn!(event = "loop_toggle_failed", error = %err);
        }
    }

    fn poll(&mut self) -> bool {
        match &self.sink {
            Some(sink) if !sink.empty() => true,
            Some(_) => {
                self.release();
                false
            }
            None => false,
        }
    }
}
