use crate::audio::waveform::Waveform;
use crate::error::Result;

/// Identifies one `play` request on an [`AudioOutput`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlaybackHandle(pub u64);

/// Audio device collaborator. Playback runs on the output's own thread;
/// `play` must return without waiting for the audio to finish.
pub trait AudioOutput {
    fn play(&mut self, waveform: &Waveform) -> Result<PlaybackHandle>;

    /// Halt everything this output is playing.
    fn stop_all(&mut self) -> Result<()>;
}

/// Output that produces no sound; the clock alone drives the analysis.
#[derive(Debug, Default)]
pub struct SilentOutput {
    next_handle: u64,
}

impl AudioOutput for SilentOutput {
    fn play(&mut self, waveform: &Waveform) -> Result<PlaybackHandle> {
        self.next_handle += 1;
        log::debug!(
            "Silent playback #{} ({:.1}s)",
            self.next_handle,
            waveform.duration()
        );
        Ok(PlaybackHandle(self.next_handle))
    }

    fn stop_all(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(feature = "playback")]
pub use device::RodioOutput;

#[cfg(feature = "playback")]
mod device {
    use rodio::buffer::SamplesBuffer;
    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::{AudioOutput, PlaybackHandle};
    use crate::audio::waveform::Waveform;
    use crate::error::{Error, Result};

    /// Plays through the default output device.
    pub struct RodioOutput {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sinks: Vec<Sink>,
        next_handle: u64,
    }

    impl RodioOutput {
        pub fn open_default() -> Result<Self> {
            let (stream, handle) = OutputStream::try_default()
                .map_err(|e| Error::Playback(format!("no output device: {}", e)))?;
            Ok(Self {
                _stream: stream,
                handle,
                sinks: Vec::new(),
                next_handle: 0,
            })
        }
    }

    impl AudioOutput for RodioOutput {
        fn play(&mut self, waveform: &Waveform) -> Result<PlaybackHandle> {
            let sink = Sink::try_new(&self.handle)
                .map_err(|e| Error::Playback(format!("cannot open sink: {}", e)))?;
            sink.append(SamplesBuffer::new(
                waveform.channels() as u16,
                waveform.sample_rate(),
                waveform.samples().to_vec(),
            ));
            self.sinks.push(sink);
            self.next_handle += 1;
            Ok(PlaybackHandle(self.next_handle))
        }

        fn stop_all(&mut self) -> Result<()> {
            for sink in self.sinks.drain(..) {
                sink.stop();
            }
            Ok(())
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::Error;

    /// Records every call. With `play_limit` set, `play` fails once that
    /// many plays have succeeded.
    #[derive(Debug, Default)]
    pub struct RecordingOutput {
        pub plays: std::rc::Rc<std::cell::Cell<usize>>,
        pub attempts: std::rc::Rc<std::cell::Cell<usize>>,
        pub stops: std::rc::Rc<std::cell::Cell<usize>>,
        pub play_limit: Option<usize>,
    }

    impl AudioOutput for RecordingOutput {
        fn play(&mut self, _waveform: &Waveform) -> Result<PlaybackHandle> {
            self.attempts.set(self.attempts.get() + 1);
            if self.play_limit.is_some_and(|limit| self.plays.get() >= limit) {
                return Err(Error::Playback("device unplugged".into()));
            }
            self.plays.set(self.plays.get() + 1);
            Ok(PlaybackHandle(self.plays.get() as u64))
        }

        fn stop_all(&mut self) -> Result<()> {
            self.stops.set(self.stops.get() + 1);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_output_hands_out_distinct_handles() {
        let wave = Waveform::mono(vec![0.0; 100], 1000).unwrap();
        let mut out = SilentOutput::default();
        let a = out.play(&wave).unwrap();
        let b = out.play(&wave).unwrap();
        assert_ne!(a, b);
        assert!(out.stop_all().is_ok());
    }
}
