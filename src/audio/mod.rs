pub mod decode;
pub mod waveform;
