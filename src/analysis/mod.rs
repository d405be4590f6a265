pub mod memo;
pub mod peaks;
pub mod spectrogram;
