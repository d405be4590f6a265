pub mod clock;
pub mod output;
