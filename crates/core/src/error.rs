use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinguaError {
    #[error("Unsupported playback rate {rate}")]
    UnsupportedRate { rate: f64 },
}
