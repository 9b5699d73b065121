pub mod body;
pub mod transcoder;

pub use body::transcoded_body;
pub use transcoder::{DeltaTranscoder, TranscoderState};
