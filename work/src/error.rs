use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkError {
    #[error("difficulty {difficulty} exceeds the {max}-bit hash width")]
    DifficultyOutOfRange { difficulty: u32, max: u32 },

    #[error("nonce space exhausted at difficulty {0}")]
    Exhausted(u32),
}
