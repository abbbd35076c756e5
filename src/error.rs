use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The raw blob could not be recovered into a column mapping.
    #[error("malformed record at byte {offset}: {message} (near ...{context}...)")]
    MalformedRecord {
        offset: usize,
        context: String,
        message: String,
    },

    /// The blob parsed, but the table inside it could not be built.
    #[error("unparseable record: {0}")]
    UnparseableRecord(String),

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("player not found: {0}")]
    PlayerNotFound(String),
}

impl PipelineError {
    pub fn unparseable(msg: impl Into<String>) -> Self {
        PipelineError::UnparseableRecord(msg.into())
    }

    /// True for failures scoped to a single player's data.
    pub fn is_per_player(&self) -> bool {
        matches!(
            self,
            PipelineError::MalformedRecord { .. } | PipelineError::UnparseableRecord(_)
        )
    }
}
