use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("match id must not be empty")]
    EmptyMatchId,

    #[error("invalid leg hash: {0}")]
    InvalidLegHash(String),
}
