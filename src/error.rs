use thiserror::Error;

#[derive(Error, Debug)]
pub enum CashFlowError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Ledger contains no statements")]
    EmptyLedger,

    #[error("Cannot amortize a signal with no statements")]
    EmptySignal,

    #[error("Invalid statement record on line {line}: {details}")]
    InvalidRecord { line: usize, details: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CashFlowError>;
