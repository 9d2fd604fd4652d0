use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum SimulatorError {
    // Parser errors (§6/§7.1): malformed line, wrong arity, non-numeric branch target.
    ParseError { line: usize, text: String, reason: String },

    // Configuration errors: zero-sized RS pool / ROB, non-positive latency.
    InvalidConfig(String),

    // System errors
    IoError(std::io::Error),
}

impl fmt::Display for SimulatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulatorError::ParseError { line, text, reason } => {
                write!(f, "line {}: {} (in {:?})", line, reason, text)
            },
            SimulatorError::InvalidConfig(reason) => {
                write!(f, "invalid engine configuration: {}", reason)
            },
            SimulatorError::IoError(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl Error for SimulatorError {}

impl From<std::io::Error> for SimulatorError {
    fn from(error: std::io::Error) -> Self {
        SimulatorError::IoError(error)
    }
}
