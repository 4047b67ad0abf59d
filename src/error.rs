use std::fmt;

/// Error type for blackbox log decoding
#[derive(Debug)]
pub enum DecodeError {
    /// I/O errors
    Io(std::io::Error),
    /// UTF-8 parsing errors
    Utf8(std::str::Utf8Error),
    /// Invalid header format
    InvalidHeader(String),
    /// End of file reached unexpectedly
    UnexpectedEof,
    /// Unknown encoding code in a field definition
    InvalidEncoding(u8),
    /// Unknown predictor code in a field definition
    InvalidPredictor(u16),
    /// A predictor referenced a field that was never declared in the headers
    MissingFieldIndex(&'static str),
    /// The data section began before any main field definitions were seen
    MissingFieldDefinitions,
    /// Export format error
    Export(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Io(err) => write!(f, "I/O error: {}", err),
            DecodeError::Utf8(err) => write!(f, "UTF-8 error: {}", err),
            DecodeError::InvalidHeader(msg) => write!(f, "Invalid header: {}", msg),
            DecodeError::UnexpectedEof => write!(f, "Unexpected end of file"),
            DecodeError::InvalidEncoding(encoding) => {
                write!(f, "Invalid encoding type: {}", encoding)
            }
            DecodeError::InvalidPredictor(predictor) => {
                write!(f, "Invalid predictor type: {}", predictor)
            }
            DecodeError::MissingFieldIndex(name) => {
                write!(f, "Prediction requires undeclared field: {}", name)
            }
            DecodeError::MissingFieldDefinitions => {
                write!(f, "Data section is missing main field name definitions")
            }
            DecodeError::Export(msg) => write!(f, "Export error: {}", msg),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Io(err) => Some(err),
            DecodeError::Utf8(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(err: std::io::Error) -> Self {
        DecodeError::Io(err)
    }
}

impl From<std::str::Utf8Error> for DecodeError {
    fn from(err: std::str::Utf8Error) -> Self {
        DecodeError::Utf8(err)
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
