use std::fmt;
use std::io;

#[derive(Debug)]
pub enum Pl0Error {
    // File and I/O errors
    FileReadError(String),
    FileWriteError(String),
    IoError(io::Error),

    // Parsing errors
    SyntaxError {
        found: String,
        line: usize,
    },

    // Semantic analysis errors
    UndefinedSymbol {
        name: String,
        line: usize,
    },
    SymbolAlreadyDefined {
        name: String,
        line: usize,
    },

    // Code generation errors
    CodeGenError {
        message: String,
    },
}

impl Pl0Error {
    /// Create a code generation error
    pub fn codegen_error(message: impl Into<String>) -> Self {
        Pl0Error::CodeGenError {
            message: message.into(),
        }
    }
}

impl fmt::Display for Pl0Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pl0Error::FileReadError(msg) => write!(f, "File read error: {}", msg),
            Pl0Error::FileWriteError(msg) => write!(f, "File write error: {}", msg),
            Pl0Error::IoError(err) => write!(f, "I/O error: {}", err),

            Pl0Error::SyntaxError { found, line } => {
                write!(f, "Syntax error at line {}: unexpected token '{}'", line, found)
            }

            Pl0Error::UndefinedSymbol { name, line } => {
                write!(f, "Undefined symbol '{}' at line {}", name, line)
            }
            Pl0Error::SymbolAlreadyDefined { name, line } => {
                write!(f, "Symbol '{}' already defined at line {}", name, line)
            }

            Pl0Error::CodeGenError { message } => {
                write!(f, "Code generation error: {}", message)
            }
        }
    }
}

impl std::error::Error for Pl0Error {}

impl From<io::Error> for Pl0Error {
    fn from(err: io::Error) -> Self {
        Pl0Error::IoError(err)
    }
}

// Type alias for Result with Pl0Error
pub type Pl0Result<T> = Result<T, Pl0Error>;
