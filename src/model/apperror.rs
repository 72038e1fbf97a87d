use std::fmt;

/**
 * Represents the type of error that can occur within the application.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorType {
    /**
     * Startup failures, e.g. configuration or logging.
     */
    Initialization,
    /**
     * Invalid form input. Recovered by the form and never persisted.
     */
    Validation,
    /**
     * The ledger file exists but could not be parsed.
     */
    MalformedFile,
    /**
     * The ledger file could not be read or written.
     */
    WriteFailure,
}

/**
 * Represents an error that occurs within the application.
 */
#[derive(Debug, Clone)]
pub struct ApplicationError {
    /**
     * Error type.
     */
    pub error_type: ErrorType,
    /**
     * Error message describing problem.
     */
    pub message: String,
}

impl ApplicationError {
    /**
     * Creates a new ApplicationError.
     *
     * #Arguments
     * `error_type`: The type of error.
     * `message`: A description of the error.
     */
    pub fn new(error_type: ErrorType, message: String) -> Self {
        ApplicationError { error_type, message }
    }
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApplicationError {}

impl From<ApplicationError> for std::io::Error {
    fn from(err: ApplicationError) -> Self {
        std::io::Error::other(err.message)
    }
}
