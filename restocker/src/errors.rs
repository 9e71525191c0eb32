use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Platform-specific error: {0}")]
    PlatformError(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Element is detached from DOM: {0}")]
    ElementDetached(String),

    #[error("Element is not visible: {0}")]
    ElementNotVisible(String),

    #[error("Element is not enabled: {0}")]
    ElementNotEnabled(String),

    #[error("Element is obscured by another element: {0}")]
    ElementObscured(String),
}
