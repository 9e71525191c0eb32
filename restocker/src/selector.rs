use crate::errors::AutomationError;
use serde::{Deserialize, Serialize};

/// Represents ways to locate an element on the surface
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Selector {
    /// Select using a CSS selector
    Css(String),
    /// Select using an XPath expression
    XPath(String),
    /// Represents an invalid selector string, with a reason.
    Invalid(String),
}

impl Selector {
    /// Returns the selector unchanged, or an `InvalidSelector` error if it
    /// could not be parsed.
    pub fn validate(self) -> Result<Self, AutomationError> {
        match self {
            Selector::Invalid(reason) => Err(AutomationError::InvalidSelector(reason)),
            s => Ok(s),
        }
    }

    /// The raw expression without the kind prefix.
    pub fn expression(&self) -> &str {
        match self {
            Selector::Css(s) | Selector::XPath(s) | Selector::Invalid(s) => s,
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Css(s) => write!(f, "css:{s}"),
            Selector::XPath(s) => write!(f, "xpath:{s}"),
            Selector::Invalid(reason) => write!(f, "invalid:{reason}"),
        }
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        let s = s.trim();
        let lower = s.to_lowercase();

        match s {
            "" => Selector::Invalid("Empty selector".to_string()),
            _ if lower.starts_with("css:") => {
                let inner = s["css:".len()..].trim();
                if inner.is_empty() {
                    Selector::Invalid(format!("Missing expression in selector: \"{s}\""))
                } else {
                    Selector::Css(inner.to_string())
                }
            }
            _ if lower.starts_with("xpath:") => {
                let inner = s["xpath:".len()..].trim();
                if inner.is_empty() {
                    Selector::Invalid(format!("Missing expression in selector: \"{s}\""))
                } else {
                    Selector::XPath(inner.to_string())
                }
            }
            // Bare XPath: absolute/relative paths and parenthesised expressions
            _ if s.starts_with('/') || s.starts_with("(/") || s.starts_with("./") => {
                Selector::XPath(s.to_string())
            }
            _ => Selector::Css(s.to_string()),
        }
    }
}

impl From<String> for Selector {
    fn from(s: String) -> Self {
        Selector::from(s.as_str())
    }
}

impl From<Selector> for String {
    fn from(selector: Selector) -> Self {
        match selector {
            Selector::Css(s) => format!("css:{s}"),
            Selector::XPath(s) => format!("xpath:{s}"),
            Selector::Invalid(reason) => reason,
        }
    }
}
