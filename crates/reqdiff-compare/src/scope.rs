//! Narrowing a payload to the part selected by a path expression

use crate::path::JsonPath;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScopeError {
    #[error("invalid path '{expression}': {message}")]
    InvalidSyntax { expression: String, message: String },

    #[error("path '{expression}' matched nothing")]
    NoMatch { expression: String },
}

/// Select the part of `value` named by `expression`
///
/// An empty expression returns the whole value. A single match is returned
/// bare; several matches come back as an array in document order.
pub fn scope_by_path(value: &Value, expression: &str) -> Result<Value, ScopeError> {
    let expression = expression.trim();
    if expression.is_empty() {
        return Ok(value.clone());
    }

    let path = JsonPath::parse(expression).map_err(|e| ScopeError::InvalidSyntax {
        expression: expression.to_string(),
        message: e.to_string(),
    })?;

    let mut matches = path.select(value);
    match matches.len() {
        0 => Err(ScopeError::NoMatch {
            expression: expression.to_string(),
        }),
        1 => Ok(matches.remove(0).clone()),
        _ => Ok(Value::Array(matches.into_iter().cloned().collect())),
    }
}
