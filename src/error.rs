//! Error types.
//!
//! Two families, never mixed:
//! - [`PreconditionError`]: caller contract violations, returned synchronously
//!   from construction or `invoke`. They never reach `on_error` or the state.
//! - [`MutationError`]: operation failures, delivered through the state
//!   snapshot and then either `on_error` or the pending result.

use crate::model::FieldError;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Caller configuration errors surfaced before anything is committed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("you must specify variables for mutation {mutation}")]
    MissingVariables { mutation: String },

    #[error(
        "no environment for mutation {mutation}: pass one explicitly or provide an execution context"
    )]
    MissingEnvironment { mutation: String },
}

/// Field-level errors reported with a response, routed as one failure value.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldErrors(pub Vec<FieldError>);

impl FieldErrors {
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

/// Failure of a committed mutation.
///
/// The error channel carries either a single transport error or a collection
/// of field errors; both are kept distinct rather than flattened.
#[derive(Debug, Clone, Error)]
pub enum MutationError {
    #[error("transport failure: {0:#}")]
    Transport(Arc<anyhow::Error>),

    #[error("{} field error(s): {0}", .0.len())]
    Field(FieldErrors),

    /// The executor dropped its completion sink without reporting a result.
    #[error("executor dropped the mutation without a result")]
    Abandoned,
}

impl MutationError {
    pub fn transport(error: impl Into<anyhow::Error>) -> Self {
        MutationError::Transport(Arc::new(error.into()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MutationError::Transport(_) => "transport",
            MutationError::Field(_) => "field",
            MutationError::Abandoned => "abandoned",
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            MutationError::Field(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<Vec<FieldError>> for MutationError {
    fn from(errors: Vec<FieldError>) -> Self {
        MutationError::Field(FieldErrors(errors))
    }
}

impl Serialize for MutationError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("MutationError", 3)?;
        s.serialize_field("kind", self.kind())?;
        s.serialize_field("message", &self.to_string())?;
        match self {
            MutationError::Field(errors) => s.serialize_field("field_errors", &errors.0)?,
            _ => s.skip_field("field_errors")?,
        }
        s.end()
    }
}
