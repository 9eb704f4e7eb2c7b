use crate::error::MutationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

/// Binds the variable and response types of one kind of mutation.
pub trait Operation: 'static {
    type Variables: Clone + fmt::Debug + 'static;
    type Response: Clone + fmt::Debug + 'static;

    /// Whether a merged `variables` value counts as present.
    ///
    /// Statically typed operations always have variables once the field is set;
    /// dynamically typed ones can override this to reject e.g. a JSON `null`.
    fn has_variables(_variables: &Self::Variables) -> bool {
        true
    }
}

/// Dynamically typed operation: variables and response are raw JSON.
#[derive(Debug, Clone, Copy)]
pub enum JsonOperation {}

impl Operation for JsonOperation {
    type Variables = serde_json::Value;
    type Response = serde_json::Value;

    fn has_variables(variables: &serde_json::Value) -> bool {
        !variables.is_null()
    }
}

/// Opaque mutation document. The core never looks inside `text`.
pub struct MutationDocument<O> {
    name: Rc<str>,
    text: Rc<str>,
    _op: PhantomData<fn() -> O>,
}

impl<O> MutationDocument<O> {
    pub fn new(name: impl Into<Rc<str>>, text: impl Into<Rc<str>>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            _op: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

// Derived `Clone`/`Debug` would require `O: Clone`/`O: Debug`.
impl<O> Clone for MutationDocument<O> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            text: self.text.clone(),
            _op: PhantomData,
        }
    }
}

impl<O> fmt::Debug for MutationDocument<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationDocument")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Coarse phase of a [`MutationState`], mostly for presentation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationStatus {
    Idle,
    Loading,
    Completed,
    Failed,
}

impl MutationStatus {
    pub fn label(self) -> &'static str {
        match self {
            MutationStatus::Idle => "idle",
            MutationStatus::Loading => "loading",
            MutationStatus::Completed => "completed",
            MutationStatus::Failed => "failed",
        }
    }
}

/// Observable snapshot of a mutation.
///
/// Snapshots are replaced whole, never patched: `data` and `error` are never
/// both set, and once `loading` is false at most one of them is set.
#[derive(Debug, Clone, Serialize)]
pub struct MutationState<T> {
    pub loading: bool,
    pub data: Option<T>,
    pub error: Option<MutationError>,
}

impl<T> MutationState<T> {
    pub fn idle() -> Self {
        Self {
            loading: false,
            data: None,
            error: None,
        }
    }

    pub fn in_flight() -> Self {
        Self {
            loading: true,
            data: None,
            error: None,
        }
    }

    pub fn completed(data: T) -> Self {
        Self {
            loading: false,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: MutationError) -> Self {
        Self {
            loading: false,
            data: None,
            error: Some(error),
        }
    }

    pub fn status(&self) -> MutationStatus {
        match (self.loading, &self.data, &self.error) {
            (true, _, _) => MutationStatus::Loading,
            (false, _, Some(_)) => MutationStatus::Failed,
            (false, Some(_), None) => MutationStatus::Completed,
            (false, None, None) => MutationStatus::Idle,
        }
    }
}

impl<T> Default for MutationState<T> {
    fn default() -> Self {
        Self::idle()
    }
}

/// One step in the response path a field error points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Index(i) => write!(f, "{i}"),
            PathSegment::Key(k) => f.write_str(k),
        }
    }
}

/// Partial-failure signal returned alongside an otherwise successful response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
}

impl FieldError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
            extensions: None,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return f.write_str(&self.message);
        }
        let path: Vec<String> = self.path.iter().map(|p| p.to_string()).collect();
        write!(f, "{} (at {})", self.message, path.join("."))
    }
}
