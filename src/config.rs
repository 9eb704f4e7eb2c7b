//! Merge-eligible mutation configuration.

use crate::error::MutationError;
use crate::executor::RecordStore;
use crate::model::Operation;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

pub type CompletedCallback<T> = Rc<dyn Fn(&T)>;
pub type ErrorCallback = Rc<dyn Fn(&MutationError)>;
pub type OptimisticUpdater = Rc<dyn Fn(&mut dyn RecordStore)>;
pub type Updater<T> = Rc<dyn Fn(&mut dyn RecordStore, &T)>;

/// Side-effect configs are passed to the executor untouched.
pub type DeclarativeConfigs = Vec<serde_json::Value>;

/// A file attached to a mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Uploadable {
    pub file_name: String,
    pub content_type: Option<String>,
    pub content: Bytes,
}

pub type Uploadables = BTreeMap<String, Uploadable>;

/// Configuration for a mutation. Used both as the base config supplied when a
/// runner is created and as the per-call override passed to `invoke`.
pub struct MutationConfig<O: Operation> {
    pub variables: Option<O::Variables>,
    pub uploadables: Option<Uploadables>,
    pub configs: Option<DeclarativeConfigs>,
    pub optimistic_response: Option<O::Response>,
    pub optimistic_updater: Option<OptimisticUpdater>,
    pub updater: Option<Updater<O::Response>>,
    pub on_completed: Option<CompletedCallback<O::Response>>,
    pub on_error: Option<ErrorCallback>,
}

impl<O: Operation> MutationConfig<O> {
    pub fn new() -> Self {
        Self {
            variables: None,
            uploadables: None,
            configs: None,
            optimistic_response: None,
            optimistic_updater: None,
            updater: None,
            on_completed: None,
            on_error: None,
        }
    }

    pub fn variables(mut self, variables: O::Variables) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn uploadable(mut self, key: impl Into<String>, file: Uploadable) -> Self {
        self.uploadables
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), file);
        self
    }

    pub fn configs(mut self, configs: DeclarativeConfigs) -> Self {
        self.configs = Some(configs);
        self
    }

    pub fn optimistic_response(mut self, response: O::Response) -> Self {
        self.optimistic_response = Some(response);
        self
    }

    pub fn optimistic_updater(mut self, f: impl Fn(&mut dyn RecordStore) + 'static) -> Self {
        self.optimistic_updater = Some(Rc::new(f));
        self
    }

    pub fn updater(mut self, f: impl Fn(&mut dyn RecordStore, &O::Response) + 'static) -> Self {
        self.updater = Some(Rc::new(f));
        self
    }

    pub fn on_completed(mut self, f: impl Fn(&O::Response) + 'static) -> Self {
        self.on_completed = Some(Rc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&MutationError) + 'static) -> Self {
        self.on_error = Some(Rc::new(f));
        self
    }

    /// Layer `call` over `self`, field by field. A field set in `call` wins;
    /// an unset one falls back to `self`.
    pub fn merged_with(&self, call: MutationConfig<O>) -> MutationConfig<O> {
        MutationConfig {
            variables: call.variables.or_else(|| self.variables.clone()),
            uploadables: call.uploadables.or_else(|| self.uploadables.clone()),
            configs: call.configs.or_else(|| self.configs.clone()),
            optimistic_response: call
                .optimistic_response
                .or_else(|| self.optimistic_response.clone()),
            optimistic_updater: call
                .optimistic_updater
                .or_else(|| self.optimistic_updater.clone()),
            updater: call.updater.or_else(|| self.updater.clone()),
            on_completed: call.on_completed.or_else(|| self.on_completed.clone()),
            on_error: call.on_error.or_else(|| self.on_error.clone()),
        }
    }
}

impl<O: Operation> Default for MutationConfig<O> {
    fn default() -> Self {
        Self::new()
    }
}

// Closures are cheap `Rc` clones; a derive would demand `O: Clone`.
impl<O: Operation> Clone for MutationConfig<O> {
    fn clone(&self) -> Self {
        Self {
            variables: self.variables.clone(),
            uploadables: self.uploadables.clone(),
            configs: self.configs.clone(),
            optimistic_response: self.optimistic_response.clone(),
            optimistic_updater: self.optimistic_updater.clone(),
            updater: self.updater.clone(),
            on_completed: self.on_completed.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<O: Operation> fmt::Debug for MutationConfig<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationConfig")
            .field("variables", &self.variables)
            .field("uploadables", &self.uploadables.as_ref().map(|u| u.len()))
            .field("configs", &self.configs)
            .field("optimistic_response", &self.optimistic_response)
            .field("optimistic_updater", &self.optimistic_updater.is_some())
            .field("updater", &self.updater.is_some())
            .field("on_completed", &self.on_completed.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
