//! Render-callback wrapper around [`MutationRunner`].
//!
//! Holds no state of its own: every render hands the bound invoke function and
//! the latest snapshot to `children` and returns whatever it produced.

use crate::config::MutationConfig;
use crate::error::PreconditionError;
use crate::executor::{Environment, ExecutionContext};
use crate::liveness::LivenessGuard;
use crate::model::{MutationDocument, MutationState, Operation};
use crate::runner::{Invoke, MutationRunner, OverlapPolicy, Subscription};

/// Everything a [`MutationRenderer`] takes besides the render callback.
pub struct MutationProps<O: Operation> {
    pub mutation: MutationDocument<O>,
    /// Falls back to the execution context when `None`.
    pub environment: Option<Environment<O>>,
    pub config: MutationConfig<O>,
}

impl<O: Operation> MutationProps<O> {
    pub fn new(mutation: MutationDocument<O>) -> Self {
        Self {
            mutation,
            environment: None,
            config: MutationConfig::new(),
        }
    }

    pub fn environment(mut self, environment: Environment<O>) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn config(mut self, config: MutationConfig<O>) -> Self {
        self.config = config;
        self
    }
}

pub struct MutationRenderer<O: Operation, F> {
    runner: MutationRunner<O>,
    children: F,
}

impl<O, F, Out> MutationRenderer<O, F>
where
    O: Operation,
    F: FnMut(&Invoke<O>, &MutationState<O::Response>) -> Out,
{
    pub fn new(
        props: MutationProps<O>,
        context: &ExecutionContext<O>,
        liveness: LivenessGuard,
        children: F,
    ) -> Result<Self, PreconditionError> {
        let MutationProps {
            mutation,
            environment,
            config,
        } = props;
        let runner = MutationRunner::new(mutation, config, environment, context, liveness)?;
        Ok(Self { runner, children })
    }

    pub fn with_overlap_policy(mut self, overlap: OverlapPolicy) -> Self {
        self.runner = self.runner.with_overlap_policy(overlap);
        self
    }

    pub fn render(&mut self) -> Out {
        let (invoke, state) = self.runner.bind();
        (self.children)(&invoke, &state)
    }

    /// Register a re-render trigger, fired on every state replacement.
    pub fn subscribe(&self, f: impl Fn(&MutationState<O::Response>) + 'static) -> Subscription {
        self.runner.subscribe(f)
    }

    /// Swap the base config; the next render sees a new invoke identity.
    pub fn set_config(&mut self, config: MutationConfig<O>) {
        self.runner.set_base_config(config);
    }

    pub fn runner(&self) -> &MutationRunner<O> {
        &self.runner
    }
}
