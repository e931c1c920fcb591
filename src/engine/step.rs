// SPDX-License-Identifier: MIT

use std::sync::Arc;

use super::error::StepError;
use super::state::State;

/// Result of a single step: the partial update to merge into state
pub type StepResult = Result<State, StepError>;

/// Behaviour attached to a node.
///
/// A step receives the live working state. Keys it returns are shallow-merged
/// into state after the call; direct mutations through `state` persist even if
/// they are not returned. An empty map means no change.
pub trait StepFunction: Send + Sync {
    fn call(&self, state: &mut State) -> StepResult;
}

/// Predicate deciding whether an edge fires.
///
/// Evaluated against the state after the source node's update was merged.
pub trait Guard: Send + Sync {
    fn evaluate(&self, state: &State) -> bool;
}

impl<S: StepFunction + ?Sized> StepFunction for Arc<S> {
    fn call(&self, state: &mut State) -> StepResult {
        (**self).call(state)
    }
}

impl<G: Guard + ?Sized> Guard for Arc<G> {
    fn evaluate(&self, state: &State) -> bool {
        (**self).evaluate(state)
    }
}

/// Step backed by a closure
pub struct FnStep<F>(F);

impl<F> StepFunction for FnStep<F>
where
    F: Fn(&mut State) -> StepResult + Send + Sync,
{
    fn call(&self, state: &mut State) -> StepResult {
        (self.0)(state)
    }
}

/// Guard backed by a closure
pub struct FnGuard<F>(F);

impl<F> Guard for FnGuard<F>
where
    F: Fn(&State) -> bool + Send + Sync,
{
    fn evaluate(&self, state: &State) -> bool {
        (self.0)(state)
    }
}

/// Wrap a closure as a [`StepFunction`]
pub fn step<F>(f: F) -> FnStep<F>
where
    F: Fn(&mut State) -> StepResult + Send + Sync,
{
    FnStep(f)
}

/// Wrap a closure as a [`Guard`]
pub fn guard<F>(f: F) -> FnGuard<F>
where
    F: Fn(&State) -> bool + Send + Sync,
{
    FnGuard(f)
}
