//! Task actions
//!
//! An action is the unit of work behind a task. Its return value is the
//! completion signal: the runner treats `Ok(())` as done and an error as the
//! task's failure cause. Actions that drive external processes block until the
//! process exits.

use crate::error::ExecutionResult;
use crate::runner::Context;

/// The work performed by a task
pub trait Action {
    fn run(&self, ctx: &mut Context) -> ExecutionResult<()>;
}

impl<F> Action for F
where
    F: Fn(&mut Context) -> ExecutionResult<()>,
{
    fn run(&self, ctx: &mut Context) -> ExecutionResult<()> {
        self(ctx)
    }
}

/// Action of a task that only groups its prerequisites
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAction;

impl Action for NoAction {
    fn run(&self, _ctx: &mut Context) -> ExecutionResult<()> {
        Ok(())
    }
}
