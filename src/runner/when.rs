//! When condition evaluation
//!
//! This module handles evaluating conditional expressions for run items.

use crate::error::ExecutionResult;
use crate::runner::{check_command, interpolate, Context, When, WhenCondition};
use std::env;

/// Evaluate a list of when conditions (all must be true - AND logic)
pub fn evaluate_when_list(when_list: &[When], ctx: &Context) -> ExecutionResult<bool> {
    for when in when_list {
        if !evaluate_when(when, ctx)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Evaluate a single when condition
pub fn evaluate_when(when: &When, ctx: &Context) -> ExecutionResult<bool> {
    match &when.condition {
        WhenCondition::Always => Ok(true),

        WhenCondition::Equal { left, right } => {
            Ok(interpolate(left, &ctx.vars)? == interpolate(right, &ctx.vars)?)
        }

        WhenCondition::NotEqual { left, right } => {
            Ok(interpolate(left, &ctx.vars)? != interpolate(right, &ctx.vars)?)
        }

        WhenCondition::Command(cmd) => check_command(cmd, ctx),

        WhenCondition::Exists(path) => {
            let path_str = interpolate(path, &ctx.vars)?;
            Ok(ctx.working_dir.join(path_str).exists())
        }

        WhenCondition::EnvSet(var_name) => {
            let var = interpolate(var_name, &ctx.vars)?;
            Ok(env::var(var).is_ok())
        }

        WhenCondition::EnvNotSet(var_name) => {
            let var = interpolate(var_name, &ctx.vars)?;
            Ok(env::var(var).is_err())
        }

        WhenCondition::VarSet(name) => Ok(ctx.vars.contains_key(name)),

        WhenCondition::VarNotSet(name) => Ok(!ctx.vars.contains_key(name)),

        WhenCondition::Production(expected) => {
            Ok(ctx.profile.mode.is_production() == *expected)
        }
    }
}
