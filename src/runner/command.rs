//! Command execution
//!
//! This module handles executing shell commands through the configured interpreter.

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::{interpolate, Command, Context};
use std::path::Path;
use std::process::{Command as StdCommand, Stdio};

/// Build a process that runs `script` through the context's interpreter
fn shell(script: &str, working_dir: &Path, ctx: &Context) -> ExecutionResult<StdCommand> {
    let (program, args) = ctx
        .interpreter
        .split_first()
        .ok_or_else(|| ExecutionError::Failed("no interpreter configured".to_string()))?;

    let mut command = StdCommand::new(program);
    command.args(args).arg(script).current_dir(working_dir);

    // Variables are visible to the command as environment
    for (key, value) in &ctx.vars {
        command.env(key, value);
    }

    Ok(command)
}

fn spawn_error(ctx: &Context, error: std::io::Error) -> ExecutionError {
    ExecutionError::Spawn {
        program: ctx.interpreter.first().cloned().unwrap_or_default(),
        error: error.to_string(),
    }
}

/// Execute a command in the given context
///
/// `quiet` suppresses echoing the command, as does a quiet command itself.
pub fn execute_command(cmd: &Command, ctx: &Context, quiet: bool) -> ExecutionResult<()> {
    let exec_str = interpolate(cmd.exec(), &ctx.vars)?;

    if !quiet && !cmd.is_quiet() {
        let print_str =
            interpolate(cmd.print(), &ctx.vars).unwrap_or_else(|_| cmd.print().to_string());
        ctx.print_command(&print_str);
    }

    let working_dir = match cmd.dir() {
        Some(dir) => ctx.working_dir.join(interpolate(dir, &ctx.vars)?),
        None => ctx.working_dir.clone(),
    };

    let status = shell(&exec_str, &working_dir, ctx)?
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| spawn_error(ctx, e))?;

    if !status.success() {
        if cmd.ignores_errors() {
            ctx.print_warn(&format!(
                "'{}' exited with code {:?}, continuing",
                exec_str,
                status.code()
            ));
            return Ok(());
        }
        return Err(ExecutionError::CommandFailed(status.code()));
    }

    Ok(())
}

/// Check if a command succeeds (for when conditions)
pub fn check_command(cmd_str: &str, ctx: &Context) -> ExecutionResult<bool> {
    let exec_str = interpolate(cmd_str, &ctx.vars)?;

    let status = shell(&exec_str, &ctx.working_dir, ctx)?
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| spawn_error(ctx, e))?;

    Ok(status.success())
}

/// Start a command in the background and hand it to the context
pub fn spawn_background(cmd_str: &str, ctx: &mut Context) -> ExecutionResult<()> {
    let exec_str = interpolate(cmd_str, &ctx.vars)?;
    ctx.print_command(&format!("{} &", exec_str));

    let child = shell(&exec_str, &ctx.working_dir, ctx)?
        .stdin(Stdio::null())
        .spawn()
        .map_err(|e| spawn_error(ctx, e))?;

    ctx.adopt_background(exec_str, child);
    Ok(())
}
