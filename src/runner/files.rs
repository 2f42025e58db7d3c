//! File operations for run items
//!
//! `clean`, `copy`, `concat` and `inject` expand glob patterns relative to the working
//! directory. Patterns may use `{a,b}` alternatives, and a leading `!` turns a
//! pattern into an exclusion applied to every other match.

use crate::config::{Concat, CopyFiles, Inject};
use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::{interpolate_list, interpolate_strict, Context};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

/// A path produced by glob expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matched {
    /// Absolute (working-dir joined) path of the match
    pub path: PathBuf,
    /// Static prefix of the pattern that produced the match
    pub base: PathBuf,
}

/// Expand `{a,b}` alternatives into separate patterns
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };

    let mut depth = 0;
    let mut close = None;
    let mut splits = Vec::new();
    for (i, c) in pattern[open..].char_indices() {
        let i = open + i;
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(i),
            _ => {}
        }
    }

    // Unbalanced braces are taken literally
    let Some(close) = close else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    let mut bounds = vec![open];
    bounds.extend(splits);
    bounds.push(close);

    bounds
        .windows(2)
        .flat_map(|w| {
            let alternative = &pattern[w[0] + 1..w[1]];
            expand_braces(&format!("{}{}{}", prefix, alternative, suffix))
        })
        .collect()
}

/// Static directory prefix of a glob pattern (everything before the first wildcard)
pub fn glob_base(pattern: &str) -> PathBuf {
    let path = Path::new(pattern);
    let components: Vec<Component> = path.components().collect();
    let split = components
        .iter()
        .position(|c| c.as_os_str().to_string_lossy().contains(['*', '?', '[']))
        .unwrap_or(components.len());

    if split == components.len() {
        // A literal path is its own match; its base is the parent directory
        return path.parent().map(Path::to_path_buf).unwrap_or_default();
    }

    components.iter().take(split).collect()
}

fn build_globset(patterns: &[String]) -> ExecutionResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        for alternative in expand_braces(pattern) {
            let glob = GlobBuilder::new(&alternative)
                .literal_separator(true)
                .build()
                .map_err(|e| ExecutionError::Glob {
                    pattern: pattern.clone(),
                    error: e.to_string(),
                })?;
            builder.add(glob);
        }
    }
    builder.build().map_err(|e| ExecutionError::Glob {
        pattern: patterns.join(", "),
        error: e.to_string(),
    })
}

/// Split patterns into includes and `!` exclusions (without the `!`)
fn split_exclusions(patterns: &[String]) -> (Vec<String>, Vec<String>) {
    let mut includes = Vec::new();
    let mut excludes = Vec::new();
    for pattern in patterns {
        match pattern.strip_prefix('!') {
            Some(excluded) => excludes.push(excluded.to_string()),
            None => includes.push(pattern.clone()),
        }
    }
    (includes, excludes)
}

/// Matches working-dir relative paths the way `expand` selects them
#[derive(Debug, Clone)]
pub struct PathMatcher {
    includes: GlobSet,
    excludes: GlobSet,
}

impl PathMatcher {
    pub fn new(patterns: &[String]) -> ExecutionResult<Self> {
        let (includes, excludes) = split_exclusions(patterns);
        Ok(PathMatcher {
            includes: build_globset(&includes)?,
            excludes: build_globset(&excludes)?,
        })
    }

    pub fn is_match(&self, relative: &Path) -> bool {
        self.includes.is_match(relative) && !self.excludes.is_match(relative)
    }
}

/// Expand patterns into matching paths, in pattern order and without duplicates
pub fn expand(patterns: &[String], working_dir: &Path) -> ExecutionResult<Vec<Matched>> {
    let (includes, excludes) = split_exclusions(patterns);
    let excludes = build_globset(&excludes)?;

    let root = glob::Pattern::escape(&working_dir.to_string_lossy());
    let mut seen = HashSet::new();
    let mut matched = Vec::new();

    for pattern in &includes {
        for alternative in expand_braces(pattern) {
            let full = if Path::new(&alternative).is_absolute() {
                alternative.clone()
            } else {
                format!("{}/{}", root, alternative)
            };

            let paths = glob::glob(&full).map_err(|e| ExecutionError::Glob {
                pattern: pattern.clone(),
                error: e.to_string(),
            })?;

            let base = working_dir.join(glob_base(&alternative));
            for entry in paths {
                let path = entry.map_err(|e| {
                    let path = e.path().to_path_buf();
                    ExecutionError::file("Failed to read", path, e.into_error())
                })?;

                let relative = path.strip_prefix(working_dir).unwrap_or(&path);
                if excludes.is_match(relative) || !seen.insert(path.clone()) {
                    continue;
                }

                matched.push(Matched {
                    path,
                    base: base.clone(),
                });
            }
        }
    }

    Ok(matched)
}

/// Delete every file or directory matching `patterns`; returns how many were removed
pub fn clean(patterns: &[String], ctx: &Context) -> ExecutionResult<usize> {
    let patterns = interpolate_list(patterns, &ctx.vars)?;
    let mut removed = 0;

    for matched in expand(&patterns, &ctx.working_dir)? {
        let result = if matched.path.is_dir() {
            fs::remove_dir_all(&matched.path)
        } else {
            fs::remove_file(&matched.path)
        };

        match result {
            Ok(()) => {
                ctx.print_debug(&format!("removed {}", matched.path.display()));
                removed += 1;
            }
            // Already gone with a parent directory
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(ExecutionError::file("Failed to remove", matched.path, e)),
        }
    }

    Ok(removed)
}

/// Copy matching files into the destination directory; returns how many were copied
pub fn copy(spec: &CopyFiles, ctx: &Context) -> ExecutionResult<usize> {
    let src = interpolate_list(&spec.src, &ctx.vars)?;
    let dest = ctx.working_dir.join(interpolate_strict(&spec.dest, &ctx.vars)?);
    let base = spec
        .base
        .as_ref()
        .map(|b| interpolate_strict(b, &ctx.vars).map(|b| ctx.working_dir.join(b)))
        .transpose()?;

    let mut copied = 0;
    for matched in expand(&src, &ctx.working_dir)? {
        if !matched.path.is_file() {
            continue;
        }

        let base = base.as_ref().unwrap_or(&matched.base);
        let relative = match matched.path.strip_prefix(base) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => matched.path.file_name().map(PathBuf::from).unwrap_or_default(),
        };
        let target = dest.join(relative);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ExecutionError::file("Failed to create", parent, e))?;
        }
        fs::copy(&matched.path, &target)
            .map_err(|e| ExecutionError::file("Failed to copy", &matched.path, e))?;

        ctx.print_debug(&format!(
            "copied {} -> {}",
            matched.path.display(),
            target.display()
        ));
        copied += 1;
    }

    Ok(copied)
}

/// Join matching files into one output file; returns how many files were joined
pub fn concat(spec: &Concat, ctx: &Context) -> ExecutionResult<usize> {
    let src = interpolate_list(&spec.src, &ctx.vars)?;
    let output = ctx.working_dir.join(interpolate_strict(&spec.output, &ctx.vars)?);

    let mut parts = Vec::new();
    for matched in expand(&src, &ctx.working_dir)? {
        if !matched.path.is_file() {
            continue;
        }
        let contents = fs::read_to_string(&matched.path)
            .map_err(|e| ExecutionError::file("Failed to read", &matched.path, e))?;
        parts.push(contents);
    }

    let joined = format!("{}{}{}", spec.header, parts.join(&spec.separator), spec.footer);

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| ExecutionError::file("Failed to create", parent, e))?;
    }
    fs::write(&output, joined).map_err(|e| ExecutionError::file("Failed to write", &output, e))?;

    ctx.print_debug(&format!(
        "wrote {} from {} files",
        output.display(),
        parts.len()
    ));
    Ok(parts.len())
}

fn end_marker() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*(?:<!--|//-?)\s*endinject\s*(?:-->)?\s*$").unwrap())
}

fn start_marker(name: &str) -> ExecutionResult<Regex> {
    let pattern = format!(
        r"^(\s*)(?:<!--|//-?)\s*{}:(\w+)\s*(?:-->)?\s*$",
        regex::escape(name)
    );
    Regex::new(&pattern).map_err(|e| ExecutionError::Failed(format!("bad inject name '{}': {}", name, e)))
}

/// URL of an injected file: forward slashes, `ignore` stripped, `prefix` added, rooted at `/`
fn reference_url(relative: &Path, ignore: Option<&str>, prefix: Option<&str>) -> String {
    let mut path = relative.to_string_lossy().replace('\\', "/");

    if let Some(ignore) = ignore.map(|i| i.trim_matches('/')).filter(|i| !i.is_empty()) {
        if let Some(rest) = path.strip_prefix(ignore) {
            if rest.is_empty() || rest.starts_with('/') {
                path = rest.to_string();
            }
        }
    }

    let path = format!("/{}", path.trim_start_matches('/'));
    match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(prefix) => format!("/{}{}", prefix, path),
        None => path,
    }
}

fn reference_tag(url: &str, ext: &str, jade: bool) -> Option<String> {
    match (ext, jade) {
        ("js", false) => Some(format!(r#"<script src="{}"></script>"#, url)),
        ("css", false) => Some(format!(r#"<link rel="stylesheet" href="{}">"#, url)),
        ("js", true) => Some(format!(r#"script(src="{}")"#, url)),
        ("css", true) => Some(format!(r#"link(rel="stylesheet", href="{}")"#, url)),
        _ => None,
    }
}

/// Replace the contents of every `<name>:<ext>` block with tags for the
/// references of that extension; returns the new text and the tag count
pub fn render_injection(
    template: &str,
    name: &str,
    urls: &[String],
    jade: bool,
) -> ExecutionResult<(String, usize)> {
    let start = start_marker(name)?;
    let end = end_marker();

    let mut out: Vec<String> = Vec::new();
    let mut injected = 0;
    let mut lines = template.lines();

    while let Some(line) = lines.next() {
        out.push(line.to_string());
        let Some(caps) = start.captures(line) else {
            continue;
        };

        let Some(end_line) = lines.by_ref().find(|inner| end.is_match(inner)) else {
            return Err(ExecutionError::Failed(format!(
                "'{}:{}' block has no endinject marker",
                name, &caps[2]
            )));
        };

        let indent = &caps[1];
        let ext = &caps[2];
        for url in urls {
            if Path::new(url).extension().and_then(|e| e.to_str()) != Some(ext) {
                continue;
            }
            if let Some(tag) = reference_tag(url, ext, jade) {
                out.push(format!("{}{}", indent, tag));
                injected += 1;
            }
        }
        out.push(end_line.to_string());
    }

    let mut rendered = out.join("\n");
    if template.ends_with('\n') {
        rendered.push('\n');
    }
    Ok((rendered, injected))
}

/// Render a template with references to the matched sources into `dest`;
/// returns how many references were written
pub fn inject(spec: &Inject, ctx: &Context) -> ExecutionResult<usize> {
    let template = ctx.working_dir.join(interpolate_strict(&spec.template, &ctx.vars)?);
    let sources = interpolate_list(&spec.sources, &ctx.vars)?;
    let dest = ctx.working_dir.join(interpolate_strict(&spec.dest, &ctx.vars)?);
    let ignore_path = spec
        .ignore_path
        .as_ref()
        .map(|p| interpolate_strict(p, &ctx.vars))
        .transpose()?;
    let add_prefix = spec
        .add_prefix
        .as_ref()
        .map(|p| interpolate_strict(p, &ctx.vars))
        .transpose()?;

    let mut urls = Vec::new();
    for matched in expand(&sources, &ctx.working_dir)? {
        if !matched.path.is_file() {
            continue;
        }
        let relative = matched.path.strip_prefix(&ctx.working_dir).unwrap_or(&matched.path);
        urls.push(reference_url(relative, ignore_path.as_deref(), add_prefix.as_deref()));
    }

    let contents = fs::read_to_string(&template)
        .map_err(|e| ExecutionError::file("Failed to read", &template, e))?;
    let jade = matches!(
        template.extension().and_then(|e| e.to_str()),
        Some("jade" | "pug")
    );
    let (rendered, injected) = render_injection(&contents, &spec.name, &urls, jade)?;

    let file_name = template.file_name().ok_or_else(|| {
        ExecutionError::Failed(format!("inject template '{}' is not a file", template.display()))
    })?;
    let target = dest.join(file_name);
    fs::create_dir_all(&dest).map_err(|e| ExecutionError::file("Failed to create", &dest, e))?;
    fs::write(&target, rendered).map_err(|e| ExecutionError::file("Failed to write", &target, e))?;

    ctx.print_debug(&format!(
        "injected {} references into {}",
        injected,
        target.display()
    ));
    Ok(injected)
}
