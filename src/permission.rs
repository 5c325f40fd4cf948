//! Permission expressions (`can.employee.view`) and the guard calls generated from them.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

use crate::ir::{DirectiveId, DirectiveNode};

/// Function the rewritten template calls to check a permission path.
pub const GUARD_FUNCTION: &str = "__can__";

/// Identifiers that denote the permission namespace in a `v-can` expression.
pub const PERMISSION_ROOTS: [&str; 2] = ["can", "$can"];

/// Minimum number of segments after the root.
pub const MIN_SEGMENTS: usize = 2;

lazy_static! {
    static ref SEGMENT_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// PERMISSION PATH
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordered segments of a permission, root excluded. Equality is order- and
/// length-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermissionPath(Vec<String>);

impl PermissionPath {
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// `__can__('employee', 'view')`
    pub fn guard_call(&self) -> String {
        guard_call(&self.0)
    }
}

impl fmt::Display for PermissionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "can.{}", self.0.join("."))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("requires a permission expression such as `can.employee.view`.")]
    Empty,
    #[error("expressions must start with `can.` or `$can.` (found `{0}`).")]
    UnknownRoot(String),
    #[error("expressions need at least two segments after `can.` (for example `can.employee.view`), found `{0}`.")]
    TooFewSegments(String),
    #[error("segment `{0}` may only contain letters, digits, `_` and `-`.")]
    InvalidSegment(String),
}

/// Validate and split a dotted permission expression.
pub fn parse_permission_expression(raw: &str) -> Result<PermissionPath, PathError> {
    let expression = raw.trim();
    if expression.is_empty() {
        return Err(PathError::Empty);
    }

    let mut parts = expression.split('.');
    let root = parts.next().unwrap_or_default();
    if !PERMISSION_ROOTS.contains(&root) {
        return Err(PathError::UnknownRoot(root.to_string()));
    }

    let segments: Vec<String> = parts.map(str::to_string).collect();
    if segments.len() < MIN_SEGMENTS {
        return Err(PathError::TooFewSegments(expression.to_string()));
    }
    if let Some(bad) = segments.iter().find(|s| !SEGMENT_RE.is_match(s)) {
        return Err(PathError::InvalidSegment(bad.clone()));
    }

    Ok(PermissionPath(segments))
}

// ═══════════════════════════════════════════════════════════════════════════════
// GUARD CALL GENERATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Single-quoted JS string literal: backslash first, then quote.
pub fn quote_segment(segment: &str) -> String {
    format!("'{}'", segment.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Guard invocation with one quoted argument per segment.
pub fn guard_call<S: AsRef<str>>(segments: &[S]) -> String {
    let args: Vec<String> = segments.iter().map(|s| quote_segment(s.as_ref())).collect();
    format!("{}({})", GUARD_FUNCTION, args.join(", "))
}

// ═══════════════════════════════════════════════════════════════════════════════
// PER-RUN CACHE
// ═══════════════════════════════════════════════════════════════════════════════

/// Parsed paths keyed by directive identity, so a directive queried by both the
/// chain linker and the patch generator is validated exactly once.
#[derive(Debug, Default)]
pub struct PathCache {
    parsed: HashMap<DirectiveId, Result<PermissionPath, PathError>>,
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the directive's expression, or return the earlier outcome.
    /// A directive without an expression parses as empty.
    pub fn resolve(
        &mut self,
        id: DirectiveId,
        directive: &DirectiveNode,
    ) -> Result<PermissionPath, PathError> {
        self.parsed
            .entry(id)
            .or_insert_with(|| {
                let raw = directive.exp.as_ref().map(|e| e.content.as_str()).unwrap_or("");
                parse_permission_expression(raw)
            })
            .clone()
    }

    /// Number of directives resolved so far.
    pub fn resolved(&self) -> usize {
        self.parsed.len()
    }
}
