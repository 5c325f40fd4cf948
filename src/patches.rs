//! Patch generation for `v-can` / `v-cannot`.
//!
//! Walks the tree depth-first and, for every guarded or denied element, emits
//! text patches that rewrite the directives into plain `v-if` / `v-else-if`
//! conditions calling the guard function.

use tracing::trace;

use crate::chains::{link_chains, InheritanceMap};
use crate::condition::{escape_for_double_quotes, is_valid_condition};
use crate::directives::{BranchKind, DirectiveCache, DirectiveRef, DirectiveSet};
use crate::ir::{NodeId, SourceSpan, TemplateAst, TemplateNode};
use crate::patcher::Patch;
use crate::permission::{PathCache, PermissionPath};
use crate::validate::{ErrorContext, ErrorKind, Result};
use crate::visitor::TemplateVisitor;

// ═══════════════════════════════════════════════════════════════════════════════
// PENDING GUARD STATE MACHINE
// ═══════════════════════════════════════════════════════════════════════════════

/// What a bare `v-cannot` would deny if it came next in the sibling list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PendingGuard {
    #[default]
    Empty,
    Guard(PermissionPath),
}

/// How an element was handled, as far as the next sibling is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementOutcome {
    /// Carries a guard, explicit or inherited from its chain.
    Guarded(PermissionPath),
    /// Carried a `v-cannot`, which consumes the pending guard.
    Denied,
    Unguarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiblingEvent {
    BlankText,
    Comment,
    /// Non-blank text, interpolation or any other non-element content.
    Content,
    Element(ElementOutcome),
}

impl PendingGuard {
    pub fn step(self, event: SiblingEvent) -> PendingGuard {
        match event {
            SiblingEvent::BlankText | SiblingEvent::Comment => self,
            SiblingEvent::Content => PendingGuard::Empty,
            SiblingEvent::Element(ElementOutcome::Guarded(path)) => PendingGuard::Guard(path),
            SiblingEvent::Element(_) => PendingGuard::Empty,
        }
    }

    pub fn path(&self) -> Option<&PermissionPath> {
        match self {
            PendingGuard::Guard(path) => Some(path),
            PendingGuard::Empty => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PATCH COLLECTOR
// ═══════════════════════════════════════════════════════════════════════════════

pub struct PatchCollector<'a, 'r> {
    ast: &'a TemplateAst,
    directives: &'r mut DirectiveCache<'a>,
    paths: &'r mut PathCache,
    inherited: &'r InheritanceMap,
    ctx: &'r ErrorContext,
    patches: Vec<Patch>,
}

impl<'a, 'r> PatchCollector<'a, 'r> {
    pub fn new(
        ast: &'a TemplateAst,
        directives: &'r mut DirectiveCache<'a>,
        paths: &'r mut PathCache,
        inherited: &'r InheritanceMap,
        ctx: &'r ErrorContext,
    ) -> Self {
        PatchCollector {
            ast,
            directives,
            paths,
            inherited,
            ctx,
            patches: Vec::new(),
        }
    }

    pub fn into_patches(self) -> Vec<Patch> {
        self.patches
    }

    fn push(&mut self, span: &SourceSpan, text: String) {
        let base = self.ctx.base();
        trace!(start = base + span.start, end = base + span.end, text = %text, "patch");
        self.patches
            .push(Patch::replace(base + span.start, base + span.end, text));
    }

    fn handle_element(&mut self, id: NodeId, pending: &PendingGuard) -> Result<ElementOutcome> {
        let set = self.directives.get(id);

        if let (Some(_), Some(cannot)) = (set.can, set.cannot) {
            return Err(self.ctx.error(
                ErrorKind::Conflict,
                &cannot.node.span,
                "`v-can` and `v-cannot` cannot be used on the same element.",
            ));
        }

        if let Some(cannot) = set.cannot {
            self.transform_cannot(cannot, &set, pending)?;
            return Ok(ElementOutcome::Denied);
        }

        if let Some(can) = set.can {
            let path = self.transform_can(can, &set)?;
            return Ok(ElementOutcome::Guarded(path));
        }

        if let Some(path) = self.inherited.get(&id) {
            let path = path.clone();
            self.transform_inherited(id, &set, &path)?;
            return Ok(ElementOutcome::Guarded(path));
        }

        Ok(ElementOutcome::Unguarded)
    }

    fn transform_can(&mut self, can: DirectiveRef<'a>, set: &DirectiveSet<'a>) -> Result<PermissionPath> {
        let directive = can.node;
        if directive.arg.is_some() {
            return Err(self.ctx.error(
                ErrorKind::Conflict,
                &directive.span,
                "`v-can` does not accept arguments.",
            ));
        }
        if !directive.modifiers.is_empty() {
            return Err(self.ctx.error(
                ErrorKind::Conflict,
                &directive.span,
                "`v-can` does not accept modifiers.",
            ));
        }
        if directive.exp.is_none() {
            return Err(self.ctx.error(
                ErrorKind::Grammar,
                &directive.span,
                "`v-can` expects a static expression (for example `v-can=\"can.x.y\"`).",
            ));
        }

        let path = self
            .paths
            .resolve(can.id, directive)
            .map_err(|e| self.ctx.path_error(directive, &e))?;
        let guard = path.guard_call();

        match set.branch() {
            None => self.push(&directive.span, format!("v-if=\"{}\"", guard)),
            Some((kind, branch)) => {
                self.merge_branch(kind, branch, &guard)?;
                self.push(&directive.span, String::new());
            }
        }
        Ok(path)
    }

    fn transform_cannot(
        &mut self,
        cannot: DirectiveRef<'a>,
        set: &DirectiveSet<'a>,
        pending: &PendingGuard,
    ) -> Result<()> {
        let directive = cannot.node;
        if directive.arg.is_some() {
            return Err(self.ctx.error(
                ErrorKind::Conflict,
                &directive.span,
                "`v-cannot` does not accept arguments.",
            ));
        }
        if !directive.modifiers.is_empty() {
            return Err(self.ctx.error(
                ErrorKind::Conflict,
                &directive.span,
                "`v-cannot` does not accept modifiers.",
            ));
        }
        if let Some(kind) = set.branch_kind() {
            return Err(self.ctx.error(
                ErrorKind::Conflict,
                &directive.span,
                format!(
                    "`v-cannot` cannot be combined with `{}`; remove the extra condition.",
                    kind.attribute()
                ),
            ));
        }

        let path = if directive.exp.is_some() {
            self.paths
                .resolve(cannot.id, directive)
                .map_err(|e| self.ctx.path_error(directive, &e))?
        } else {
            match pending.path() {
                Some(path) => path.clone(),
                None => {
                    return Err(self.ctx.error(
                        ErrorKind::Adjacency,
                        &directive.span,
                        "`v-cannot` without an expression must immediately follow its `v-can` element, and there can be only one `v-cannot` per `v-can` block.",
                    ))
                }
            }
        };

        self.push(&directive.span, format!("v-if=\"!({})\"", path.guard_call()));
        Ok(())
    }

    fn transform_inherited(&mut self, id: NodeId, set: &DirectiveSet<'a>, path: &PermissionPath) -> Result<()> {
        match set.branch() {
            Some((kind, branch)) => self.merge_branch(kind, branch, &path.guard_call()),
            None => {
                let span = *self.ast.node(id).span();
                Err(self.ctx.error(
                    ErrorKind::InheritanceScope,
                    &span,
                    "an inherited `v-can` can only apply to `v-if` / `v-else-if` / `v-else` branches.",
                ))
            }
        }
    }

    /// Rewrite a branch directive so its condition also requires `guard`.
    fn merge_branch(&mut self, kind: BranchKind, branch: DirectiveRef<'a>, guard: &str) -> Result<()> {
        let directive = branch.node;
        let text = match kind {
            BranchKind::Start | BranchKind::Continue => {
                let condition = directive
                    .exp
                    .as_ref()
                    .map(|e| e.content.trim())
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| {
                        self.ctx.error(
                            ErrorKind::Grammar,
                            &directive.span,
                            format!(
                                "`{}` needs a static condition to merge with `v-can`.",
                                kind.attribute()
                            ),
                        )
                    })?;
                if !is_valid_condition(condition) {
                    return Err(self.ctx.error(
                        ErrorKind::Grammar,
                        &directive.span,
                        format!(
                            "`{}` condition `{}` is not a valid expression and cannot be merged with `v-can`.",
                            kind.attribute(),
                            condition
                        ),
                    ));
                }
                format!(
                    "{}=\"({}) && {}\"",
                    kind.attribute(),
                    escape_for_double_quotes(condition),
                    guard
                )
            }
            // no condition slot: upgrade to `v-else-if` guarded by the permission alone
            BranchKind::Fallback => format!("{}=\"{}\"", BranchKind::Continue.attribute(), guard),
        };
        self.push(&directive.span, text);
        Ok(())
    }
}

impl<'a, 'r> TemplateVisitor<'a> for PatchCollector<'a, 'r> {
    fn ast(&self) -> &'a TemplateAst {
        self.ast
    }

    fn visit_children(&mut self, children: &'a [NodeId]) -> Result<()> {
        let mut pending = PendingGuard::default();
        for id in children {
            let event = match self.ast.node(*id) {
                TemplateNode::Text(text) if text.is_blank() => SiblingEvent::BlankText,
                TemplateNode::Text(_) | TemplateNode::Interpolation(_) => SiblingEvent::Content,
                TemplateNode::Comment(_) => SiblingEvent::Comment,
                TemplateNode::Element(_) => {
                    let outcome = self.handle_element(*id, &pending)?;
                    self.visit_element(*id)?;
                    SiblingEvent::Element(outcome)
                }
            };
            pending = pending.step(event);
        }
        Ok(())
    }
}

/// Link chains, then collect every patch for the template.
///
/// Offsets in the returned patches are `ctx.base()` plus the template-relative
/// span offsets, i.e. absolute offsets into the whole component source.
pub fn collect_patches(ast: &TemplateAst, ctx: &ErrorContext) -> Result<Vec<Patch>> {
    let mut directives = DirectiveCache::new(ast);
    let mut paths = PathCache::new();
    let inherited = link_chains(ast, &mut directives, &mut paths, ctx)?;

    let mut collector = PatchCollector::new(ast, &mut directives, &mut paths, &inherited, ctx);
    collector.visit_root()?;
    let patches = collector.into_patches();
    trace!(
        elements = directives.cached(),
        paths = paths.resolved(),
        inherited = inherited.len(),
        "collected patches"
    );
    Ok(patches)
}
