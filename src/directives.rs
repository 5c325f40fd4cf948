//! Directive extraction: which guard and branch directives an element carries.

use std::collections::HashMap;

use crate::ir::{DirectiveId, DirectiveNode, NodeId, TemplateAst};

pub const CAN: &str = "can";
pub const CANNOT: &str = "cannot";
pub const IF: &str = "if";
pub const ELSE_IF: &str = "else-if";
pub const ELSE: &str = "else";

/// Kind of conditional branch an element takes part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchKind {
    /// `v-if`
    Start,
    /// `v-else-if`
    Continue,
    /// `v-else`
    Fallback,
}

impl BranchKind {
    /// Attribute name a rewritten branch of this kind is emitted with.
    pub fn attribute(self) -> &'static str {
        match self {
            BranchKind::Start => "v-if",
            BranchKind::Continue => "v-else-if",
            BranchKind::Fallback => "v-else",
        }
    }
}

/// A directive together with its identity in the tree.
#[derive(Debug, Clone, Copy)]
pub struct DirectiveRef<'a> {
    pub id: DirectiveId,
    pub node: &'a DirectiveNode,
}

/// Guard and branch directives present on one element.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectiveSet<'a> {
    pub can: Option<DirectiveRef<'a>>,
    pub cannot: Option<DirectiveRef<'a>>,
    pub if_: Option<DirectiveRef<'a>>,
    pub else_if: Option<DirectiveRef<'a>>,
    pub else_: Option<DirectiveRef<'a>>,
}

impl<'a> DirectiveSet<'a> {
    /// The element's conditional directive, if any.
    pub fn branch(&self) -> Option<(BranchKind, DirectiveRef<'a>)> {
        self.if_
            .map(|d| (BranchKind::Start, d))
            .or_else(|| self.else_if.map(|d| (BranchKind::Continue, d)))
            .or_else(|| self.else_.map(|d| (BranchKind::Fallback, d)))
    }

    pub fn branch_kind(&self) -> Option<BranchKind> {
        self.branch().map(|(kind, _)| kind)
    }

    /// `v-else-if` or `v-else`: may extend a chain started by a `v-if`.
    pub fn continues_chain(&self) -> bool {
        self.if_.is_none() && (self.else_if.is_some() || self.else_.is_some())
    }
}

/// Scan an element's directives once and classify them.
pub fn extract_directives(ast: &TemplateAst, element: NodeId) -> DirectiveSet<'_> {
    let mut set = DirectiveSet::default();
    let Some(el) = ast.element(element) else {
        return set;
    };
    for (index, node) in el.directives.iter().enumerate() {
        let found = DirectiveRef {
            id: DirectiveId { element, index },
            node,
        };
        let slot = match node.name.as_str() {
            CAN => &mut set.can,
            CANNOT => &mut set.cannot,
            IF => &mut set.if_,
            ELSE_IF => &mut set.else_if,
            ELSE => &mut set.else_,
            _ => continue,
        };
        slot.get_or_insert(found);
    }
    set
}

/// Directive sets memoized per element for one transform run.
#[derive(Debug)]
pub struct DirectiveCache<'a> {
    ast: &'a TemplateAst,
    sets: HashMap<NodeId, DirectiveSet<'a>>,
}

impl<'a> DirectiveCache<'a> {
    pub fn new(ast: &'a TemplateAst) -> Self {
        DirectiveCache {
            ast,
            sets: HashMap::new(),
        }
    }

    pub fn get(&mut self, element: NodeId) -> DirectiveSet<'a> {
        let ast = self.ast;
        *self
            .sets
            .entry(element)
            .or_insert_with(|| extract_directives(ast, element))
    }

    pub fn cached(&self) -> usize {
        self.sets.len()
    }
}
