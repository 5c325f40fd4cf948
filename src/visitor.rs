use crate::ir::{NodeId, TemplateAst, TemplateNode};
use crate::validate::Result;

/// The TemplateVisitor trait defines the single traversal mechanism for the
/// markup tree.
///
/// Rules:
/// 1. Traversal is depth-first, pre-order; siblings are visited in source order.
/// 2. Implementers override `visit_*` methods to add behavior.
/// 3. Implementers MUST call the `walk_*` functions to continue traversal.
/// 4. The first error aborts the whole traversal.
pub trait TemplateVisitor<'a> {
    fn ast(&self) -> &'a TemplateAst;

    fn visit_root(&mut self) -> Result<()> {
        let ast = self.ast();
        self.visit_children(&ast.roots)
    }

    /// One sibling list. Per-list state (chains, pending guards) lives here.
    fn visit_children(&mut self, children: &'a [NodeId]) -> Result<()> {
        walk_children(self, children)
    }

    fn visit_node(&mut self, id: NodeId) -> Result<()> {
        walk_node(self, id)
    }

    fn visit_element(&mut self, id: NodeId) -> Result<()> {
        walk_element(self, id)
    }
}

pub fn walk_children<'a, V: TemplateVisitor<'a> + ?Sized>(
    visitor: &mut V,
    children: &'a [NodeId],
) -> Result<()> {
    for id in children {
        visitor.visit_node(*id)?;
    }
    Ok(())
}

pub fn walk_node<'a, V: TemplateVisitor<'a> + ?Sized>(visitor: &mut V, id: NodeId) -> Result<()> {
    match visitor.ast().node(id) {
        TemplateNode::Element(_) => visitor.visit_element(id),
        // Leaf nodes, nothing to walk
        TemplateNode::Text(_) | TemplateNode::Comment(_) | TemplateNode::Interpolation(_) => Ok(()),
    }
}

pub fn walk_element<'a, V: TemplateVisitor<'a> + ?Sized>(visitor: &mut V, id: NodeId) -> Result<()> {
    let ast = visitor.ast();
    visitor.visit_children(ast.children(id))
}
