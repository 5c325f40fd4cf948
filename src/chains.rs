//! Chain linking: `v-if` / `v-else-if` / `v-else` runs share one permission.
//!
//! When any member of a chain carries `v-can`, every member must either carry
//! the same path or inherit it. This pass runs over the whole tree before any
//! patch is generated, so the patch generator knows about inherited guards
//! when it reaches a member without its own `v-can`.

use std::collections::HashMap;
use tracing::trace;

use crate::directives::{BranchKind, DirectiveCache};
use crate::ir::{NodeId, TemplateAst, TemplateNode};
use crate::permission::{PathCache, PermissionPath};
use crate::validate::{ErrorContext, ErrorKind, Result};
use crate::visitor::{walk_children, TemplateVisitor};

/// Paths inherited by chain members without their own `v-can`.
pub type InheritanceMap = HashMap<NodeId, PermissionPath>;

/// Group a sibling list into maximal `v-if` runs.
///
/// Blank text and comments between members are transparent; any other node
/// ends the run, as does a `v-else`. Every returned chain starts with its
/// `v-if` element; single-element chains are included.
pub fn collect_chains(
    ast: &TemplateAst,
    directives: &mut DirectiveCache<'_>,
    siblings: &[NodeId],
) -> Vec<Vec<NodeId>> {
    let mut chains = Vec::new();
    let mut i = 0;
    while i < siblings.len() {
        let id = siblings[i];
        if ast.element(id).is_none() || directives.get(id).if_.is_none() {
            i += 1;
            continue;
        }

        let mut chain = vec![id];
        let mut next = i + 1;
        let mut consumed = next;
        while next < siblings.len() {
            let candidate = siblings[next];
            match ast.node(candidate) {
                TemplateNode::Text(text) if text.is_blank() => next += 1,
                TemplateNode::Comment(_) => next += 1,
                TemplateNode::Element(_) => {
                    let set = directives.get(candidate);
                    if !set.continues_chain() {
                        break;
                    }
                    chain.push(candidate);
                    next += 1;
                    consumed = next;
                    if set.branch_kind() == Some(BranchKind::Fallback) {
                        break;
                    }
                }
                _ => break,
            }
        }

        chains.push(chain);
        i = consumed;
    }
    chains
}

pub struct ChainLinker<'a, 'r> {
    ast: &'a TemplateAst,
    directives: &'r mut DirectiveCache<'a>,
    paths: &'r mut PathCache,
    ctx: &'r ErrorContext,
    inherited: InheritanceMap,
}

impl<'a, 'r> ChainLinker<'a, 'r> {
    pub fn new(
        ast: &'a TemplateAst,
        directives: &'r mut DirectiveCache<'a>,
        paths: &'r mut PathCache,
        ctx: &'r ErrorContext,
    ) -> Self {
        ChainLinker {
            ast,
            directives,
            paths,
            ctx,
            inherited: InheritanceMap::new(),
        }
    }

    pub fn into_inherited(self) -> InheritanceMap {
        self.inherited
    }

    /// Link every chain in one sibling list (children are not visited).
    pub fn link_siblings(&mut self, siblings: &[NodeId]) -> Result<()> {
        for chain in collect_chains(self.ast, self.directives, siblings) {
            self.link_chain(&chain)?;
        }
        Ok(())
    }

    fn link_chain(&mut self, chain: &[NodeId]) -> Result<()> {
        if chain.len() < 2 {
            return Ok(());
        }

        let Some(reference) = chain.iter().find_map(|id| self.directives.get(*id).can) else {
            return Ok(());
        };
        let path = self
            .paths
            .resolve(reference.id, reference.node)
            .map_err(|e| self.ctx.path_error(reference.node, &e))?;

        for member in chain {
            match self.directives.get(*member).can {
                Some(can) if can.id == reference.id => {}
                Some(can) => {
                    let own = self
                        .paths
                        .resolve(can.id, can.node)
                        .map_err(|e| self.ctx.path_error(can.node, &e))?;
                    if own != path {
                        return Err(self.ctx.error(
                            ErrorKind::ChainConsistency,
                            &can.node.span,
                            format!(
                                "`v-can` expressions must match across every branch of a `v-if` / `v-else-if` / `v-else` chain (expected `{}`, found `{}`).",
                                path, own
                            ),
                        ));
                    }
                }
                None => {
                    self.inherited.insert(*member, path.clone());
                }
            }
        }

        trace!(members = chain.len(), path = %path, "linked v-can chain");
        Ok(())
    }
}

impl<'a, 'r> TemplateVisitor<'a> for ChainLinker<'a, 'r> {
    fn ast(&self) -> &'a TemplateAst {
        self.ast
    }

    fn visit_children(&mut self, children: &'a [NodeId]) -> Result<()> {
        self.link_siblings(children)?;
        walk_children(self, children)
    }
}

/// Link chains across the whole tree and return the inherited paths.
pub fn link_chains<'a>(
    ast: &'a TemplateAst,
    directives: &mut DirectiveCache<'a>,
    paths: &mut PathCache,
    ctx: &ErrorContext,
) -> Result<InheritanceMap> {
    let mut linker = ChainLinker::new(ast, directives, paths, ctx);
    linker.visit_root()?;
    Ok(linker.into_inherited())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_template;

    fn link(src: &str) -> Result<(TemplateAst, Vec<(String, String)>)> {
        let ast = parse_template(src).unwrap();
        let ctx = ErrorContext::for_template(src);
        let inherited = {
            let mut directives = DirectiveCache::new(&ast);
            let mut paths = PathCache::new();
            link_chains(&ast, &mut directives, &mut paths, &ctx)?
        };
        let mut tags: Vec<(String, String)> = inherited
            .iter()
            .map(|(id, path)| (ast.element(*id).unwrap().tag.clone(), path.to_string()))
            .collect();
        tags.sort();
        Ok((ast, tags))
    }

    fn chain_tags(src: &str) -> Vec<Vec<String>> {
        let ast = parse_template(src).unwrap();
        let mut directives = DirectiveCache::new(&ast);
        collect_chains(&ast, &mut directives, &ast.roots)
            .into_iter()
            .map(|chain| {
                chain
                    .into_iter()
                    .map(|id| ast.element(id).unwrap().tag.clone())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_collects_runs_across_blank_text_and_comments() {
        let chains = chain_tags(
            "<a v-if=\"x\"></a>\n  <!-- c -->\n  <b v-else-if=\"y\"></b>\n<c v-else></c><d v-else></d>",
        );
        assert_eq!(chains, vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_text_breaks_a_run() {
        let chains = chain_tags("<a v-if=\"x\"></a> text <b v-else></b><c v-if=\"z\"></c>");
        assert_eq!(chains, vec![vec!["a"], vec!["c"]]);
    }

    #[test]
    fn test_new_if_starts_a_new_chain() {
        let chains = chain_tags("<a v-if=\"x\"></a><b v-if=\"y\"></b><c v-else></c>");
        assert_eq!(chains, vec![vec!["a"], vec!["b", "c"]]);
    }

    #[test]
    fn test_members_without_guard_inherit_reference_path() {
        let (_, inherited) = link(
            r#"<a v-if="ready" v-can="can.employee.view"></a><b v-else-if="later"></b><c v-else></c>"#,
        )
        .unwrap();
        assert_eq!(
            inherited,
            vec![
                ("b".to_string(), "can.employee.view".to_string()),
                ("c".to_string(), "can.employee.view".to_string()),
            ]
        );
    }

    #[test]
    fn test_guard_on_a_later_member_is_propagated_backwards() {
        let (_, inherited) =
            link(r#"<a v-if="ready"></a><b v-else v-can="can.employee.view"></b>"#).unwrap();
        assert_eq!(inherited, vec![("a".to_string(), "can.employee.view".to_string())]);
    }

    #[test]
    fn test_matching_guards_on_every_branch_are_accepted() {
        let (_, inherited) =
            link(r#"<a v-if="ready" v-can="can.a.b"></a><b v-else v-can="$can.a.b"></b>"#).unwrap();
        assert!(inherited.is_empty());
    }

    #[test]
    fn test_divergent_paths_fail() {
        let err = link(r#"<a v-if="ready" v-can="can.a.b"></a><b v-else v-can="can.c.d"></b>"#)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ChainConsistency);
        assert!(err.message.contains("must match across every branch"));
    }

    #[test]
    fn test_chains_without_guards_or_single_members_are_skipped() {
        let (_, inherited) = link(r#"<a v-if="x"></a><b v-else></b><c v-if="y" v-can="can.a.b"></c>"#).unwrap();
        assert!(inherited.is_empty());
    }

    #[test]
    fn test_nested_lists_are_linked() {
        let (_, inherited) =
            link(r#"<div><a v-if="x" v-can="can.a.b"></a><b v-else></b></div>"#).unwrap();
        assert_eq!(inherited, vec![("b".to_string(), "can.a.b".to_string())]);
    }

    #[test]
    fn test_bad_reference_expression_is_a_grammar_error() {
        let err = link(r#"<a v-if="x" v-can="perm.a.b"></a><b v-else></b>"#).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Grammar);
    }
}
