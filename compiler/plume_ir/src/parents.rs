//! Parent pointers for one tree snapshot.
//!
//! Arena nodes only point down. Hoisting and name resolution need to walk
//! up from a node to its enclosing statement, lambda or member, so passes
//! build a `ParentMap` over the tree they read.

use crate::visitor::{children, member_roots, type_decl_roots, NodeRef};
use crate::SyntaxTree;

/// What owns a node.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Parent {
    /// Unreachable from the unit's declarations.
    None,
    Node(NodeRef),
    /// Root of a member body or initializer: indices into `unit.types` and
    /// that type's `members`.
    Member { ty: usize, member: usize },
    /// Root of a type header (primary-parameter defaults, base-call args).
    TypeHeader(usize),
}

/// Parent of every reachable expression, statement and pattern.
pub struct ParentMap {
    exprs: Vec<Parent>,
    stmts: Vec<Parent>,
    patterns: Vec<Parent>,
}

impl ParentMap {
    pub fn build(tree: &SyntaxTree) -> Self {
        let mut map = ParentMap {
            exprs: vec![Parent::None; tree.expr_count()],
            stmts: vec![Parent::None; tree.stmt_count()],
            patterns: vec![Parent::None; tree.pattern_count()],
        };
        let mut work: Vec<NodeRef> = Vec::new();
        for (ty, decl) in tree.unit.types.iter().enumerate() {
            for root in type_decl_roots(tree, decl) {
                map.set(root, Parent::TypeHeader(ty));
                work.push(root);
            }
            for (member, m) in decl.members.iter().enumerate() {
                for root in member_roots(tree, m) {
                    map.set(root, Parent::Member { ty, member });
                    work.push(root);
                }
            }
        }
        while let Some(node) = work.pop() {
            for child in children(tree, node) {
                map.set(child, Parent::Node(node));
                work.push(child);
            }
        }
        map
    }

    fn set(&mut self, node: NodeRef, parent: Parent) {
        let slot = match node {
            NodeRef::Expr(id) => self.exprs.get_mut(id.index()),
            NodeRef::Stmt(id) => self.stmts.get_mut(id.index()),
            NodeRef::Pattern(id) => self.patterns.get_mut(id.index()),
        };
        if let Some(slot) = slot {
            *slot = parent;
        }
    }

    pub fn parent(&self, node: NodeRef) -> Parent {
        let slot = match node {
            NodeRef::Expr(id) => self.exprs.get(id.index()),
            NodeRef::Stmt(id) => self.stmts.get(id.index()),
            NodeRef::Pattern(id) => self.patterns.get(id.index()),
        };
        slot.copied().unwrap_or(Parent::None)
    }

    /// Node ancestors from the direct parent upward, ending before the
    /// owning member or type header.
    pub fn ancestors(&self, node: NodeRef) -> Ancestors<'_> {
        Ancestors {
            map: self,
            current: node,
        }
    }

    /// Owning member of a node, as `(type index, member index)`.
    pub fn enclosing_member(&self, node: NodeRef) -> Option<(usize, usize)> {
        let mut current = node;
        loop {
            match self.parent(current) {
                Parent::Node(parent) => current = parent,
                Parent::Member { ty, member } => return Some((ty, member)),
                Parent::TypeHeader(_) | Parent::None => return None,
            }
        }
    }

    /// Root-level owner of a node.
    pub fn root_owner(&self, node: NodeRef) -> Parent {
        let mut current = node;
        loop {
            match self.parent(current) {
                Parent::Node(parent) => current = parent,
                other => return other,
            }
        }
    }
}

/// Iterator over node ancestors.
pub struct Ancestors<'a> {
    map: &'a ParentMap,
    current: NodeRef,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeRef;

    fn next(&mut self) -> Option<NodeRef> {
        match self.map.parent(self.current) {
            Parent::Node(parent) => {
                self.current = parent;
                Some(parent)
            }
            _ => None,
        }
    }
}
