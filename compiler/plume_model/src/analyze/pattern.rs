//! Pattern binding: designations declare locals typed from the subject.

use plume_ir::ast::{PatternKind, PatternOp};
use plume_ir::stack::ensure_sufficient_stack;
use plume_ir::{Name, NodeRef, PatternId, SymbolKind, TypeId};

use super::Analyzer;

impl Analyzer<'_> {
    /// Analyze `id` matched against a value of type `subject`.
    pub(super) fn pattern(&mut self, id: PatternId, subject: TypeId) {
        if !id.is_valid() {
            return;
        }
        ensure_sufficient_stack(|| self.pattern_inner(id, subject));
    }

    fn pattern_inner(&mut self, id: PatternId, subject: TypeId) {
        let tree = self.tree;
        match tree.pattern_kind(id) {
            PatternKind::Constant(value) | PatternKind::Relational { value, .. } => {
                self.expr(value, subject);
            }
            PatternKind::Declaration { ty, name } => {
                let declared = self.bind_or(ty, subject);
                self.designate(id, name, declared);
            }
            PatternKind::Var(name) => self.designate(id, name, subject),
            PatternKind::Recursive {
                ty,
                positional,
                properties,
                designation,
            } => {
                let matched = if ty.is_valid() {
                    self.table.bound(ty)
                } else {
                    subject
                };
                let components = self.tuple_elements(matched, positional.len());
                for (i, &sub) in tree.patterns(positional).iter().enumerate() {
                    self.pattern(sub, components[i]);
                }
                for prop in tree.prop_pats(properties) {
                    let mut member_ty = matched;
                    for &segment in &prop.path {
                        member_ty = self
                            .table
                            .find_member(member_ty, segment)
                            .map_or(TypeId::UNKNOWN, |m| m.ty);
                    }
                    self.pattern(prop.pattern, member_ty);
                }
                self.designate(id, designation, matched);
            }
            PatternKind::List {
                elements,
                designation,
            } => {
                let element = self.table.element_of(subject);
                for &sub in tree.patterns(elements) {
                    if let PatternKind::Slice(_) = tree.pattern_kind(sub) {
                        self.pattern(sub, subject);
                    } else {
                        self.pattern(sub, element);
                    }
                }
                self.designate(id, designation, subject);
            }
            PatternKind::Slice(inner) | PatternKind::Not(inner) | PatternKind::Parenthesized(inner) => {
                self.pattern(inner, subject);
            }
            PatternKind::Binary { op, left, right } => {
                self.pattern(left, subject);
                let narrowed = if op == PatternOp::And {
                    self.narrowed(left, subject)
                } else {
                    subject
                };
                self.pattern(right, narrowed);
            }
            PatternKind::Type(_) | PatternKind::Discard => {}
        }
    }

    fn designate(&mut self, id: PatternId, name: Name, ty: TypeId) {
        if name.is_empty() || self.tree.name_str(name) == "_" {
            return;
        }
        let symbol = self.declare(name, SymbolKind::Local, ty);
        self.facts.declared.insert(NodeRef::Pattern(id), symbol);
    }

    /// Subject type after `id` matched.
    fn narrowed(&self, id: PatternId, subject: TypeId) -> TypeId {
        let tree = self.tree;
        match tree.pattern_kind(id) {
            PatternKind::Declaration { ty, .. } | PatternKind::Type(ty) => {
                self.bind_or(ty, subject)
            }
            PatternKind::Recursive { ty, .. } if ty.is_valid() => self.table.bound(ty),
            PatternKind::Parenthesized(inner) => self.narrowed(inner, subject),
            PatternKind::Binary {
                op: PatternOp::And,
                left,
                right,
            } => {
                let left = self.narrowed(left, subject);
                self.narrowed(right, left)
            }
            _ => subject,
        }
    }
}
