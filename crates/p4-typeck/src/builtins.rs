//! Built-in operator signatures.
//!
//! The potential-type pass asks, for every operand type pair, whether
//! a built-in operator is defined on it and what it yields. Unsized
//! integer literals combine with any `bit<N>`/`int<N>` operand and
//! take its width.

use p4_parser::ast::{BinOp, UnOp};

use crate::types::{TypeId, TypeKind, TypeTable};

fn is_numeric(table: &TypeTable, t: TypeId) -> bool {
    matches!(table.kind(t), TypeKind::Int { .. } | TypeKind::Bit { .. })
}

/// The common type of a numeric operand pair, if the pair is legal:
/// equal fixed-width types, or an unsized `int` adapting to the other
/// side's width.
fn numeric_join(table: &TypeTable, l: TypeId, r: TypeId) -> Option<TypeId> {
    use TypeKind::*;
    match (table.kind(l), table.kind(r)) {
        (Int { width: None }, _) if is_numeric(table, r) => Some(r),
        (_, Int { width: None }) if is_numeric(table, l) => Some(l),
        (Bit { width: a }, Bit { width: b }) if a == b => Some(l),
        (Int { width: a }, Int { width: b }) if a == b => Some(l),
        _ => None,
    }
}

/// Result type of `l op r`, if the operator is defined on the pair.
pub fn binary_result(table: &mut TypeTable, op: BinOp, lhs: TypeId, rhs: TypeId) -> Option<TypeId> {
    let l = table.effective(lhs);
    let r = table.effective(rhs);
    use BinOp::*;
    match op {
        And | Or => {
            let bool_ = table.prims.bool_;
            (table.equiv(l, bool_) && table.equiv(r, bool_)).then_some(bool_)
        }
        Eq | NotEq => {
            let comparable =
                table.equiv(l, r) || numeric_join(table, l, r).is_some();
            comparable.then_some(table.prims.bool_)
        }
        Less | Great | LessEq | GreatEq => {
            numeric_join(table, l, r).map(|_| table.prims.bool_)
        }
        Add | Sub | Mul | Div | BitAnd | BitOr | BitXor | Mask => numeric_join(table, l, r),
        Shl | Shr => {
            (is_numeric(table, l) && is_numeric(table, r)).then_some(l)
        }
    }
}

/// Result type of a unary operator application, if defined.
pub fn unary_result(table: &TypeTable, op: UnOp, operand: TypeId) -> Option<TypeId> {
    let t = table.effective(operand);
    match op {
        UnOp::Not => matches!(table.kind(t), TypeKind::Bool).then_some(t),
        UnOp::BitNot | UnOp::Neg => is_numeric(table, t).then_some(t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_bit_widths_combine() {
        let mut table = TypeTable::new();
        let b8 = table.bit(8);
        let result = binary_result(&mut table, BinOp::Add, b8, b8).unwrap();
        assert!(table.equiv(result, b8));
    }

    #[test]
    fn mismatched_bit_widths_do_not_combine() {
        let mut table = TypeTable::new();
        let b8 = table.bit(8);
        let b16 = table.bit(16);
        assert!(binary_result(&mut table, BinOp::Add, b8, b16).is_none());
    }

    #[test]
    fn unsized_int_adapts_to_bit_operand() {
        let mut table = TypeTable::new();
        let b8 = table.bit(8);
        let int = table.prims.int;
        let result = binary_result(&mut table, BinOp::Add, int, b8).unwrap();
        assert!(table.equiv(result, b8));
    }

    #[test]
    fn comparison_yields_bool() {
        let mut table = TypeTable::new();
        let b8 = table.bit(8);
        let result = binary_result(&mut table, BinOp::Less, b8, b8).unwrap();
        assert!(table.equiv(result, table.prims.bool_));
    }

    #[test]
    fn logical_ops_require_bool() {
        let mut table = TypeTable::new();
        let b8 = table.bit(8);
        let bool_ = table.prims.bool_;
        assert!(binary_result(&mut table, BinOp::And, bool_, bool_).is_some());
        assert!(binary_result(&mut table, BinOp::And, b8, bool_).is_none());
    }

    #[test]
    fn negation_is_numeric_only() {
        let mut table = TypeTable::new();
        let b8 = table.bit(8);
        assert!(unary_result(&table, UnOp::Neg, b8).is_some());
        assert!(unary_result(&table, UnOp::Neg, table.prims.string).is_none());
        assert!(unary_result(&table, UnOp::Not, table.prims.bool_).is_some());
    }
}
