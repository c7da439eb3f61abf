//! Abstract syntax tree and the type-inference rules attached to its
//! construction (`add_type`, pointer-arithmetic scaling, and constant
//! folding).
//!
//! Nodes are arena-allocated (`&'a Node<'a>`) rather than owned (`Box`),
//! matching how this codebase represents other self-referential trees: a
//! stable reference that multiple other nodes and the owning function
//! [`crate::scope::Ident`] can all hold without reference counting.

use crate::error::{CompileError, Result};
use crate::intern::Symbol;
use crate::span::Span;
use crate::types::{is_integer_type, Primitives, Type, TypeKind};
use std::cell::{Cell, RefCell};

#[derive(Debug)]
pub enum NodeKind<'a> {
    Num(i64),
    Var(Symbol),
    FuncCall {
        callee: Symbol,
        args: Vec<&'a Node<'a>>,
    },
    Member {
        base: &'a Node<'a>,
        offset: i64,
    },
    Deref(&'a Node<'a>),
    Addr(&'a Node<'a>),
    Not(&'a Node<'a>),
    BitNot(&'a Node<'a>),
    Cast(&'a Node<'a>),
    Add(&'a Node<'a>, &'a Node<'a>),
    Sub(&'a Node<'a>, &'a Node<'a>),
    Mul(&'a Node<'a>, &'a Node<'a>),
    Div(&'a Node<'a>, &'a Node<'a>),
    Mod(&'a Node<'a>, &'a Node<'a>),
    BitAnd(&'a Node<'a>, &'a Node<'a>),
    BitOr(&'a Node<'a>, &'a Node<'a>),
    BitXor(&'a Node<'a>, &'a Node<'a>),
    Shl(&'a Node<'a>, &'a Node<'a>),
    Shr(&'a Node<'a>, &'a Node<'a>),
    Eq(&'a Node<'a>, &'a Node<'a>),
    NotEq(&'a Node<'a>, &'a Node<'a>),
    Lt(&'a Node<'a>, &'a Node<'a>),
    Le(&'a Node<'a>, &'a Node<'a>),
    LogicAnd(&'a Node<'a>, &'a Node<'a>),
    LogicOr(&'a Node<'a>, &'a Node<'a>),
    Assign {
        lhs: &'a Node<'a>,
        rhs: &'a Node<'a>,
    },
    Comma(&'a Node<'a>, &'a Node<'a>),
    CondExpr {
        cond: &'a Node<'a>,
        then: &'a Node<'a>,
        els: &'a Node<'a>,
    },
    Return(Option<&'a Node<'a>>),
    If {
        cond: &'a Node<'a>,
        then: &'a Node<'a>,
    },
    IfElse {
        cond: &'a Node<'a>,
        then: &'a Node<'a>,
        els: &'a Node<'a>,
    },
    While {
        cond: &'a Node<'a>,
        body: &'a Node<'a>,
    },
    DoWhile {
        cond: &'a Node<'a>,
        body: &'a Node<'a>,
    },
    For {
        init: Option<&'a Node<'a>>,
        cond: Option<&'a Node<'a>>,
        incr: Option<&'a Node<'a>>,
        body: &'a Node<'a>,
    },
    Switch {
        cond: &'a Node<'a>,
        body: &'a Node<'a>,
        cases: RefCell<Vec<&'a Node<'a>>>,
        default_case: Cell<Option<&'a Node<'a>>>,
    },
    Case {
        value: i64,
        body: &'a Node<'a>,
    },
    Default {
        body: &'a Node<'a>,
    },
    Block(Vec<&'a Node<'a>>),
    Break,
    Continue,
    Goto(Symbol),
    Label {
        name: Symbol,
        stmt: &'a Node<'a>,
    },
    /// Expression-statement with no effect (bare `;`). Also what
    /// `__builtin_va_end` lowers to, since ending a va_list has no
    /// observable effect in this calling convention.
    NoOp,
}

#[derive(Debug)]
pub struct Node<'a> {
    pub kind: NodeKind<'a>,
    pub ty: Option<Type>,
    pub pos: Span,
}

impl<'a> Node<'a> {
    pub fn new(kind: NodeKind<'a>, ty: Option<Type>, pos: Span) -> Self {
        Node { kind, ty, pos }
    }

    pub fn ty(&self) -> Option<&Type> {
        self.ty.as_ref()
    }
}

fn void_operand_error(pos: Span) -> CompileError {
    CompileError::type_error("invalid operands of type 'void' to binary operator", pos)
}

/// True for pointer and array types alike: both carry a pointee/element
/// `base` and decay to an address for pointer-arithmetic purposes, the way
/// the original dispatches on a type's `ptr_to` field rather than its kind.
fn is_pointer_like(ty: &Type) -> bool {
    ty.base().is_some()
}

/// Pointer arithmetic scaling for `+`/`-`: the integer operand is
/// multiplied by the pointee size, matching the original's
/// `new_node_mul(rhs, new_node_num(lhs->ty->ptr_to->size))`. Returns the
/// scaled integer subtree; `other` must not itself be pointer-like.
fn scale_pointer_operand<'a>(
    arena: &'a crate::arena::Arena<Node<'a>>,
    ptr: &Type,
    other: &Type,
    other_node: &'a Node<'a>,
    pos: Span,
) -> Result<&'a Node<'a>> {
    if is_pointer_like(other) {
        return Err(CompileError::type_error("invalid pointer arithmetic", pos));
    }
    let elem_size = ptr.base().map(|b| b.size()).unwrap_or(1);
    let size_node = arena.alloc(Node::new(NodeKind::Num(elem_size), Some(other.clone()), pos));
    Ok(arena.alloc(Node::new(NodeKind::Mul(other_node, size_node), Some(other.clone()), pos)))
}

/// `a + b`: scales an integer operand against a pointer's (or array's)
/// pointee size, otherwise inherits the left operand's type.
pub fn new_add<'a>(
    arena: &'a crate::arena::Arena<Node<'a>>,
    lhs: &'a Node<'a>,
    rhs: &'a Node<'a>,
    pos: Span,
) -> Result<&'a Node<'a>> {
    let lt = lhs.ty().ok_or_else(|| CompileError::internal("untyped operand", pos))?;
    let rt = rhs.ty().ok_or_else(|| CompileError::internal("untyped operand", pos))?;
    if lt.kind() == TypeKind::Void || rt.kind() == TypeKind::Void {
        return Err(void_operand_error(pos));
    }
    match (is_pointer_like(lt), is_pointer_like(rt)) {
        (true, true) => Err(CompileError::type_error("pointer + pointer is invalid", pos)),
        (true, false) => {
            let lt = lt.clone();
            let scaled_rhs = scale_pointer_operand(arena, &lt, rt, rhs, pos)?;
            Ok(arena.alloc(Node::new(NodeKind::Add(lhs, scaled_rhs), Some(lt), pos)))
        }
        (false, true) => {
            let rt = rt.clone();
            let scaled_lhs = scale_pointer_operand(arena, &rt, lt, lhs, pos)?;
            Ok(arena.alloc(Node::new(NodeKind::Add(scaled_lhs, rhs), Some(rt), pos)))
        }
        (false, false) => {
            let ty = lt.clone();
            Ok(arena.alloc(Node::new(NodeKind::Add(lhs, rhs), Some(ty), pos)))
        }
    }
}

/// `a - b`: `pointer - integer` scales the integer like addition;
/// `pointer - pointer` and `integer - pointer` are not supported.
pub fn new_sub<'a>(
    arena: &'a crate::arena::Arena<Node<'a>>,
    lhs: &'a Node<'a>,
    rhs: &'a Node<'a>,
    pos: Span,
) -> Result<&'a Node<'a>> {
    let lt = lhs.ty().ok_or_else(|| CompileError::internal("untyped operand", pos))?;
    let rt = rhs.ty().ok_or_else(|| CompileError::internal("untyped operand", pos))?;
    if lt.kind() == TypeKind::Void || rt.kind() == TypeKind::Void {
        return Err(void_operand_error(pos));
    }
    match (is_pointer_like(lt), is_pointer_like(rt)) {
        (true, true) => Err(CompileError::type_error("pointer - pointer is not supported", pos)),
        (false, true) => Err(CompileError::type_error("invalid pointer arithmetic", pos)),
        (true, false) => {
            let lt = lt.clone();
            let scaled_rhs = scale_pointer_operand(arena, &lt, rt, rhs, pos)?;
            Ok(arena.alloc(Node::new(NodeKind::Sub(lhs, scaled_rhs), Some(lt), pos)))
        }
        (false, false) => {
            let ty = lt.clone();
            Ok(arena.alloc(Node::new(NodeKind::Sub(lhs, rhs), Some(ty), pos)))
        }
    }
}

/// `sizeof T`: static size for a scalar, `array_len * element_size` for an array.
pub fn sizeof_type(ty: &Type) -> i64 {
    if ty.kind() == TypeKind::Array {
        ty.array_len() * ty.base().map(|b| b.size()).unwrap_or(ty.size())
    } else {
        ty.size()
    }
}

/// Folds a constant subtree (numeric literals under arithmetic, bitwise,
/// logical, comparison, shift, and conditional nodes) to a 64-bit
/// two's-complement value. Any non-constant subexpression is an error.
pub fn fold_const(node: &Node, pos: Span) -> Result<i64> {
    let err = || CompileError::type_error("constant expression required", pos);
    match &node.kind {
        NodeKind::Num(v) => Ok(*v),
        NodeKind::Add(l, r) => Ok(fold_const(l, pos)?.wrapping_add(fold_const(r, pos)?)),
        NodeKind::Sub(l, r) => Ok(fold_const(l, pos)?.wrapping_sub(fold_const(r, pos)?)),
        NodeKind::Mul(l, r) => Ok(fold_const(l, pos)?.wrapping_mul(fold_const(r, pos)?)),
        NodeKind::Div(l, r) => {
            let rhs = fold_const(r, pos)?;
            if rhs == 0 {
                return Err(CompileError::type_error("division by zero in constant expression", pos));
            }
            Ok(fold_const(l, pos)?.wrapping_div(rhs))
        }
        NodeKind::Mod(l, r) => {
            let rhs = fold_const(r, pos)?;
            if rhs == 0 {
                return Err(CompileError::type_error("division by zero in constant expression", pos));
            }
            Ok(fold_const(l, pos)?.wrapping_rem(rhs))
        }
        NodeKind::BitAnd(l, r) => Ok(fold_const(l, pos)? & fold_const(r, pos)?),
        NodeKind::BitOr(l, r) => Ok(fold_const(l, pos)? | fold_const(r, pos)?),
        NodeKind::BitXor(l, r) => Ok(fold_const(l, pos)? ^ fold_const(r, pos)?),
        NodeKind::Shl(l, r) => Ok(fold_const(l, pos)?.wrapping_shl(fold_const(r, pos)? as u32)),
        NodeKind::Shr(l, r) => Ok(fold_const(l, pos)?.wrapping_shr(fold_const(r, pos)? as u32)),
        NodeKind::Eq(l, r) => Ok((fold_const(l, pos)? == fold_const(r, pos)?) as i64),
        NodeKind::NotEq(l, r) => Ok((fold_const(l, pos)? != fold_const(r, pos)?) as i64),
        NodeKind::Lt(l, r) => Ok((fold_const(l, pos)? < fold_const(r, pos)?) as i64),
        NodeKind::Le(l, r) => Ok((fold_const(l, pos)? <= fold_const(r, pos)?) as i64),
        NodeKind::LogicAnd(l, r) => Ok(((fold_const(l, pos)? != 0) && (fold_const(r, pos)? != 0)) as i64),
        NodeKind::LogicOr(l, r) => Ok(((fold_const(l, pos)? != 0) || (fold_const(r, pos)? != 0)) as i64),
        NodeKind::CondExpr { cond, then, els } => {
            if fold_const(cond, pos)? != 0 {
                fold_const(then, pos)
            } else {
                fold_const(els, pos)
            }
        }
        _ => Err(err()),
    }
}

pub fn assert_integer_operand(ty: &Type, pos: Span) -> Result<()> {
    if !is_integer_type(ty) {
        return Err(CompileError::type_error("integer operand required", pos));
    }
    Ok(())
}

/// Shared binary node constructor for the kinds that simply inherit the
/// left operand's type (bitwise, shift, mul/div/mod) after checking neither
/// side is `void`.
pub fn new_binary_same_type<'a>(
    arena: &'a crate::arena::Arena<Node<'a>>,
    make: impl FnOnce(&'a Node<'a>, &'a Node<'a>) -> NodeKind<'a>,
    lhs: &'a Node<'a>,
    rhs: &'a Node<'a>,
    pos: Span,
) -> Result<&'a Node<'a>> {
    let lt = lhs.ty().ok_or_else(|| CompileError::internal("untyped operand", pos))?;
    let rt = rhs.ty().ok_or_else(|| CompileError::internal("untyped operand", pos))?;
    if lt.kind() == TypeKind::Void || rt.kind() == TypeKind::Void {
        return Err(void_operand_error(pos));
    }
    let ty = lt.clone();
    Ok(arena.alloc(Node::new(make(lhs, rhs), Some(ty), pos)))
}

pub fn new_int_result<'a>(
    arena: &'a crate::arena::Arena<Node<'a>>,
    prims: &Primitives,
    make: NodeKind<'a>,
    pos: Span,
) -> &'a Node<'a> {
    arena.alloc(Node::new(make, Some(prims.int.clone()), pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;

    #[test]
    fn fold_const_evaluates_arithmetic_with_precedence_already_applied() {
        // 1 + 2 * 3 as already-shaped tree: add(1, mul(2,3))
        let arena: Arena<Node> = Arena::new();
        let one = arena.alloc(Node::new(NodeKind::Num(1), None, Span::default()));
        let two = arena.alloc(Node::new(NodeKind::Num(2), None, Span::default()));
        let three = arena.alloc(Node::new(NodeKind::Num(3), None, Span::default()));
        let mul = arena.alloc(Node::new(NodeKind::Mul(two, three), None, Span::default()));
        let add = Node::new(NodeKind::Add(one, mul), None, Span::default());
        assert_eq!(fold_const(&add, Span::default()).unwrap(), 7);
    }

    #[test]
    fn fold_const_rejects_non_constant_subexpression() {
        let arena: Arena<Node> = Arena::new();
        let var = arena.alloc(Node::new(NodeKind::Var(Symbol::default()), None, Span::default()));
        assert!(fold_const(var, Span::default()).is_err());
    }

    #[test]
    fn fold_const_wraps_on_overflow() {
        let arena: Arena<Node> = Arena::new();
        let max = arena.alloc(Node::new(NodeKind::Num(i64::MAX), None, Span::default()));
        let one = arena.alloc(Node::new(NodeKind::Num(1), None, Span::default()));
        let add = Node::new(NodeKind::Add(max, one), None, Span::default());
        assert_eq!(fold_const(&add, Span::default()).unwrap(), i64::MIN);
    }

    #[test]
    fn sizeof_array_multiplies_len_by_element_size() {
        let prims = Primitives::new();
        let arr = Type::array_of(prims.int.clone(), 4);
        assert_eq!(sizeof_type(&arr), 16);
    }
}
