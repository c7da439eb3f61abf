//! Predefined built-in definitions prepended ahead of the translation unit:
//! the `__builtin_va_elem` struct, the `va_list` typedef, and registration
//! of the `gp_offset` member the `__builtin_va_arg` lowering depends on.
//!
//! The real preprocessor textually splices a builtin-def token stream ahead
//! of the user's file; here the equivalent is done by registering the
//! resulting scope/type bindings directly, since macro/text splicing itself
//! is out of scope.

use crate::error::{CompileError, Result};
use crate::intern::{Interner, Symbol};
use crate::span::Span;
use crate::types::{Member, Primitives, Type, TypeKind};

pub struct VaElemMembers {
    pub gp_offset: Symbol,
    pub fp_offset: Symbol,
    pub overflow_arg_area: Symbol,
    pub reg_save_area: Symbol,
}

/// Size in bytes of the implicit per-function register-spill area: 30
/// argument-register slots, 8 bytes each, enough for every integer and
/// floating-point argument register a calling convention might need to
/// spill at function entry.
pub const SPILL_AREA_SIZE: i64 = 8 * 30;

/// Size in bytes of the implicit per-function `__va_area__` scratch region
/// backing a `va_list` (one `__builtin_va_elem` record).
pub const VA_AREA_SIZE: i64 = 24;

/// Builds the `__builtin_va_elem` struct type and the `va_list` type (a
/// pointer to it, the common System-V lowering), interning the four member
/// names needed by the `__builtin_va_arg` lowering.
pub fn register_builtins(interner: &mut Interner, prims: &Primitives) -> (Type, Type, VaElemMembers) {
    let gp_offset = interner.intern("gp_offset");
    let fp_offset = interner.intern("fp_offset");
    let overflow_arg_area = interner.intern("overflow_arg_area");
    let reg_save_area = interner.intern("reg_save_area");

    let void_ptr = Type::pointer_to(prims.void.clone());
    let members = vec![
        Member {
            name: gp_offset,
            ty: prims.int.clone(),
            offset: 0,
        },
        Member {
            name: fp_offset,
            ty: prims.int.clone(),
            offset: 4,
        },
        Member {
            name: overflow_arg_area,
            ty: void_ptr.clone(),
            offset: 8,
        },
        Member {
            name: reg_save_area,
            ty: void_ptr,
            offset: 16,
        },
    ];
    let va_elem = Type::new(TypeKind::Struct, VA_AREA_SIZE);
    va_elem.complete_tag(VA_AREA_SIZE, members);

    let va_list = Type::pointer_to(va_elem.clone());

    (
        va_elem,
        va_list,
        VaElemMembers {
            gp_offset,
            fp_offset,
            overflow_arg_area,
            reg_save_area,
        },
    )
}

pub fn missing_builtin_member(name: &str, pos: Span) -> CompileError {
    CompileError::internal(format!("broken built-in prelude: missing '{name}' member"), pos)
}

pub fn require_member(ty: &Type, name: Symbol, label: &str, pos: Span) -> Result<Member> {
    ty.get_member(name).ok_or_else(|| missing_builtin_member(label, pos))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn va_elem_has_all_four_members() {
        let mut interner = Interner::new();
        let prims = Primitives::new();
        let (va_elem, va_list, members) = register_builtins(&mut interner, &prims);
        assert!(va_elem.get_member(members.gp_offset).is_some());
        assert!(va_elem.get_member(members.fp_offset).is_some());
        assert!(va_elem.get_member(members.overflow_arg_area).is_some());
        assert!(va_elem.get_member(members.reg_save_area).is_some());
        assert_eq!(va_list.kind(), TypeKind::Pointer);
    }
}
