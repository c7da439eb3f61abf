//! Type descriptors: primitives, pointer/array composition, and aggregates.
//!
//! A [`Type`] is a shared, interior-mutable handle (`Rc<RefCell<TypeData>>`)
//! rather than Rust's usual immutable-by-default value. This is deliberate:
//! completing a forward-declared struct/union/enum tag must mutate the
//! single existing record in place so every reference taken before
//! completion (including a self-referential pointer member) observes the
//! completed members afterward.

use crate::intern::Symbol;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Void,
    Bool,
    Int,
    Pointer,
    Array,
    Struct,
    Union,
    Enum,
    Function,
}

#[derive(Debug, Clone)]
pub struct Member {
    pub name: Symbol,
    pub ty: Type,
    pub offset: i64,
}

#[derive(Debug)]
pub struct TypeData {
    pub kind: TypeKind,
    pub size: i64,
    pub is_unsigned: bool,
    pub is_const: bool,
    /// Pointee (pointer) or element type (array).
    pub base: Option<Type>,
    pub array_len: i64,
    pub members: Vec<Member>,
    pub tag_name: Option<Symbol>,
    pub is_incomplete: bool,
}

/// A shared handle to a type descriptor. Cloning shares the underlying
/// record; use [`Type::shallow_copy`] to get an independent record seeded
/// with the same fields.
#[derive(Debug, Clone)]
pub struct Type(Rc<RefCell<TypeData>>);

impl Type {
    fn from_data(data: TypeData) -> Self {
        Type(Rc::new(RefCell::new(data)))
    }

    pub fn new(kind: TypeKind, size: i64) -> Self {
        Self::from_data(TypeData {
            kind,
            size,
            is_unsigned: false,
            is_const: false,
            base: None,
            array_len: 0,
            members: Vec::new(),
            tag_name: None,
            is_incomplete: false,
        })
    }

    pub fn pointer_to(base: Type) -> Self {
        let ty = Self::new(TypeKind::Pointer, 8);
        {
            let mut d = ty.0.borrow_mut();
            d.base = Some(base);
            d.is_unsigned = true;
        }
        ty
    }

    pub fn array_of(base: Type, len: i64) -> Self {
        let elem_size = base.borrow().size;
        let ty = Self::new(TypeKind::Array, elem_size);
        {
            let mut d = ty.0.borrow_mut();
            d.base = Some(base);
            d.array_len = len;
        }
        ty
    }

    /// Forward-declared tag: an incomplete struct/union/enum placed into the
    /// tag table before its members are known, so self-referential pointers
    /// (`struct Node { struct Node *next; }`) resolve to this same record.
    pub fn incomplete_tag(kind: TypeKind, tag_name: Symbol) -> Self {
        let ty = Self::new(kind, 0);
        {
            let mut d = ty.0.borrow_mut();
            d.tag_name = Some(tag_name);
            d.is_incomplete = true;
        }
        ty
    }

    /// Completes a forward-declared tag in place. Every prior clone of this
    /// handle observes the completion because they share the same `Rc`.
    pub fn complete_tag(&self, size: i64, members: Vec<Member>) {
        let mut d = self.0.borrow_mut();
        d.size = size;
        d.members = members;
        d.is_incomplete = false;
    }

    /// Shallow clone used when applying qualifiers (e.g. `const`) without
    /// disturbing a shared primitive/base type.
    pub fn shallow_copy(&self) -> Self {
        let d = self.0.borrow();
        Self::from_data(TypeData {
            kind: d.kind,
            size: d.size,
            is_unsigned: d.is_unsigned,
            is_const: d.is_const,
            base: d.base.clone(),
            array_len: d.array_len,
            members: d.members.clone(),
            tag_name: d.tag_name,
            is_incomplete: d.is_incomplete,
        })
    }

    pub fn with_const(&self) -> Self {
        let copy = self.shallow_copy();
        copy.0.borrow_mut().is_const = true;
        copy
    }

    pub fn borrow(&self) -> std::cell::Ref<'_, TypeData> {
        self.0.borrow()
    }

    pub fn kind(&self) -> TypeKind {
        self.0.borrow().kind
    }

    pub fn size(&self) -> i64 {
        self.0.borrow().size
    }

    pub fn is_unsigned(&self) -> bool {
        self.0.borrow().is_unsigned
    }

    pub fn is_const(&self) -> bool {
        self.0.borrow().is_const
    }

    pub fn is_incomplete(&self) -> bool {
        self.0.borrow().is_incomplete
    }

    pub fn base(&self) -> Option<Type> {
        self.0.borrow().base.clone()
    }

    pub fn array_len(&self) -> i64 {
        self.0.borrow().array_len
    }

    pub fn get_member(&self, name: Symbol) -> Option<Member> {
        self.0
            .borrow()
            .members
            .iter()
            .find(|m| m.name == name)
            .cloned()
    }

    pub fn ptr_eq(&self, other: &Type) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.offset == other.offset && self.ty.ptr_eq(&other.ty)
    }
}

/// Type equality compares kind, size, unsignedness, and array length.
/// Aggregate member lists are *not* compared structurally — a known
/// under-specification carried over unchanged.
pub fn equal_type(a: &Type, b: &Type) -> bool {
    let da = a.borrow();
    let db = b.borrow();
    da.size == db.size
        && da.array_len == db.array_len
        && da.kind == db.kind
        && da.is_unsigned == db.is_unsigned
}

/// `true` for kinds valid as an arithmetic/integer operand: plain integers,
/// enum constants, booleans, and pointers (pointer arithmetic needs this).
/// Every other kind, including `void`, `struct`, `union`, `array`, and
/// `function`, returns `false`.
pub fn is_integer_type(ty: &Type) -> bool {
    matches!(
        ty.kind(),
        TypeKind::Int | TypeKind::Enum | TypeKind::Bool | TypeKind::Pointer
    )
}

/// Primitive singletons constructed once per compilation, matching the C
/// `int`/`char`/`short`/`long` widths (1/2/4/8 bytes) and `char` being a
/// plain signed byte here (no separate 8-bit `TY_CHAR` kind; `char` and the
/// unsigned variants are all `TypeKind::Int` at different sizes, same as the
/// original implementation).
pub struct Primitives {
    pub void: Type,
    pub bool_: Type,
    pub char_: Type,
    pub short: Type,
    pub int: Type,
    pub long: Type,
    pub uchar: Type,
    pub ushort: Type,
    pub uint: Type,
    pub ulong: Type,
}

impl Primitives {
    pub fn new() -> Self {
        let uchar = Type::new(TypeKind::Int, 1);
        uchar.0.borrow_mut().is_unsigned = true;
        let ushort = Type::new(TypeKind::Int, 2);
        ushort.0.borrow_mut().is_unsigned = true;
        let uint = Type::new(TypeKind::Int, 4);
        uint.0.borrow_mut().is_unsigned = true;
        let ulong = Type::new(TypeKind::Int, 8);
        ulong.0.borrow_mut().is_unsigned = true;

        Primitives {
            void: Type::new(TypeKind::Void, 1),
            bool_: Type::new(TypeKind::Bool, 1),
            char_: Type::new(TypeKind::Int, 1),
            short: Type::new(TypeKind::Int, 2),
            int: Type::new(TypeKind::Int, 4),
            long: Type::new(TypeKind::Int, 8),
            uchar,
            ushort,
            uint,
            ulong,
        }
    }
}

impl Default for Primitives {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_to_is_size_8_and_unsigned() {
        let prims = Primitives::new();
        let p = Type::pointer_to(prims.int.clone());
        assert_eq!(p.size(), 8);
        assert!(p.is_unsigned());
    }

    #[test]
    fn array_of_copies_element_size() {
        let prims = Primitives::new();
        let a = Type::array_of(prims.char_.clone(), 5);
        assert_eq!(a.size(), 1);
        assert_eq!(a.array_len(), 5);
    }

    #[test]
    fn completing_tag_mutates_existing_handle() {
        let sym = Symbol::default();
        let forward = Type::incomplete_tag(TypeKind::Struct, sym);
        let alias = forward.clone();
        assert!(alias.is_incomplete());
        forward.complete_tag(8, Vec::new());
        assert!(!alias.is_incomplete());
        assert_eq!(alias.size(), 8);
    }

    #[test]
    fn shallow_copy_is_independent_record() {
        let prims = Primitives::new();
        let copy = prims.int.with_const();
        assert!(copy.is_const());
        assert!(!prims.int.is_const());
    }

    #[test]
    fn equal_type_ignores_member_lists() {
        let a = Type::new(TypeKind::Struct, 8);
        let b = Type::new(TypeKind::Struct, 8);
        assert!(equal_type(&a, &b));
    }

    #[test]
    fn is_integer_type_rejects_void_and_struct() {
        let prims = Primitives::new();
        assert!(!is_integer_type(&prims.void));
        assert!(!is_integer_type(&Type::new(TypeKind::Struct, 0)));
        assert!(is_integer_type(&prims.int));
        assert!(is_integer_type(&Type::pointer_to(prims.int.clone())));
    }
}
