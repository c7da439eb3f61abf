//! Scope stack and identifier/tag/label binding.
//!
//! Each frame holds three independent namespaces (ordinary identifiers,
//! struct/union/enum tags, and — for a function's top scope only — goto
//! labels). Lookup walks outward from the innermost frame to the permanent
//! global scope.

use crate::ast::Node;
use crate::error::{CompileError, Result};
use crate::intern::Symbol;
use crate::span::Span;
use crate::types::Type;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentKind {
    LocalVar,
    GlobalVar,
    Function,
    Typedef,
    EnumConst,
}

pub struct Ident<'a> {
    pub kind: IdentKind,
    pub name: Symbol,
    pub span: Span,
    pub ty: RefCell<Type>,
    /// Stack offset (locals) or member offset (struct members); unused for
    /// globals/functions/typedefs.
    pub offset: Cell<i64>,
    /// Value for enum constants.
    pub val: Cell<i64>,
    pub is_extern: Cell<bool>,
    pub is_static: Cell<bool>,
    pub is_var_params: Cell<bool>,
    // Function idents only:
    pub params: RefCell<Vec<Rc<Ident<'a>>>>,
    pub funcbody: RefCell<Option<&'a Node<'a>>>,
    pub func_scope: RefCell<Option<Rc<RefCell<Scope<'a>>>>>,
    pub stack_size: Cell<i64>,
    pub va_area: RefCell<Option<Rc<Ident<'a>>>>,
}

impl<'a> Ident<'a> {
    pub fn new(kind: IdentKind, name: Symbol, span: Span, ty: Type) -> Self {
        Ident {
            kind,
            name,
            span,
            ty: RefCell::new(ty),
            offset: Cell::new(0),
            val: Cell::new(0),
            is_extern: Cell::new(false),
            is_static: Cell::new(false),
            is_var_params: Cell::new(false),
            params: RefCell::new(Vec::new()),
            funcbody: RefCell::new(None),
            func_scope: RefCell::new(None),
            stack_size: Cell::new(0),
            va_area: RefCell::new(None),
        }
    }

    pub fn ty(&self) -> Type {
        self.ty.borrow().clone()
    }
}

pub struct Label {
    pub name: Symbol,
    pub labeled: bool,
}

pub struct Scope<'a> {
    pub parent: Option<Rc<RefCell<Scope<'a>>>>,
    idents: RefCell<Vec<(Symbol, Rc<Ident<'a>>)>>,
    tags: RefCell<HashMap<Symbol, Type>>,
    /// Populated only on a function's top scope.
    pub labels: Option<RefCell<HashMap<Symbol, Label>>>,
}

impl<'a> Scope<'a> {
    fn new(parent: Option<Rc<RefCell<Scope<'a>>>>, is_function_top: bool) -> Self {
        Scope {
            parent,
            idents: RefCell::new(Vec::new()),
            tags: RefCell::new(HashMap::new()),
            labels: if is_function_top {
                Some(RefCell::new(HashMap::new()))
            } else {
                None
            },
        }
    }

    fn find_local(&self, name: Symbol) -> Option<Rc<Ident<'a>>> {
        self.idents
            .borrow()
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, id)| id.clone())
    }
}

pub struct ScopeStack<'a> {
    stack: Vec<Rc<RefCell<Scope<'a>>>>,
    global: Rc<RefCell<Scope<'a>>>,
    /// Offset accounting for the current function frame; reset on entry.
    current_offset: Cell<i64>,
    max_offset: Cell<i64>,
}

impl<'a> ScopeStack<'a> {
    pub fn new() -> Self {
        let global = Rc::new(RefCell::new(Scope::new(None, false)));
        ScopeStack {
            stack: vec![global.clone()],
            global,
            current_offset: Cell::new(0),
            max_offset: Cell::new(0),
        }
    }

    pub fn global_scope(&self) -> Rc<RefCell<Scope<'a>>> {
        self.global.clone()
    }

    pub fn current(&self) -> Rc<RefCell<Scope<'a>>> {
        self.stack.last().unwrap().clone()
    }

    pub fn is_global(&self) -> bool {
        self.stack.len() == 1
    }

    /// Enters a new lexical scope (block, for-init, struct body). Pass
    /// `is_function_top = true` only for the scope a function body opens,
    /// so its `labels` table exists.
    pub fn enter(&mut self, is_function_top: bool) {
        let parent = self.current();
        self.stack
            .push(Rc::new(RefCell::new(Scope::new(Some(parent), is_function_top))));
    }

    pub fn leave(&mut self) {
        assert!(self.stack.len() > 1, "cannot pop the global scope");
        self.stack.pop();
    }

    /// Resets the high-water mark; call on entering a new function body.
    pub fn begin_function_frame(&self) {
        self.current_offset.set(0);
        self.max_offset.set(0);
    }

    /// Reserves `size` bytes of local storage and returns the assigned
    /// offset; updates the high-water mark.
    pub fn alloc_local(&self, size: i64) -> i64 {
        let offset = self.current_offset.get();
        let next = offset + size;
        self.current_offset.set(next);
        if next > self.max_offset.get() {
            self.max_offset.set(next);
        }
        offset
    }

    pub fn stack_size(&self) -> i64 {
        self.max_offset.get()
    }

    fn declare(&self, kind: IdentKind, name: Symbol, span: Span, ty: Type) -> Result<Rc<Ident<'a>>> {
        let scope = self.current();
        if scope.borrow().find_local(name).is_some() {
            return Err(CompileError::declaration("redeclaration of identifier", span));
        }
        let ident = Rc::new(Ident::new(kind, name, span, ty));
        scope.borrow().idents.borrow_mut().push((name, ident.clone()));
        Ok(ident)
    }

    pub fn declare_local(&self, name: Symbol, span: Span, ty: Type) -> Result<Rc<Ident<'a>>> {
        self.declare(IdentKind::LocalVar, name, span, ty)
    }

    pub fn declare_global(&self, name: Symbol, span: Span, ty: Type) -> Result<Rc<Ident<'a>>> {
        self.declare(IdentKind::GlobalVar, name, span, ty)
    }

    pub fn declare_function(&self, name: Symbol, span: Span, ty: Type) -> Result<Rc<Ident<'a>>> {
        self.declare(IdentKind::Function, name, span, ty)
    }

    pub fn declare_typedef(&self, name: Symbol, span: Span, ty: Type) -> Result<Rc<Ident<'a>>> {
        self.declare(IdentKind::Typedef, name, span, ty)
    }

    /// Enum constants bind in the *enclosing* scope, not a nested enum
    /// scope (there is no such scope — enum bodies never push a frame).
    pub fn declare_enum_const(&self, name: Symbol, span: Span, ty: Type, val: i64) -> Result<Rc<Ident<'a>>> {
        let ident = self.declare(IdentKind::EnumConst, name, span, ty)?;
        ident.val.set(val);
        Ok(ident)
    }

    pub fn find_ident(&self, name: Symbol) -> Option<Rc<Ident<'a>>> {
        let mut scope = Some(self.current());
        while let Some(s) = scope {
            if let Some(id) = s.borrow().find_local(name) {
                return Some(id);
            }
            scope = s.borrow().parent.clone();
        }
        None
    }

    pub fn find_typedef(&self, name: Symbol) -> Option<Type> {
        self.find_ident(name).and_then(|id| {
            if id.kind == IdentKind::Typedef {
                Some(id.ty())
            } else {
                None
            }
        })
    }

    pub fn declare_tag(&self, name: Symbol, ty: Type) {
        self.current().borrow().tags.borrow_mut().insert(name, ty);
    }

    pub fn find_tag(&self, name: Symbol) -> Option<Type> {
        let mut scope = Some(self.current());
        while let Some(s) = scope {
            if let Some(ty) = s.borrow().tags.borrow().get(&name) {
                return Some(ty.clone());
            }
            scope = s.borrow().parent.clone();
        }
        None
    }

    /// Walks outward to the nearest frame with a label table (the current
    /// function's top scope) and registers/looks up a goto label there.
    fn function_label_scope(&self) -> Rc<RefCell<Scope<'a>>> {
        let mut scope = Some(self.current());
        while let Some(s) = scope {
            if s.borrow().labels.is_some() {
                return s;
            }
            scope = s.borrow().parent.clone();
        }
        unreachable!("function body always opens a scope with a label table")
    }

    pub fn declare_label(&self, name: Symbol, labeled: bool) -> Result<()> {
        let scope = self.function_label_scope();
        let binding = scope.borrow();
        let mut labels = binding.labels.as_ref().unwrap().borrow_mut();
        match labels.get_mut(&name) {
            Some(existing) if labeled && existing.labeled => {
                return Err(CompileError::syntactic(
                    "duplicate label definition",
                    Span::default(),
                ))
            }
            Some(existing) => existing.labeled |= labeled,
            None => {
                labels.insert(name, Label { name, labeled });
            }
        }
        Ok(())
    }
}

impl<'a> Default for ScopeStack<'a> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::Interner;
    use crate::types::Primitives;

    #[test]
    fn redeclaration_in_same_scope_is_an_error() {
        let mut interner = Interner::new();
        let prims = Primitives::new();
        let stack = ScopeStack::new();
        let name = interner.intern("x");
        stack.declare_local(name, Span::default(), prims.int.clone()).unwrap();
        assert!(stack.declare_local(name, Span::default(), prims.int.clone()).is_err());
    }

    #[test]
    fn shadowing_inner_scope_does_not_mutate_outer() {
        let mut interner = Interner::new();
        let prims = Primitives::new();
        let mut stack = ScopeStack::new();
        let name = interner.intern("a");
        let outer = stack
            .declare_local(name, Span::default(), prims.int.clone())
            .unwrap();
        outer.offset.set(1);

        stack.enter(false);
        let inner = stack
            .declare_local(name, Span::default(), prims.int.clone())
            .unwrap();
        inner.offset.set(2);
        assert_eq!(stack.find_ident(name).unwrap().offset.get(), 2);
        stack.leave();

        assert_eq!(stack.find_ident(name).unwrap().offset.get(), 1);
    }

    #[test]
    fn find_ident_walks_outward() {
        let mut interner = Interner::new();
        let prims = Primitives::new();
        let mut stack = ScopeStack::new();
        let name = interner.intern("g");
        stack.declare_global(name, Span::default(), prims.int.clone()).unwrap();
        stack.enter(false);
        stack.enter(false);
        assert!(stack.find_ident(name).is_some());
    }

    #[test]
    fn tag_lookup_walks_outward_independent_of_ident_namespace() {
        let mut interner = Interner::new();
        let prims = Primitives::new();
        let mut stack = ScopeStack::new();
        let tag = interner.intern("Point");
        stack.declare_tag(tag, prims.int.clone());
        stack.enter(false);
        assert!(stack.find_tag(tag).is_some());
        assert!(stack.find_ident(tag).is_none());
    }

    #[test]
    fn stack_size_tracks_high_water_mark() {
        let stack = ScopeStack::new();
        stack.begin_function_frame();
        stack.alloc_local(8);
        stack.alloc_local(4);
        assert_eq!(stack.stack_size(), 12);
    }
}
