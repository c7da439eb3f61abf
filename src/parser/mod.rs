//! Recursive-descent parser: cursor into the token vector, mutable scope
//! stack, and the small amount of transient state the grammar needs
//! (current switch context, current function, current label table).

mod decl;
mod expr;
mod stmt;

use crate::arena::Arena;
use crate::ast::Node;
use crate::builtins::{self, VaElemMembers};
use crate::error::{CompileError, Result};
use crate::intern::{Interner, Symbol};
use crate::scope::{Ident, ScopeStack};
use crate::span::Span;
use crate::token::{Keyword, Punct, Token, TokenKind};
use crate::types::{Primitives, Type};
use std::rc::Rc;

/// Per-switch bookkeeping, pushed on entry and popped on exit so nested
/// switches see their own case list (Design Notes: "use explicit
/// save/restore in the recursive parser ... a per-parser field is
/// sufficient").
#[derive(Default)]
pub struct SwitchFrame<'a> {
    pub cases: Vec<&'a Node<'a>>,
    pub default_case: Option<&'a Node<'a>>,
}

pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    pub source: &'a str,
    pub interner: &'a Interner,
    pub arena: &'a Arena<Node<'a>>,
    pub scopes: ScopeStack<'a>,
    pub prims: Primitives,
    pub va_list_ty: Type,
    pub va_elem_members: VaElemMembers,
    pub string_literals: Vec<Rc<Ident<'a>>>,
    switch_stack: Vec<SwitchFrame<'a>>,
    current_func_returns_void: bool,
    current_va_area: Option<Rc<Ident<'a>>>,
    current_spill_area: Option<Rc<Ident<'a>>>,
    anon_tag_counter: u32,
}

impl<'a> Parser<'a> {
    /// `prims`, `va_elem_ty`, `va_list_ty`, and `va_elem_members` must come
    /// from a single [`builtins::register_builtins`] call made against the
    /// same interner this `Parser` reads from, *before* that interner was
    /// frozen into a shared reference — otherwise the struct member
    /// `Symbol`s baked into `va_elem_ty` would belong to a different
    /// interning table than the one member-access lookups use.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tokens: Vec<Token>,
        source: &'a str,
        interner: &'a Interner,
        arena: &'a Arena<Node<'a>>,
        prims: Primitives,
        va_elem_ty: Type,
        va_list_ty: Type,
        va_elem_members: VaElemMembers,
    ) -> Self {
        let mut scopes = ScopeStack::new();
        if let Some(tag) = interner.lookup("__builtin_va_elem") {
            scopes.declare_tag(tag, va_elem_ty);
        }
        if let Some(name) = interner.lookup("va_list") {
            let _ = scopes.declare_typedef(name, Span::default(), va_list_ty.clone());
        }

        Parser {
            tokens,
            pos: 0,
            source,
            interner,
            arena,
            scopes,
            prims,
            va_list_ty,
            va_elem_members,
            string_literals: Vec::new(),
            switch_stack: Vec::new(),
            current_func_returns_void: false,
            current_va_area: None,
            current_spill_area: None,
            anon_tag_counter: 0,
        }
    }

    pub fn parse_translation_unit(&mut self) -> Result<()> {
        decl::parse_translation_unit(self)
    }

    // --- cursor helpers -------------------------------------------------

    pub(crate) fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or_else(|| self.tokens.last().unwrap())
    }

    pub(crate) fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn restore(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub(crate) fn advance(&mut self) -> Token {
        let tok = *self.peek();
        if !tok.is_eof() {
            self.pos += 1;
        }
        tok
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.peek().is_eof()
    }

    pub(crate) fn consume_punct(&mut self, p: Punct) -> Option<Token> {
        if self.peek().is_punct(p) {
            Some(self.advance())
        } else {
            None
        }
    }

    pub(crate) fn expect_punct(&mut self, p: Punct) -> Result<Token> {
        self.consume_punct(p)
            .ok_or_else(|| CompileError::syntactic(format!("expected {p:?}"), self.peek().span))
    }

    pub(crate) fn consume_keyword(&mut self, k: Keyword) -> Option<Token> {
        if self.peek().is_keyword(k) {
            Some(self.advance())
        } else {
            None
        }
    }

    pub(crate) fn expect_ident(&mut self) -> Result<(Symbol, Span)> {
        let tok = *self.peek();
        match tok.kind {
            TokenKind::Ident(sym) => {
                self.advance();
                Ok((sym, tok.span))
            }
            _ => Err(CompileError::syntactic("expected identifier", tok.span)),
        }
    }

    pub(crate) fn expect_num(&mut self) -> Result<(i64, Span)> {
        let tok = *self.peek();
        match tok.kind {
            TokenKind::IntLiteral(v) => {
                self.advance();
                Ok((v, tok.span))
            }
            _ => Err(CompileError::syntactic("expected a number", tok.span)),
        }
    }

    pub(crate) fn text_of(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    pub(crate) fn fresh_anon_tag(&mut self) -> String {
        self.anon_tag_counter += 1;
        format!("<anonymous-{}>", self.anon_tag_counter)
    }

    // --- switch context ---------------------------------------------------

    pub(crate) fn enter_switch(&mut self) {
        self.switch_stack.push(SwitchFrame::default());
    }

    pub(crate) fn leave_switch(&mut self) -> SwitchFrame<'a> {
        self.switch_stack.pop().expect("switch stack underflow")
    }

    pub(crate) fn register_case(&mut self, node: &'a Node<'a>, pos: Span) -> Result<()> {
        match self.switch_stack.last_mut() {
            Some(frame) => {
                frame.cases.push(node);
                Ok(())
            }
            None => Err(CompileError::name_resolution("case outside of any switch", pos)),
        }
    }

    pub(crate) fn register_default(&mut self, node: &'a Node<'a>, pos: Span) -> Result<()> {
        match self.switch_stack.last_mut() {
            Some(frame) if frame.default_case.is_none() => {
                frame.default_case = Some(node);
                Ok(())
            }
            Some(_) => Err(CompileError::name_resolution("multiple default labels in one switch", pos)),
            None => Err(CompileError::name_resolution("default outside of any switch", pos)),
        }
    }

    // --- function-frame helpers (register spill area, va area) -----------

    pub(crate) fn set_current_function(&mut self, returns_void: bool) {
        self.current_func_returns_void = returns_void;
        self.current_va_area = None;
        self.current_spill_area = None;
    }

    pub(crate) fn current_func_returns_void(&self) -> bool {
        self.current_func_returns_void
    }

    /// Declares the implicit per-function register-spill area. Every
    /// function body gets one; it backs `__builtin_va_start`'s register
    /// save area regardless of whether the function is itself variadic.
    /// The lookup always succeeds in practice: the driver that builds this
    /// `Parser` interns the whole built-in prelude, including this name,
    /// before freezing the interner.
    pub(crate) fn declare_spill_area(&mut self, span: Span) -> Result<Rc<Ident<'a>>> {
        let name = self.interner.lookup("spill_area").unwrap_or(Symbol::default());
        let ty = Type::array_of(self.prims.char_.clone(), builtins::SPILL_AREA_SIZE);
        let ident = self.scopes.declare_local(name, span, ty)?;
        ident.offset.set(self.scopes.alloc_local(builtins::SPILL_AREA_SIZE));
        self.current_spill_area = Some(ident.clone());
        Ok(ident)
    }

    /// Declares the implicit `__va_area__` local for a variadic function.
    pub(crate) fn declare_va_area(&mut self, span: Span) -> Result<Rc<Ident<'a>>> {
        let name = self.interner.lookup("__va_area__").unwrap_or(Symbol::default());
        let ty = Type::array_of(self.prims.char_.clone(), builtins::VA_AREA_SIZE);
        let ident = self.scopes.declare_local(name, span, ty)?;
        ident.offset.set(self.scopes.alloc_local(builtins::VA_AREA_SIZE));
        self.current_va_area = Some(ident.clone());
        Ok(ident)
    }

    pub(crate) fn current_va_area(&self) -> Option<Rc<Ident<'a>>> {
        self.current_va_area.clone()
    }

    /// The current function's implicit register-spill storage. No node
    /// this front-end builds reads from it directly — `reg_save_area` in
    /// `va_elem` is only ever populated by a code generator's own
    /// register-save sequence — but a downstream consumer needs to know
    /// where that storage lives, so it's exposed the same way
    /// `current_va_area` is.
    pub(crate) fn current_spill_area(&self) -> Option<Rc<Ident<'a>>> {
        self.current_spill_area.clone()
    }
}
