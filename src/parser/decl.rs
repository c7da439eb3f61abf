//! Declaration parsing: `declspec` + `declare`, struct/union/enum
//! specifiers, and the function-vs-variable split at the top level.

use super::Parser;
use crate::ast::{Node, NodeKind};
use crate::error::{CompileError, Result};
use crate::intern::Symbol;
use crate::span::Span;
use crate::token::{Keyword, Punct, TokenKind};
use crate::types::{Member, Type, TypeKind};
use std::rc::Rc;

mod bitflags_like {
    // Type-specifier flag sums: each keyword contributes a fixed bit value,
    // `long` contributes its bit on every occurrence (so it may legally
    // appear twice), and the accumulated sum selects exactly one primitive.
    pub const VOID: u32 = 1 << 0;
    pub const BOOL: u32 = 1 << 2;
    pub const CHAR: u32 = 1 << 4;
    pub const SHORT: u32 = 1 << 6;
    pub const INT: u32 = 1 << 8;
    pub const LONG: u32 = 1 << 10;
    pub const SIGNED: u32 = 1 << 12;
    pub const UNSIGNED: u32 = 1 << 13;
}
use bitflags_like::*;

#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub struct StorageClass {
    pub is_typedef: bool,
    pub is_extern: bool,
    pub is_static: bool,
}

pub struct DeclSpec {
    pub ty: Type,
    pub storage: StorageClass,
}

impl<'a> Parser<'a> {
    /// `declspec`: storage class + qualifiers + type specifiers, or a
    /// typedef-name / struct / union / enum specifier.
    pub(super) fn declspec(&mut self) -> Result<DeclSpec> {
        let mut storage = StorageClass::default();
        let mut flags: u32 = 0;
        let mut long_count = 0u32;
        let mut ty: Option<Type> = None;

        loop {
            let tok_span = self.peek().span;
            if self.consume_keyword(Keyword::Typedef).is_some() {
                if storage != StorageClass::default() {
                    return Err(CompileError::declaration("multiple storage classes", tok_span));
                }
                storage.is_typedef = true;
                continue;
            }
            if self.consume_keyword(Keyword::Extern).is_some() {
                if storage != StorageClass::default() {
                    return Err(CompileError::declaration("multiple storage classes", tok_span));
                }
                storage.is_extern = true;
                continue;
            }
            if self.consume_keyword(Keyword::Static).is_some() {
                if storage != StorageClass::default() {
                    return Err(CompileError::declaration("multiple storage classes", tok_span));
                }
                storage.is_static = true;
                continue;
            }
            if self.consume_keyword(Keyword::Auto).is_some() || self.consume_keyword(Keyword::Register).is_some()
            {
                // accepted and ignored
                continue;
            }
            if self.consume_keyword(Keyword::Const).is_some()
                || self.consume_keyword(Keyword::Volatile).is_some()
                || self.consume_keyword(Keyword::Restrict).is_some()
            {
                continue;
            }

            if ty.is_none() {
                if let Some(t) = self.try_struct_or_union_spec()? {
                    ty = Some(t);
                    continue;
                }
                if let Some(t) = self.try_enum_spec()? {
                    ty = Some(t);
                    continue;
                }
                if let TokenKind::Ident(sym) = self.peek().kind {
                    if flags == 0 {
                        if let Some(t) = self.scopes.find_typedef(sym) {
                            self.advance();
                            ty = Some(t);
                            continue;
                        }
                    }
                }
            }

            if ty.is_none() {
                let bit = if self.consume_keyword(Keyword::Void).is_some() {
                    Some(VOID)
                } else if self.consume_keyword(Keyword::Bool).is_some() {
                    Some(BOOL)
                } else if self.consume_keyword(Keyword::Char).is_some() {
                    Some(CHAR)
                } else if self.consume_keyword(Keyword::Short).is_some() {
                    Some(SHORT)
                } else if self.consume_keyword(Keyword::Int).is_some() {
                    Some(INT)
                } else if self.consume_keyword(Keyword::Long).is_some() {
                    long_count += 1;
                    if long_count > 2 {
                        return Err(CompileError::declaration("'long' used three times", tok_span));
                    }
                    Some(LONG)
                } else if self.consume_keyword(Keyword::Signed).is_some() {
                    Some(SIGNED)
                } else if self.consume_keyword(Keyword::Unsigned).is_some() {
                    Some(UNSIGNED)
                } else {
                    None
                };
                match bit {
                    Some(b) => {
                        flags += b;
                        continue;
                    }
                    None => break,
                }
            }
            break;
        }

        let ty = match ty {
            Some(t) => t,
            None => self.flags_to_primitive(flags, tok_span_fallback(self))?,
        };
        Ok(DeclSpec { ty, storage })
    }

    fn flags_to_primitive(&self, flags: u32, pos: Span) -> Result<Type> {
        let p = &self.prims;
        Ok(match flags {
            0 => p.int.clone(), // no specifier at all defaults to int
            f if f == VOID => p.void.clone(),
            f if f == BOOL => p.bool_.clone(),
            f if f == CHAR || f == CHAR + SIGNED => p.char_.clone(),
            f if f == CHAR + UNSIGNED => p.uchar.clone(),
            f if f == SHORT || f == SHORT + INT || f == SHORT + SIGNED || f == SHORT + SIGNED + INT => {
                p.short.clone()
            }
            f if f == SHORT + UNSIGNED || f == SHORT + UNSIGNED + INT => p.ushort.clone(),
            f if f == INT || f == SIGNED || f == SIGNED + INT => p.int.clone(),
            f if f == UNSIGNED || f == UNSIGNED + INT => p.uint.clone(),
            f if f == LONG
                || f == LONG + INT
                || f == LONG * 2
                || f == LONG * 2 + INT
                || f == LONG + SIGNED
                || f == LONG + SIGNED + INT =>
            {
                p.long.clone()
            }
            f if f == LONG + UNSIGNED || f == LONG * 2 + UNSIGNED || f == LONG + UNSIGNED + INT => {
                p.ulong.clone()
            }
            _ => return Err(CompileError::declaration("invalid specifier combination", pos)),
        })
    }

    /// Reads `*`* then an identifier then an optional `[ N ]`; storage class
    /// flags propagate into the returned ident via the caller.
    pub(super) fn declare(&mut self, base: Type) -> Result<(Symbol, Span, Type)> {
        let mut ty = base;
        while self.consume_punct(Punct::Star).is_some() {
            while self.consume_keyword(Keyword::Const).is_some()
                || self.consume_keyword(Keyword::Volatile).is_some()
                || self.consume_keyword(Keyword::Restrict).is_some()
            {}
            ty = Type::pointer_to(ty);
        }
        let (name, span) = self.expect_ident()?;
        if self.consume_punct(Punct::LBracket).is_some() {
            let (len, _) = self.expect_num()?;
            self.expect_punct(Punct::RBracket)?;
            ty = Type::array_of(ty, len);
        }
        Ok((name, span, ty))
    }

    fn try_struct_or_union_spec(&mut self) -> Result<Option<Type>> {
        let is_union = if self.consume_keyword(Keyword::Struct).is_some() {
            false
        } else if self.consume_keyword(Keyword::Union).is_some() {
            true
        } else {
            return Ok(None);
        };
        let kind = if is_union { TypeKind::Union } else { TypeKind::Struct };

        let tag = match self.peek().kind {
            TokenKind::Ident(sym) => {
                self.advance();
                Some(sym)
            }
            _ => None,
        };

        if self.peek().is_punct(Punct::LBrace) {
            let existing = tag.and_then(|t| self.scopes.find_tag(t));
            let ty = match existing {
                Some(t) if !t.is_incomplete() => {
                    return Err(CompileError::declaration(
                        "redefinition of struct/union tag",
                        self.peek().span,
                    ))
                }
                Some(t) => t,
                None => match tag {
                    Some(t) => Type::incomplete_tag(kind, t),
                    None => Type::new(kind, 0),
                },
            };
            if let Some(t) = tag {
                self.scopes.declare_tag(t, ty.clone());
            }
            self.parse_aggregate_body(&ty, is_union)?;
            return Ok(Some(ty));
        }

        match tag {
            Some(t) => match self.scopes.find_tag(t) {
                Some(ty) => Ok(Some(ty)),
                None => {
                    let ty = Type::incomplete_tag(kind, t);
                    self.scopes.declare_tag(t, ty.clone());
                    Ok(Some(ty))
                }
            },
            None => Err(CompileError::syntactic(
                "expected a tag name or '{' after struct/union",
                self.peek().span,
            )),
        }
    }

    fn parse_aggregate_body(&mut self, ty: &Type, is_union: bool) -> Result<()> {
        self.expect_punct(Punct::LBrace)?;
        let mut members = Vec::new();
        let mut offset: i64 = 0;
        let mut max_size: i64 = 0;
        loop {
            if self.consume_punct(Punct::RBrace).is_some() {
                break;
            }
            let spec = self.declspec()?;
            loop {
                let (name, _, member_ty) = self.declare(spec.ty.clone())?;
                let size = member_ty.size();
                let member_offset = if is_union { 0 } else { offset };
                members.push(Member {
                    name,
                    ty: member_ty,
                    offset: member_offset,
                });
                if is_union {
                    max_size = max_size.max(size);
                } else {
                    offset += size;
                }
                if self.consume_punct(Punct::Comma).is_none() {
                    break;
                }
            }
            self.expect_punct(Punct::Semicolon)?;
        }
        let total = if is_union { max_size } else { offset };
        ty.complete_tag(total, members);
        Ok(())
    }

    fn try_enum_spec(&mut self) -> Result<Option<Type>> {
        if self.consume_keyword(Keyword::Enum).is_none() {
            return Ok(None);
        }
        let tag = match self.peek().kind {
            TokenKind::Ident(sym) => {
                self.advance();
                Some(sym)
            }
            _ => None,
        };

        if !self.peek().is_punct(Punct::LBrace) {
            return match tag.and_then(|t| self.scopes.find_tag(t)) {
                Some(ty) => Ok(Some(ty)),
                None => Err(CompileError::syntactic("expected enum body", self.peek().span)),
            };
        }

        self.advance(); // `{`
        let ty = Type::new(TypeKind::Enum, 4);
        if let Some(t) = tag {
            self.scopes.declare_tag(t, ty.clone());
        }
        let mut next_val: i64 = 0;
        loop {
            if self.peek().is_punct(Punct::RBrace) {
                break;
            }
            let (name, span) = self.expect_ident()?;
            let val = if self.consume_punct(Punct::Assign).is_some() {
                let v = self.expect_constant_expr()?;
                v
            } else {
                next_val
            };
            self.scopes
                .declare_enum_const(name, span, self.prims.int.clone(), val)?;
            next_val = val + 1;
            if self.consume_punct(Punct::Comma).is_none() {
                break;
            }
        }
        self.expect_punct(Punct::RBrace)?;
        ty.complete_tag(4, Vec::new());
        Ok(Some(ty))
    }

    /// `is_function`: bounded lookahead deciding function vs. variable —
    /// skip `*`, expect an identifier, expect `(`. Always restores the
    /// cursor.
    pub(super) fn is_function(&mut self) -> bool {
        let start = self.pos();
        while self.consume_punct(Punct::Star).is_some() {}
        let looks_like_fn = matches!(self.peek().kind, TokenKind::Ident(_))
            && matches!(self.peek_at(1).map(|t| t.kind), Some(TokenKind::Punct(Punct::LParen)));
        self.restore(start);
        looks_like_fn
    }

    pub(super) fn parse_function(&mut self, spec: &DeclSpec) -> Result<()> {
        let mut ty = spec.ty.clone();
        while self.consume_punct(Punct::Star).is_some() {
            ty = Type::pointer_to(ty);
        }
        let (name, span) = self.expect_ident()?;
        self.expect_punct(Punct::LParen)?;

        let returns_void = ty.kind() == TypeKind::Void;
        let func_ident = match self.scopes.find_ident(name) {
            Some(id) if id.kind == crate::scope::IdentKind::Function => {
                if !crate::types::equal_type(&id.ty(), &ty) {
                    return Err(CompileError::declaration("conflicting function return type", span));
                }
                id
            }
            Some(_) => {
                return Err(CompileError::declaration("redeclaration of identifier as function", span))
            }
            None => self.scopes.declare_function(name, span, ty)?,
        };

        self.scopes.enter(true);
        self.scopes.begin_function_frame();
        let mut params: Vec<Rc<crate::scope::Ident<'a>>> = Vec::new();
        let mut is_variadic = false;
        if !self.peek().is_punct(Punct::RParen) {
            loop {
                if self.consume_punct(Punct::Ellipsis).is_some() {
                    is_variadic = true;
                    break;
                }
                let pspec = self.declspec()?;
                let (pname, pspan, pty) = self.declare(pspec.ty.clone())?;
                let ident = self.scopes.declare_local(pname, pspan, pty.clone())?;
                ident.offset.set(self.scopes.alloc_local(pty.size()));
                params.push(ident);
                if self.consume_punct(Punct::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect_punct(Punct::RParen)?;

        func_ident.is_var_params.set(is_variadic);
        *func_ident.params.borrow_mut() = params;

        if self.consume_punct(Punct::Semicolon).is_some() {
            self.scopes.leave();
            return Ok(());
        }

        if func_ident.funcbody.borrow().is_some() {
            self.scopes.leave();
            return Err(CompileError::declaration("redefinition of function body", span));
        }

        self.set_current_function(returns_void);
        self.declare_spill_area(span)?;
        if is_variadic {
            self.declare_va_area(span)?;
        }

        let body = self.parse_compound_stmt()?;
        *func_ident.funcbody.borrow_mut() = Some(body);
        func_ident.stack_size.set(self.scopes.stack_size());
        *func_ident.func_scope.borrow_mut() = Some(self.scopes.current());
        self.scopes.leave();
        Ok(())
    }

    pub(super) fn parse_global_var(&mut self, spec: &DeclSpec) -> Result<()> {
        // A bare `struct Foo { ... };` with no declarator just defines the
        // tag; nothing further to bind.
        if self.consume_punct(Punct::Semicolon).is_some() {
            return Ok(());
        }
        loop {
            let (name, span, ty) = self.declare(spec.ty.clone())?;
            if spec.storage.is_typedef {
                self.scopes.declare_typedef(name, span, ty)?;
            } else {
                let ident = self.scopes.declare_global(name, span, ty)?;
                ident.is_extern.set(spec.storage.is_extern);
                ident.is_static.set(spec.storage.is_static);
                if self.consume_punct(Punct::Assign).is_some() {
                    let init = self.assign()?;
                    let _ = self.arena.alloc(Node::new(
                        NodeKind::Assign {
                            lhs: self.arena.alloc(Node::new(NodeKind::Var(name), Some(ident.ty()), span)),
                            rhs: init,
                        },
                        Some(ident.ty()),
                        span,
                    ));
                }
            }
            if self.consume_punct(Punct::Comma).is_none() {
                break;
            }
        }
        self.expect_punct(Punct::Semicolon)?;
        Ok(())
    }
}

/// Constant-expression evaluation used by enum values, case labels, and
/// array sizes: parses one `assign`-level expression then folds it.
impl<'a> Parser<'a> {
    pub(super) fn expect_constant_expr(&mut self) -> Result<i64> {
        let pos = self.peek().span;
        let node = self.assign()?;
        crate::ast::fold_const(node, pos)
    }
}

fn tok_span_fallback(p: &Parser) -> Span {
    p.peek().span
}

pub(super) fn parse_translation_unit(p: &mut Parser) -> Result<()> {
    while !p.at_eof() {
        let spec = p.declspec()?;
        if spec.storage.is_typedef {
            loop {
                let (name, span, ty) = p.declare(spec.ty.clone())?;
                p.scopes.declare_typedef(name, span, ty)?;
                if p.consume_punct(Punct::Comma).is_none() {
                    break;
                }
            }
            p.expect_punct(Punct::Semicolon)?;
            continue;
        }
        if p.is_function() {
            p.parse_function(&spec)?;
        } else {
            p.parse_global_var(&spec)?;
        }
    }
    Ok(())
}
