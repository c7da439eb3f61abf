//! Statement parsing: compound statements, control flow, switch/case
//! context, and goto/label resolution.

use super::Parser;
use crate::ast::{Node, NodeKind};
use crate::error::{CompileError, Result};
use crate::token::{Keyword, Punct, TokenKind};

impl<'a> Parser<'a> {
    pub(super) fn parse_compound_stmt(&mut self) -> Result<&'a Node<'a>> {
        let start = self.peek().span;
        self.expect_punct(Punct::LBrace)?;
        self.scopes.enter(false);
        let mut stmts = Vec::new();
        loop {
            if self.consume_punct(Punct::RBrace).is_some() {
                break;
            }
            stmts.push(self.declaration_or_statement()?);
        }
        self.scopes.leave();
        Ok(self.arena.alloc(Node::new(NodeKind::Block(stmts), None, start)))
    }

    fn declaration_or_statement(&mut self) -> Result<&'a Node<'a>> {
        if self.starts_declaration() {
            self.parse_local_declaration()
        } else {
            self.statement()
        }
    }

    fn starts_declaration(&mut self) -> bool {
        match self.peek().kind {
            TokenKind::Keyword(
                Keyword::Typedef
                | Keyword::Extern
                | Keyword::Static
                | Keyword::Auto
                | Keyword::Register
                | Keyword::Const
                | Keyword::Volatile
                | Keyword::Restrict
                | Keyword::Void
                | Keyword::Bool
                | Keyword::Char
                | Keyword::Short
                | Keyword::Int
                | Keyword::Long
                | Keyword::Signed
                | Keyword::Unsigned
                | Keyword::Struct
                | Keyword::Union
                | Keyword::Enum,
            ) => true,
            TokenKind::Ident(sym) => self.scopes.find_typedef(sym).is_some(),
            _ => false,
        }
    }

    fn parse_local_declaration(&mut self) -> Result<&'a Node<'a>> {
        let start = self.peek().span;
        let spec = self.declspec()?;
        if spec.storage.is_typedef {
            loop {
                let (name, span, ty) = self.declare(spec.ty.clone())?;
                self.scopes.declare_typedef(name, span, ty)?;
                if self.consume_punct(Punct::Comma).is_none() {
                    break;
                }
            }
            self.expect_punct(Punct::Semicolon)?;
            return Ok(self.arena.alloc(Node::new(NodeKind::NoOp, None, start)));
        }

        if self.consume_punct(Punct::Semicolon).is_some() {
            return Ok(self.arena.alloc(Node::new(NodeKind::NoOp, None, start)));
        }

        let mut inits: Vec<&'a Node<'a>> = Vec::new();
        loop {
            let (name, span, ty) = self.declare(spec.ty.clone())?;
            let ident = self.scopes.declare_local(name, span, ty.clone())?;
            ident.is_extern.set(spec.storage.is_extern);
            ident.is_static.set(spec.storage.is_static);
            ident.offset.set(self.scopes.alloc_local(ty.size()));
            if self.consume_punct(Punct::Assign).is_some() {
                let rhs = self.assign()?;
                let lhs = self.arena.alloc(Node::new(NodeKind::Var(name), Some(ty.clone()), span));
                inits.push(self.arena.alloc(Node::new(
                    NodeKind::Assign { lhs, rhs },
                    Some(ty),
                    span,
                )));
            }
            if self.consume_punct(Punct::Comma).is_none() {
                break;
            }
        }
        self.expect_punct(Punct::Semicolon)?;
        Ok(self.arena.alloc(Node::new(NodeKind::Block(inits), None, start)))
    }

    fn statement(&mut self) -> Result<&'a Node<'a>> {
        let pos = self.peek().span;

        if self.peek().is_punct(Punct::LBrace) {
            return self.parse_compound_stmt();
        }

        if self.consume_punct(Punct::Semicolon).is_some() {
            return Ok(self.arena.alloc(Node::new(NodeKind::NoOp, None, pos)));
        }

        if self.consume_keyword(Keyword::Return).is_some() {
            let value = if self.peek().is_punct(Punct::Semicolon) {
                if !self.current_func_returns_void() {
                    return Err(CompileError::syntactic("expected an expression after 'return'", pos));
                }
                None
            } else {
                Some(self.expr()?)
            };
            self.expect_punct(Punct::Semicolon)?;
            return Ok(self.arena.alloc(Node::new(NodeKind::Return(value), None, pos)));
        }

        if self.consume_keyword(Keyword::If).is_some() {
            self.expect_punct(Punct::LParen)?;
            let cond = self.expr()?;
            self.expect_punct(Punct::RParen)?;
            let then = self.statement()?;
            if self.consume_keyword(Keyword::Else).is_some() {
                let els = self.statement()?;
                return Ok(self
                    .arena
                    .alloc(Node::new(NodeKind::IfElse { cond, then, els }, None, pos)));
            }
            return Ok(self.arena.alloc(Node::new(NodeKind::If { cond, then }, None, pos)));
        }

        if self.consume_keyword(Keyword::While).is_some() {
            self.expect_punct(Punct::LParen)?;
            let cond = self.expr()?;
            self.expect_punct(Punct::RParen)?;
            let body = self.statement()?;
            return Ok(self.arena.alloc(Node::new(NodeKind::While { cond, body }, None, pos)));
        }

        if self.consume_keyword(Keyword::Do).is_some() {
            let body = self.statement()?;
            self.expect_keyword(Keyword::While)?;
            self.expect_punct(Punct::LParen)?;
            let cond = self.expr()?;
            self.expect_punct(Punct::RParen)?;
            self.expect_punct(Punct::Semicolon)?;
            return Ok(self.arena.alloc(Node::new(NodeKind::DoWhile { cond, body }, None, pos)));
        }

        if self.consume_keyword(Keyword::For).is_some() {
            return self.parse_for();
        }

        if self.consume_keyword(Keyword::Switch).is_some() {
            self.expect_punct(Punct::LParen)?;
            let cond = self.expr()?;
            self.expect_punct(Punct::RParen)?;
            self.enter_switch();
            let body = self.statement()?;
            let frame = self.leave_switch();
            return Ok(self.arena.alloc(Node::new(
                NodeKind::Switch {
                    cond,
                    body,
                    cases: std::cell::RefCell::new(frame.cases),
                    default_case: std::cell::Cell::new(frame.default_case),
                },
                None,
                pos,
            )));
        }

        if self.consume_keyword(Keyword::Case).is_some() {
            let value = self.expect_constant_expr()?;
            self.expect_punct(Punct::Colon)?;
            let body = self.statement()?;
            let node = self.arena.alloc(Node::new(NodeKind::Case { value, body }, None, pos));
            self.register_case(node, pos)?;
            return Ok(node);
        }

        if self.consume_keyword(Keyword::Default).is_some() {
            self.expect_punct(Punct::Colon)?;
            let body = self.statement()?;
            let node = self.arena.alloc(Node::new(NodeKind::Default { body }, None, pos));
            self.register_default(node, pos)?;
            return Ok(node);
        }

        if self.consume_keyword(Keyword::Break).is_some() {
            self.expect_punct(Punct::Semicolon)?;
            return Ok(self.arena.alloc(Node::new(NodeKind::Break, None, pos)));
        }

        if self.consume_keyword(Keyword::Continue).is_some() {
            self.expect_punct(Punct::Semicolon)?;
            return Ok(self.arena.alloc(Node::new(NodeKind::Continue, None, pos)));
        }

        if self.consume_keyword(Keyword::Goto).is_some() {
            let (name, _) = self.expect_ident()?;
            self.expect_punct(Punct::Semicolon)?;
            self.scopes.declare_label(name, false)?;
            return Ok(self.arena.alloc(Node::new(NodeKind::Goto(name), None, pos)));
        }

        // labeled statement: `ident :` — only when followed by `:` so a
        // plain expression-statement starting with an identifier still
        // parses as an expression.
        if let TokenKind::Ident(sym) = self.peek().kind {
            if matches!(
                self.peek_at(1).map(|t| t.kind),
                Some(TokenKind::Punct(Punct::Colon))
            ) {
                self.advance();
                self.advance();
                self.scopes.declare_label(sym, true)?;
                let stmt = self.statement()?;
                return Ok(self
                    .arena
                    .alloc(Node::new(NodeKind::Label { name: sym, stmt }, None, pos)));
            }
        }

        let e = self.expr()?;
        self.expect_punct(Punct::Semicolon)?;
        Ok(e)
    }

    /// `for ( init ; cond? ; incr? ) stmt`. The init declaration is *not*
    /// given its own scope — it binds in the scope enclosing the loop, so
    /// `for(int i = 10; ...)` can shadow an outer `i` for the statement's
    /// lifetime but the binding also outlives the loop, matching the
    /// decision recorded for end-to-end scenario 6.
    fn parse_for(&mut self) -> Result<&'a Node<'a>> {
        let pos = self.peek().span;
        self.expect_punct(Punct::LParen)?;

        let init = if self.peek().is_punct(Punct::Semicolon) {
            None
        } else if self.starts_declaration() {
            Some(self.parse_local_declaration_no_semicolon_consumed()?)
        } else {
            let e = self.expr()?;
            self.expect_punct(Punct::Semicolon)?;
            Some(e)
        };

        let cond = if self.peek().is_punct(Punct::Semicolon) {
            None
        } else {
            Some(self.expr()?)
        };
        self.expect_punct(Punct::Semicolon)?;

        let incr = if self.peek().is_punct(Punct::RParen) {
            None
        } else {
            Some(self.expr()?)
        };
        self.expect_punct(Punct::RParen)?;

        let body = self.statement()?;
        Ok(self.arena.alloc(Node::new(
            NodeKind::For { init, cond, incr, body },
            None,
            pos,
        )))
    }

    /// Same as `parse_local_declaration` but the semicolon was already
    /// consumed by its caller's shared `;`-handling for the `for` header,
    /// so this variant consumes its own.
    fn parse_local_declaration_no_semicolon_consumed(&mut self) -> Result<&'a Node<'a>> {
        self.parse_local_declaration()
    }

    fn expect_keyword(&mut self, k: Keyword) -> Result<()> {
        if self.consume_keyword(k).is_some() {
            Ok(())
        } else {
            Err(CompileError::syntactic(format!("expected keyword {k:?}"), self.peek().span))
        }
    }
}
