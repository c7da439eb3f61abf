//! Expression parsing: standard C precedence climbing from comma down to
//! primary, with pointer-arithmetic scaling and constant-adjacent helpers
//! delegated to [`crate::ast`].

use super::Parser;
use crate::ast::{self, Node, NodeKind};
use crate::builtins;
use crate::error::{CompileError, Result};
use crate::scope::{Ident, IdentKind};
use crate::span::Span;
use crate::token::{Keyword, Punct, TokenKind};
use crate::types::{is_integer_type, Type, TypeKind};
use std::rc::Rc;

impl<'a> Parser<'a> {
    pub(super) fn expr(&mut self) -> Result<&'a Node<'a>> {
        let mut node = self.assign()?;
        while self.consume_punct(Punct::Comma).is_some() {
            let pos = node.pos;
            let rhs = self.assign()?;
            let ty = rhs.ty().cloned();
            node = self.arena.alloc(Node::new(NodeKind::Comma(node, rhs), ty, pos));
        }
        Ok(node)
    }

    pub(super) fn assign(&mut self) -> Result<&'a Node<'a>> {
        let lhs = self.conditional()?;
        let pos = self.peek().span;

        macro_rules! compound {
            ($op:ident) => {{
                self.advance();
                let rhs = self.assign()?;
                let computed = ast::$op(self.arena, lhs, rhs, pos)?;
                let ty = computed.ty().cloned();
                Ok(self.arena.alloc(Node::new(NodeKind::Assign { lhs, rhs: computed }, ty, pos)))
            }};
        }
        macro_rules! compound_same_type {
            ($make:expr) => {{
                self.advance();
                let rhs = self.assign()?;
                let computed = ast::new_binary_same_type(self.arena, $make, lhs, rhs, pos)?;
                let ty = computed.ty().cloned();
                Ok(self.arena.alloc(Node::new(NodeKind::Assign { lhs, rhs: computed }, ty, pos)))
            }};
        }

        if self.consume_punct(Punct::Assign).is_some() {
            let rhs = self.assign()?;
            let ty = lhs.ty().cloned();
            return Ok(self.arena.alloc(Node::new(NodeKind::Assign { lhs, rhs }, ty, pos)));
        }
        match self.peek().kind {
            TokenKind::Punct(Punct::PlusEq) => return compound!(new_add),
            TokenKind::Punct(Punct::MinusEq) => return compound!(new_sub),
            TokenKind::Punct(Punct::StarEq) => return compound_same_type!(NodeKind::Mul),
            TokenKind::Punct(Punct::SlashEq) => return compound_same_type!(NodeKind::Div),
            TokenKind::Punct(Punct::PercentEq) => return compound_same_type!(NodeKind::Mod),
            TokenKind::Punct(Punct::AmpEq) => return compound_same_type!(NodeKind::BitAnd),
            TokenKind::Punct(Punct::PipeEq) => return compound_same_type!(NodeKind::BitOr),
            TokenKind::Punct(Punct::CaretEq) => return compound_same_type!(NodeKind::BitXor),
            TokenKind::Punct(Punct::ShlEq) => return compound_same_type!(NodeKind::Shl),
            TokenKind::Punct(Punct::ShrEq) => return compound_same_type!(NodeKind::Shr),
            _ => {}
        }
        Ok(lhs)
    }

    fn conditional(&mut self) -> Result<&'a Node<'a>> {
        let cond = self.logic_or()?;
        if self.consume_punct(Punct::Question).is_some() {
            let pos = cond.pos;
            let then = self.expr()?;
            self.expect_punct(Punct::Colon)?;
            let els = self.conditional()?;
            let ty = then.ty().cloned().or_else(|| els.ty().cloned());
            return Ok(self.arena.alloc(Node::new(NodeKind::CondExpr { cond, then, els }, ty, pos)));
        }
        Ok(cond)
    }

    fn logic_or(&mut self) -> Result<&'a Node<'a>> {
        let mut node = self.logic_and()?;
        while self.consume_punct(Punct::OrOr).is_some() {
            let pos = node.pos;
            let rhs = self.logic_and()?;
            self.check_scalar_operands(node, rhs, pos)?;
            node = ast::new_int_result(self.arena, &self.prims, NodeKind::LogicOr(node, rhs), pos);
        }
        Ok(node)
    }

    fn logic_and(&mut self) -> Result<&'a Node<'a>> {
        let mut node = self.bit_or()?;
        while self.consume_punct(Punct::AndAnd).is_some() {
            let pos = node.pos;
            let rhs = self.bit_or()?;
            self.check_scalar_operands(node, rhs, pos)?;
            node = ast::new_int_result(self.arena, &self.prims, NodeKind::LogicAnd(node, rhs), pos);
        }
        Ok(node)
    }

    fn bit_or(&mut self) -> Result<&'a Node<'a>> {
        let mut node = self.bit_xor()?;
        while self.consume_punct(Punct::Pipe).is_some() {
            let pos = node.pos;
            let rhs = self.bit_xor()?;
            node = ast::new_binary_same_type(self.arena, NodeKind::BitOr, node, rhs, pos)?;
        }
        Ok(node)
    }

    fn bit_xor(&mut self) -> Result<&'a Node<'a>> {
        let mut node = self.bit_and()?;
        while self.consume_punct(Punct::Caret).is_some() {
            let pos = node.pos;
            let rhs = self.bit_and()?;
            node = ast::new_binary_same_type(self.arena, NodeKind::BitXor, node, rhs, pos)?;
        }
        Ok(node)
    }

    fn bit_and(&mut self) -> Result<&'a Node<'a>> {
        let mut node = self.equality()?;
        while self.consume_punct(Punct::Amp).is_some() {
            let pos = node.pos;
            let rhs = self.equality()?;
            node = ast::new_binary_same_type(self.arena, NodeKind::BitAnd, node, rhs, pos)?;
        }
        Ok(node)
    }

    fn equality(&mut self) -> Result<&'a Node<'a>> {
        let mut node = self.relational()?;
        loop {
            let pos = node.pos;
            if self.consume_punct(Punct::Eq).is_some() {
                let rhs = self.relational()?;
                self.check_scalar_operands(node, rhs, pos)?;
                node = ast::new_int_result(self.arena, &self.prims, NodeKind::Eq(node, rhs), pos);
            } else if self.consume_punct(Punct::NotEq).is_some() {
                let rhs = self.relational()?;
                self.check_scalar_operands(node, rhs, pos)?;
                node = ast::new_int_result(self.arena, &self.prims, NodeKind::NotEq(node, rhs), pos);
            } else {
                break;
            }
        }
        Ok(node)
    }

    /// `>`/`>=` are normalized by swapping operands onto `</<=`, matching the
    /// usual single-direction comparison lowering.
    fn relational(&mut self) -> Result<&'a Node<'a>> {
        let mut node = self.shift()?;
        loop {
            let pos = node.pos;
            if self.consume_punct(Punct::Lt).is_some() {
                let rhs = self.shift()?;
                self.check_scalar_operands(node, rhs, pos)?;
                node = ast::new_int_result(self.arena, &self.prims, NodeKind::Lt(node, rhs), pos);
            } else if self.consume_punct(Punct::Le).is_some() {
                let rhs = self.shift()?;
                self.check_scalar_operands(node, rhs, pos)?;
                node = ast::new_int_result(self.arena, &self.prims, NodeKind::Le(node, rhs), pos);
            } else if self.consume_punct(Punct::Gt).is_some() {
                let rhs = self.shift()?;
                self.check_scalar_operands(node, rhs, pos)?;
                node = ast::new_int_result(self.arena, &self.prims, NodeKind::Lt(rhs, node), pos);
            } else if self.consume_punct(Punct::Ge).is_some() {
                let rhs = self.shift()?;
                self.check_scalar_operands(node, rhs, pos)?;
                node = ast::new_int_result(self.arena, &self.prims, NodeKind::Le(rhs, node), pos);
            } else {
                break;
            }
        }
        Ok(node)
    }

    fn shift(&mut self) -> Result<&'a Node<'a>> {
        let mut node = self.additive()?;
        loop {
            let pos = node.pos;
            if self.consume_punct(Punct::Shl).is_some() {
                let rhs = self.additive()?;
                node = ast::new_binary_same_type(self.arena, NodeKind::Shl, node, rhs, pos)?;
            } else if self.consume_punct(Punct::Shr).is_some() {
                let rhs = self.additive()?;
                node = ast::new_binary_same_type(self.arena, NodeKind::Shr, node, rhs, pos)?;
            } else {
                break;
            }
        }
        Ok(node)
    }

    fn additive(&mut self) -> Result<&'a Node<'a>> {
        let mut node = self.multiplicative()?;
        loop {
            let pos = node.pos;
            if self.consume_punct(Punct::Plus).is_some() {
                let rhs = self.multiplicative()?;
                node = ast::new_add(self.arena, node, rhs, pos)?;
            } else if self.consume_punct(Punct::Minus).is_some() {
                let rhs = self.multiplicative()?;
                node = ast::new_sub(self.arena, node, rhs, pos)?;
            } else {
                break;
            }
        }
        Ok(node)
    }

    fn multiplicative(&mut self) -> Result<&'a Node<'a>> {
        let mut node = self.cast()?;
        loop {
            let pos = node.pos;
            if self.consume_punct(Punct::Star).is_some() {
                let rhs = self.cast()?;
                node = ast::new_binary_same_type(self.arena, NodeKind::Mul, node, rhs, pos)?;
            } else if self.consume_punct(Punct::Slash).is_some() {
                let rhs = self.cast()?;
                node = ast::new_binary_same_type(self.arena, NodeKind::Div, node, rhs, pos)?;
            } else if self.consume_punct(Punct::Percent).is_some() {
                let rhs = self.cast()?;
                node = ast::new_binary_same_type(self.arena, NodeKind::Mod, node, rhs, pos)?;
            } else {
                break;
            }
        }
        Ok(node)
    }

    /// `( type-name ) cast-expression`, falling through to `unary` when the
    /// parenthesized contents don't start a type.
    fn cast(&mut self) -> Result<&'a Node<'a>> {
        if self.peek().is_punct(Punct::LParen) && self.type_starts_at(1) {
            let pos = self.peek().span;
            self.advance();
            let ty = self.parse_type_name()?;
            self.expect_punct(Punct::RParen)?;
            let operand = self.cast()?;
            return Ok(self.arena.alloc(Node::new(NodeKind::Cast(operand), Some(ty), pos)));
        }
        self.unary()
    }

    fn unary(&mut self) -> Result<&'a Node<'a>> {
        let pos = self.peek().span;

        if self.consume_punct(Punct::Plus).is_some() {
            return self.cast();
        }
        if self.consume_punct(Punct::Minus).is_some() {
            let operand = self.cast()?;
            let zero = self.arena.alloc(Node::new(NodeKind::Num(0), Some(self.prims.int.clone()), pos));
            return ast::new_sub(self.arena, zero, operand, pos);
        }
        if self.consume_punct(Punct::Amp).is_some() {
            let operand = self.cast()?;
            let ty = operand.ty().cloned().ok_or_else(|| CompileError::internal("untyped operand", pos))?;
            return Ok(self.arena.alloc(Node::new(NodeKind::Addr(operand), Some(Type::pointer_to(ty)), pos)));
        }
        if self.consume_punct(Punct::Star).is_some() {
            let operand = self.cast()?;
            let ty = operand.ty().ok_or_else(|| CompileError::internal("untyped operand", pos))?;
            if ty.kind() != TypeKind::Pointer && ty.kind() != TypeKind::Array {
                return Err(CompileError::type_error("dereferencing a non-pointer", pos));
            }
            let pointee = ty.base().ok_or_else(|| CompileError::internal("pointer with no base type", pos))?;
            return Ok(self.arena.alloc(Node::new(NodeKind::Deref(operand), Some(pointee), pos)));
        }
        if self.consume_punct(Punct::Not).is_some() {
            let operand = self.cast()?;
            ast::assert_integer_operand(
                operand.ty().ok_or_else(|| CompileError::internal("untyped operand", pos))?,
                pos,
            )?;
            return Ok(ast::new_int_result(self.arena, &self.prims, NodeKind::Not(operand), pos));
        }
        if self.consume_punct(Punct::Tilde).is_some() {
            let operand = self.cast()?;
            ast::assert_integer_operand(
                operand.ty().ok_or_else(|| CompileError::internal("untyped operand", pos))?,
                pos,
            )?;
            let ty = operand.ty().cloned();
            return Ok(self.arena.alloc(Node::new(NodeKind::BitNot(operand), ty, pos)));
        }
        if self.consume_punct(Punct::PlusPlus).is_some() {
            let operand = self.cast()?;
            return self.new_prefix_inc_dec(operand, 1, pos);
        }
        if self.consume_punct(Punct::MinusMinus).is_some() {
            let operand = self.cast()?;
            return self.new_prefix_inc_dec(operand, -1, pos);
        }
        if self.consume_keyword(Keyword::Sizeof).is_some() {
            return self.sizeof_expr(pos);
        }
        self.postfix()
    }

    fn sizeof_expr(&mut self, pos: Span) -> Result<&'a Node<'a>> {
        if self.peek().is_punct(Punct::LParen) && self.type_starts_at(1) {
            self.advance();
            let ty = self.parse_type_name()?;
            self.expect_punct(Punct::RParen)?;
            return Ok(self.int_node(ast::sizeof_type(&ty), pos));
        }
        let operand = self.unary()?;
        let ty = operand.ty().ok_or_else(|| CompileError::internal("untyped operand", pos))?;
        Ok(self.int_node(ast::sizeof_type(ty), pos))
    }

    fn postfix(&mut self) -> Result<&'a Node<'a>> {
        let mut node = self.primary()?;
        loop {
            let pos = self.peek().span;
            if self.consume_punct(Punct::LBracket).is_some() {
                let idx = self.expr()?;
                self.expect_punct(Punct::RBracket)?;
                let sum = ast::new_add(self.arena, node, idx, pos)?;
                let ty = sum.ty().ok_or_else(|| CompileError::internal("untyped operand", pos))?;
                let pointee = ty
                    .base()
                    .ok_or_else(|| CompileError::type_error("subscripting a non-pointer", pos))?;
                node = self.arena.alloc(Node::new(NodeKind::Deref(sum), Some(pointee), pos));
            } else if self.consume_punct(Punct::Dot).is_some() {
                node = self.member_access(node, pos)?;
            } else if self.consume_punct(Punct::Arrow).is_some() {
                let ty = node.ty().ok_or_else(|| CompileError::internal("untyped operand", pos))?;
                if ty.kind() != TypeKind::Pointer {
                    return Err(CompileError::type_error("-> on a non-pointer", pos));
                }
                let pointee = ty.base().ok_or_else(|| CompileError::internal("pointer with no base type", pos))?;
                let deref = self.arena.alloc(Node::new(NodeKind::Deref(node), Some(pointee), pos));
                node = self.member_access(deref, pos)?;
            } else if self.consume_punct(Punct::PlusPlus).is_some() {
                node = self.new_postfix_inc_dec(node, true, pos)?;
            } else if self.consume_punct(Punct::MinusMinus).is_some() {
                node = self.new_postfix_inc_dec(node, false, pos)?;
            } else {
                break;
            }
        }
        Ok(node)
    }

    fn member_access(&mut self, base: &'a Node<'a>, pos: Span) -> Result<&'a Node<'a>> {
        let (name, mspan) = self.expect_ident()?;
        let ty = base.ty().ok_or_else(|| CompileError::internal("untyped operand", pos))?;
        if ty.is_incomplete() {
            return Err(CompileError::type_error("member access on an incomplete type", mspan));
        }
        let member = ty
            .get_member(name)
            .ok_or_else(|| CompileError::name_resolution("no such member", mspan))?;
        Ok(self
            .arena
            .alloc(Node::new(NodeKind::Member { base, offset: member.offset }, Some(member.ty), pos)))
    }

    /// `x++`/`x--` lowers to `(t = x, (x = x ± 1, t))` for a hidden
    /// temporary `t` of `x`'s type, declared in a scope opened and closed
    /// around just this expression — `x` itself is evaluated once, so no
    /// side effect inside it is duplicated. `t` always reuses the single
    /// reserved name `tmp`, which is safe because each temporary's scope is
    /// entered and left before parsing moves on to the next one.
    fn new_postfix_inc_dec(&mut self, lhs: &'a Node<'a>, increment: bool, pos: Span) -> Result<&'a Node<'a>> {
        let ty = lhs.ty().cloned().ok_or_else(|| CompileError::internal("untyped operand", pos))?;
        self.scopes.enter(false);
        let tmp_sym = self
            .interner
            .lookup("tmp")
            .ok_or_else(|| CompileError::internal("missing prelude identifier 'tmp'", pos))?;
        let tmp_ident = self.scopes.declare_local(tmp_sym, pos, ty.clone())?;
        tmp_ident.offset.set(self.scopes.alloc_local(ty.size()));
        let tmp_var = self.arena.alloc(Node::new(NodeKind::Var(tmp_sym), Some(ty.clone()), pos));

        let save = self
            .arena
            .alloc(Node::new(NodeKind::Assign { lhs: tmp_var, rhs: lhs }, Some(ty.clone()), pos));

        let one = self.int_node(1, pos);
        let stepped = if increment {
            ast::new_add(self.arena, lhs, one, pos)?
        } else {
            ast::new_sub(self.arena, lhs, one, pos)?
        };
        let stepped_ty = stepped.ty().cloned();
        let bump = self.arena.alloc(Node::new(NodeKind::Assign { lhs, rhs: stepped }, stepped_ty, pos));

        let inner = self.arena.alloc(Node::new(NodeKind::Comma(bump, tmp_var), Some(ty.clone()), pos));
        let result = self.arena.alloc(Node::new(NodeKind::Comma(save, inner), Some(ty), pos));
        self.scopes.leave();
        Ok(result)
    }

    /// `++x`/`--x` lowers to `x = x + n`, evaluating the lvalue once.
    fn new_prefix_inc_dec(&mut self, lhs: &'a Node<'a>, addend: i64, pos: Span) -> Result<&'a Node<'a>> {
        let delta = self.int_node(addend, pos);
        let added = ast::new_add(self.arena, lhs, delta, pos)?;
        let ty = added.ty().cloned();
        Ok(self.arena.alloc(Node::new(NodeKind::Assign { lhs, rhs: added }, ty, pos)))
    }

    fn primary(&mut self) -> Result<&'a Node<'a>> {
        let tok = *self.peek();
        let pos = tok.span;

        if self.consume_punct(Punct::LParen).is_some() {
            let node = self.expr()?;
            self.expect_punct(Punct::RParen)?;
            return Ok(node);
        }

        if let TokenKind::IntLiteral(v) = tok.kind {
            self.advance();
            return Ok(self.int_node(v, pos));
        }

        if let TokenKind::CharLiteral(b) = tok.kind {
            self.advance();
            return Ok(self.int_node(b as i64, pos));
        }

        if let TokenKind::StringLiteral(content) = tok.kind {
            self.advance();
            return Ok(self.string_literal_node(content, pos));
        }

        if let TokenKind::Ident(sym) = tok.kind {
            let text = self.text_of(sym).to_string();
            match text.as_str() {
                "__builtin_va_start" => return self.parse_va_start(pos),
                "__builtin_va_arg" => return self.parse_va_arg(pos),
                "__builtin_va_end" => return self.parse_va_end(pos),
                _ => {}
            }
            self.advance();
            if self.peek().is_punct(Punct::LParen) {
                return self.parse_call(sym, pos);
            }
            return self.resolve_ident(sym, pos);
        }

        Err(CompileError::syntactic("expected an expression", pos))
    }

    fn parse_call(&mut self, callee: crate::intern::Symbol, pos: Span) -> Result<&'a Node<'a>> {
        self.expect_punct(Punct::LParen)?;
        let mut args = Vec::new();
        if !self.peek().is_punct(Punct::RParen) {
            loop {
                args.push(self.assign()?);
                if self.consume_punct(Punct::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect_punct(Punct::RParen)?;

        let ident = self
            .scopes
            .find_ident(callee)
            .filter(|id| id.kind == IdentKind::Function)
            .ok_or_else(|| CompileError::name_resolution("call to an undeclared function", pos))?;
        let ty = ident.ty();
        Ok(self.arena.alloc(Node::new(NodeKind::FuncCall { callee, args }, Some(ty), pos)))
    }

    fn resolve_ident(&mut self, sym: crate::intern::Symbol, pos: Span) -> Result<&'a Node<'a>> {
        let ident = self
            .scopes
            .find_ident(sym)
            .ok_or_else(|| CompileError::name_resolution("use of an undeclared identifier", pos))?;
        if ident.kind == IdentKind::EnumConst {
            return Ok(self.int_node(ident.val.get(), pos));
        }
        Ok(self.arena.alloc(Node::new(NodeKind::Var(sym), Some(ident.ty()), pos)))
    }

    /// `__builtin_va_start(ap, last)` lowers to `*ap = *(va_elem*)__va_area__`,
    /// copying the callee's implicit `__va_area__` record (built by the
    /// calling convention's register-save sequence) into the caller-visible
    /// `va_list`. `last` is parsed and discarded — it names the last fixed
    /// parameter, which only matters to a register-save sequence that reads
    /// it positionally, and this front-end generates no such sequence.
    fn parse_va_start(&mut self, pos: Span) -> Result<&'a Node<'a>> {
        self.advance();
        self.expect_punct(Punct::LParen)?;
        let ap = self.assign()?;
        self.expect_punct(Punct::Comma)?;
        let _last = self.assign()?;
        self.expect_punct(Punct::RParen)?;

        let ap_ty = ap.ty().ok_or_else(|| CompileError::internal("untyped operand", pos))?;
        let va_elem_ty = ap_ty
            .base()
            .ok_or_else(|| CompileError::type_error("va_start's first argument must be a va_list", pos))?;
        let lhs = self.arena.alloc(Node::new(NodeKind::Deref(ap), Some(va_elem_ty.clone()), pos));

        let va_area = self.current_va_area().ok_or_else(|| {
            CompileError::name_resolution("__builtin_va_start used outside a variadic function", pos)
        })?;
        let va_area_node = self.arena.alloc(Node::new(NodeKind::Var(va_area.name), Some(va_area.ty()), pos));
        let cast = self
            .arena
            .alloc(Node::new(NodeKind::Cast(va_area_node), Some(self.va_list_ty.clone()), pos));
        let rhs = self.arena.alloc(Node::new(NodeKind::Deref(cast), Some(va_elem_ty.clone()), pos));

        Ok(self.arena.alloc(Node::new(NodeKind::Assign { lhs, rhs }, Some(va_elem_ty), pos)))
    }

    /// `__builtin_va_end(ap)` has no effect in this calling convention — the
    /// original likewise lowers it to a no-op node.
    fn parse_va_end(&mut self, pos: Span) -> Result<&'a Node<'a>> {
        self.advance();
        self.expect_punct(Punct::LParen)?;
        let _ap = self.assign()?;
        self.expect_punct(Punct::RParen)?;
        Ok(self.arena.alloc(Node::new(NodeKind::NoOp, None, pos)))
    }

    /// `__builtin_va_arg(ap, type)` lowers to
    /// `(gp_offset += 8, *(long*)(reg_save_area + (gp_offset - 8)))`: read
    /// the next saved argument through `reg_save_area` at the offset
    /// `gp_offset` names, then advance `gp_offset` past it. Only integer
    /// types are supported, matching the original's argument-passing-only
    /// implementation.
    fn parse_va_arg(&mut self, pos: Span) -> Result<&'a Node<'a>> {
        self.advance();
        self.expect_punct(Punct::LParen)?;
        let ap = self.assign()?;
        self.expect_punct(Punct::Comma)?;
        let ty = self.parse_type_name()?;
        self.expect_punct(Punct::RParen)?;

        if !is_integer_type(&ty) {
            return Err(CompileError::type_error(
                "__builtin_va_arg to a non-integer type is not implemented",
                pos,
            ));
        }

        let ap_ty = ap.ty().ok_or_else(|| CompileError::internal("untyped operand", pos))?;
        let va_elem_ty = ap_ty
            .base()
            .ok_or_else(|| CompileError::type_error("va_arg's first argument must be a va_list", pos))?;
        let elem = self.arena.alloc(Node::new(NodeKind::Deref(ap), Some(va_elem_ty.clone()), pos));

        let gp_member = builtins::require_member(&va_elem_ty, self.va_elem_members.gp_offset, "gp_offset", pos)?;
        let reg_member =
            builtins::require_member(&va_elem_ty, self.va_elem_members.reg_save_area, "reg_save_area", pos)?;

        let gp_offset_node = self.arena.alloc(Node::new(
            NodeKind::Member { base: elem, offset: gp_member.offset },
            Some(gp_member.ty.clone()),
            pos,
        ));
        let reg_save_area_node = self.arena.alloc(Node::new(
            NodeKind::Member { base: elem, offset: reg_member.offset },
            Some(reg_member.ty.clone()),
            pos,
        ));

        let eight = self.int_node(8, pos);
        let bumped = ast::new_add(self.arena, gp_offset_node, eight, pos)?;
        let gp_offset_inc = self.arena.alloc(Node::new(
            NodeKind::Assign { lhs: gp_offset_node, rhs: bumped },
            Some(gp_member.ty.clone()),
            pos,
        ));

        let eight_again = self.int_node(8, pos);
        let gp_minus_8 = ast::new_sub(self.arena, gp_offset_node, eight_again, pos)?;
        let calc_add = ast::new_add(self.arena, reg_save_area_node, gp_minus_8, pos)?;

        let long_ptr = Type::pointer_to(self.prims.long.clone());
        let cast_adr = self.arena.alloc(Node::new(NodeKind::Cast(calc_add), Some(long_ptr), pos));
        let va_arg_node = self.arena.alloc(Node::new(NodeKind::Deref(cast_adr), Some(self.prims.long.clone()), pos));

        Ok(self
            .arena
            .alloc(Node::new(NodeKind::Comma(gp_offset_inc, va_arg_node), Some(self.prims.long.clone()), pos)))
    }

    fn int_node(&self, v: i64, pos: Span) -> &'a Node<'a> {
        self.arena.alloc(Node::new(NodeKind::Num(v), Some(self.prims.int.clone()), pos))
    }

    /// Every string literal is also recorded as a synthetic global so a
    /// later code generator could emit its storage; the front-end itself
    /// only needs the symbol and the computed array type.
    fn string_literal_node(&mut self, content: crate::intern::Symbol, pos: Span) -> &'a Node<'a> {
        let len = self.interner.resolve(content).len() as i64 + 1;
        let ty = Type::array_of(self.prims.char_.clone(), len);
        let ident = Rc::new(Ident::new(IdentKind::GlobalVar, content, pos, ty.clone()));
        ident.is_static.set(true);
        self.string_literals.push(ident);
        self.arena.alloc(Node::new(NodeKind::Var(content), Some(ty), pos))
    }

    fn check_scalar_operands(&self, lhs: &Node, rhs: &Node, pos: Span) -> Result<()> {
        let lt = lhs.ty().ok_or_else(|| CompileError::internal("untyped operand", pos))?;
        let rt = rhs.ty().ok_or_else(|| CompileError::internal("untyped operand", pos))?;
        if !is_integer_type(lt) || !is_integer_type(rt) {
            return Err(CompileError::type_error("operands must be scalar (integer or pointer)", pos));
        }
        Ok(())
    }

    fn type_starts_at(&self, offset: usize) -> bool {
        match self.peek_at(offset).map(|t| t.kind) {
            Some(TokenKind::Keyword(
                Keyword::Void
                | Keyword::Bool
                | Keyword::Char
                | Keyword::Short
                | Keyword::Int
                | Keyword::Long
                | Keyword::Signed
                | Keyword::Unsigned
                | Keyword::Struct
                | Keyword::Union
                | Keyword::Enum
                | Keyword::Const
                | Keyword::Volatile
                | Keyword::Restrict,
            )) => true,
            Some(TokenKind::Ident(sym)) => self.scopes.find_typedef(sym).is_some(),
            _ => false,
        }
    }

    /// Parses a type-name: a `declspec` (storage-class keywords are
    /// tolerated but meaningless here) followed by an abstract declarator
    /// (`*`* and at most one `[N]`, no identifier).
    pub(super) fn parse_type_name(&mut self) -> Result<Type> {
        let spec = self.declspec()?;
        let mut ty = spec.ty;
        while self.consume_punct(Punct::Star).is_some() {
            ty = Type::pointer_to(ty);
        }
        if self.consume_punct(Punct::LBracket).is_some() {
            let (len, _) = self.expect_num()?;
            self.expect_punct(Punct::RBracket)?;
            ty = Type::array_of(ty, len);
        }
        Ok(ty)
    }
}
