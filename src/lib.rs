//! Tokenizer, scope manager, type system, and recursive-descent parser for
//! a C subset.
//!
//! The pipeline is: intern the built-in prelude names, lex the source into
//! a token vector, then hand the frozen interner and those tokens to the
//! [`parser::Parser`], which builds an arena-allocated AST while resolving
//! names and types as it goes. There is no code generator here — the
//! output is a checked AST, not assembly.
//!
//! ```no_run
//! use cparse::{compile, arena::Arena};
//!
//! let arena = Arena::new();
//! match compile("int main(void) { return 0; }", &arena) {
//!     Ok(unit) => { let _ = unit; }
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

pub mod arena;
pub mod ast;
pub mod builtins;
pub mod error;
pub mod intern;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod source;
pub mod span;
pub mod token;
pub mod types;

use arena::Arena;
use ast::Node;
use error::Result;
use intern::Interner;
use lexer::Lexer;
use parser::Parser;
use scope::Ident;
use types::Primitives;
use std::rc::Rc;

/// Identifiers the built-in prelude needs interned up front, independent of
/// whether the user's source text ever mentions them, so that later
/// `Interner::lookup` calls in the parser can rely on them existing.
const PRELUDE_IDENTS: &[&str] = &[
    "__builtin_va_elem",
    "va_list",
    "gp_offset",
    "fp_offset",
    "overflow_arg_area",
    "reg_save_area",
    "spill_area",
    "__va_area__",
    "tmp",
];

/// A fully parsed and type-checked translation unit: nothing but a handle
/// into the string literals collected while parsing, since the AST itself
/// is accessible through the function/global identifiers the parser leaves
/// behind in its scope. Intended to be extended by a downstream consumer
/// that needs the top-level declaration list; this crate's own callers
/// only need `compile` to succeed or report a [`error::CompileError`].
pub struct TranslationUnit<'a> {
    pub string_literals: Vec<Rc<Ident<'a>>>,
}

/// Lexes and parses `source`, returning the checked translation unit or the
/// first [`error::CompileError`] encountered.
///
/// `arena` must outlive the returned [`TranslationUnit`] since every AST
/// node and the scope chain reference it.
pub fn compile<'a>(source: &'a str, arena: &'a Arena<Node<'a>>) -> Result<TranslationUnit<'a>> {
    let mut interner = Interner::new();
    for name in PRELUDE_IDENTS {
        interner.intern(name);
    }
    let prims = Primitives::new();
    let (va_elem_ty, va_list_ty, va_elem_members) = builtins::register_builtins(&mut interner, &prims);

    let tokens = Lexer::new(source, &mut interner).tokenize()?;

    // `interner` is never mutated again past this point; the borrow above
    // ends here so it can be frozen into the shared reference the parser
    // and its returned AST both read from. Leaking it ties its lifetime to
    // the process rather than to any caller-held value, which is fine for
    // a front-end meant to run once per compiled file.
    let interner: &'a Interner = &*Box::leak(Box::new(interner));

    let mut parser = Parser::new(tokens, source, interner, arena, prims, va_elem_ty, va_list_ty, va_elem_members);
    parser.parse_translation_unit()?;
    Ok(TranslationUnit {
        string_literals: parser.string_literals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_trivial_function() {
        let arena = Arena::new();
        let unit = compile("int main(void) { return 0; }", &arena).unwrap();
        assert!(unit.string_literals.is_empty());
    }

    #[test]
    fn reports_a_syntax_error_with_a_span() {
        let arena = Arena::new();
        let err = compile("int main(void) { return 0 }", &arena).unwrap_err();
        assert_eq!(err.kind, error::CompileErrorKind::Syntactic);
    }

    #[test]
    fn collects_string_literals() {
        let arena = Arena::new();
        let unit = compile("char *s; void f(void) { s = \"hi\"; }", &arena).unwrap();
        assert_eq!(unit.string_literals.len(), 1);
    }
}
