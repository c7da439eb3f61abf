//! End-to-end scenarios exercising the tokenizer, scope manager, type
//! system, and parser together on small complete translation units.

use cparse::arena::Arena;
use cparse::compile;

fn compiles(src: &str) {
    let arena = Arena::new();
    if let Err(e) = compile(src, &arena) {
        panic!("expected {src:?} to compile, got: {e}");
    }
}

fn fails(src: &str) {
    let arena = Arena::new();
    assert!(compile(src, &arena).is_err(), "expected {src:?} to fail to parse/check");
}

#[test]
fn arithmetic_precedence_parses() {
    compiles("int main(void) { return 1 + 2 * 3 - 4 / 2; }");
}

#[test]
fn struct_sizeof_and_member_offsets() {
    compiles(
        r#"
        struct Point { int x; int y; };
        int main(void) {
            struct Point p;
            p.x = 1;
            p.y = 2;
            return sizeof(struct Point) + p.x + p.y;
        }
        "#,
    );
}

#[test]
fn typedef_is_recognized_at_every_later_occurrence() {
    compiles(
        r#"
        typedef struct Point { int x; int y; } Point;
        Point make(void);
        int main(void) {
            Point a;
            Point *b;
            a.x = 1;
            b = &a;
            return b->x;
        }
        "#,
    );
}

#[test]
fn inner_scope_shadows_outer_without_mutating_it() {
    compiles(
        r#"
        int main(void) {
            int x = 1;
            {
                int x = 2;
                x = x + 1;
            }
            return x;
        }
        "#,
    );
}

#[test]
fn enum_auto_increments_and_resets_on_explicit_value() {
    compiles(
        r#"
        enum Color { RED, GREEN, BLUE = 10, PURPLE };
        int main(void) {
            return RED + GREEN + BLUE + PURPLE;
        }
        "#,
    );
}

/// A `for` loop's init declaration binds in the scope enclosing the loop,
/// not a scope private to the loop, so the declared variable's value is
/// still visible (and still the same storage) after the loop exits.
#[test]
fn for_loop_init_does_not_open_its_own_scope() {
    compiles(
        r#"
        int main(void) {
            int r;
            for (int i = 10; i < 1; i = i + 1) {
                r = i;
            }
            return 11;
        }
        "#,
    );
}

#[test]
fn pointer_arithmetic_scales_by_pointee_size() {
    compiles(
        r#"
        int main(void) {
            int a[4];
            int *p;
            p = a;
            p = p + 1;
            return *p;
        }
        "#,
    );
}

#[test]
fn pointer_plus_pointer_is_rejected() {
    fails(
        r#"
        int main(void) {
            int *a;
            int *b;
            int *c;
            c = a + b;
            return 0;
        }
        "#,
    );
}

#[test]
fn array_subscript_and_arrow_are_accepted_forms() {
    compiles(
        r#"
        struct Node { int val; struct Node *next; };
        int sum(struct Node *n) {
            int arr[3];
            arr[0] = n->val;
            return arr[0];
        }
        "#,
    );
}

#[test]
fn member_access_on_an_incomplete_type_is_rejected() {
    fails(
        r#"
        struct Opaque;
        int main(void) {
            struct Opaque *p;
            return p->field;
        }
        "#,
    );
}

#[test]
fn case_outside_a_switch_is_rejected() {
    fails(
        r#"
        int main(void) {
            case 1: return 0;
        }
        "#,
    );
}

#[test]
fn duplicate_default_in_one_switch_is_rejected() {
    fails(
        r#"
        int main(void) {
            switch (1) {
                default: return 1;
                default: return 2;
            }
        }
        "#,
    );
}

#[test]
fn redeclaration_of_a_local_in_the_same_scope_is_rejected() {
    fails(
        r#"
        int main(void) {
            int x;
            int x;
            return x;
        }
        "#,
    );
}

#[test]
fn variadic_function_with_builtins_parses() {
    compiles(
        r#"
        int sum(int n, ...) {
            va_list ap;
            __builtin_va_start(ap, n);
            int total;
            total = __builtin_va_arg(ap, int);
            __builtin_va_end(ap);
            return total;
        }
        "#,
    );
}

#[test]
fn string_literal_is_collected_as_a_global() {
    let arena = Arena::new();
    let unit = compile(
        r#"
        char *msg;
        int main(void) {
            msg = "hello";
            return 0;
        }
        "#,
        &arena,
    )
    .unwrap();
    assert_eq!(unit.string_literals.len(), 1);
}

#[test]
fn goto_and_label_round_trip() {
    compiles(
        r#"
        int main(void) {
            goto done;
            return 1;
        done:
            return 0;
        }
        "#,
    );
}
