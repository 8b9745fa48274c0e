//! IR-level properties of the lowering: frame records, qualified names,
//! static-link walking, short-circuit phis and terminator discipline.
//!
//! These tests build modules in-memory and inspect the printed IR; no
//! target machine or linker is involved.

use inkwell::context::Context;

use grace_lang::{driver::lower_to_module, error::CompilerError};

fn lower(source: &str) -> String {
    let context = Context::create();
    let module = lower_to_module(&context, source, "test").expect("source should lower");
    module.verify().unwrap_or_else(|message| {
        panic!(
            "module does not verify: {message}\n{}",
            module.print_to_string().to_string()
        )
    });
    module.print_to_string().to_string()
}

fn lower_err(source: &str) -> CompilerError {
    let context = Context::create();
    match lower_to_module(&context, source, "test") {
        Ok(module) => panic!(
            "expected lowering to fail, got:\n{}",
            module.print_to_string().to_string()
        ),
        Err(error) => error,
    }
}

/// The text of one defined function, from its `define` line to the
/// closing brace.
fn function_ir(ir: &str, symbol: &str) -> String {
    let needle = format!("@{symbol}(");
    for chunk in ir.split("\ndefine ") {
        let Some(first_line) = chunk.lines().next() else {
            continue;
        };
        if first_line.contains(&needle) {
            let end = chunk.find("\n}").map(|i| i + 2).unwrap_or(chunk.len());
            return chunk[..end].to_string();
        }
    }
    panic!("no definition of {symbol} in module:\n{ir}");
}

#[test]
fn constant_arithmetic_folds_into_the_call() {
    let ir = lower("fun main(): nothing { writeInteger(1+2); }");
    assert!(ir.contains("call void @writeInteger(i64 3)"), "{ir}");
}

#[test]
fn frame_records_lay_out_link_params_locals() {
    let ir = lower(
        "fun main(): nothing \
             var i: int; \
             fun g(a: int; ref c: char): nothing \
                 var m: int[3]; \
             { m[0] <- a; } \
         { g(i, \"x\"[0]); }",
    );
    // nested frame: static link, by-value scalar, by-ref pointer, array
    assert!(
        ir.contains("%frame.main.g = type { ptr, i64, ptr, [3 x i64] }"),
        "{ir}"
    );
    // top-level frame: no static link
    assert!(ir.contains("%frame.main = type { i64 }"), "{ir}");
}

#[test]
fn shadowed_nested_functions_get_distinct_symbols() {
    let ir = lower("fun f(): nothing fun f(): nothing fun f(): nothing {} {} {}");
    assert!(ir.contains("define void @f()"), "{ir}");
    assert!(ir.contains("define void @f.f(ptr"), "{ir}");
    assert!(ir.contains("define void @f.f.f(ptr"), "{ir}");
}

#[test]
fn nonlocal_write_walks_two_static_links() {
    let ir = lower(
        "fun f(): nothing \
             var c: char; \
             fun g(): nothing \
                 fun h(): nothing { c <- 'a'; } \
             { h(); } \
         { g(); }",
    );
    let h = function_ir(&ir, "f.g.h");
    // two loads of the link chain reach f's frame from h
    assert_eq!(
        h.matches("load ptr").count(),
        2,
        "expected exactly two link loads in:\n{h}"
    );

    let g = function_ir(&ir, "f.g");
    // h is g's child: its static link is g's own frame, no loads needed
    assert_eq!(
        g.matches("load ptr").count(),
        0,
        "expected no link loads in:\n{g}"
    );
}

#[test]
fn sibling_call_passes_the_callers_link() {
    let ir = lower(
        "fun main(): nothing \
             fun a(): nothing { ; } \
             fun b(): nothing { a(); } \
         { b(); }",
    );
    let b = function_ir(&ir, "main.b");
    // a's parent frame is main's, reached by one load of b's own link
    assert_eq!(b.matches("load ptr").count(), 1, "{b}");
    assert!(b.contains("call void @main.a(ptr"), "{b}");
}

#[test]
fn short_circuit_phi_joins_final_blocks() {
    let ir = lower(
        "fun main(): nothing \
             var a, b: int; \
         { if (a < 1 or b < 2) and b < 3 then ; }",
    );
    // the and's left operand finishes in the or's merge block, and that is
    // the block its phi edge must name
    let phi_line = ir
        .lines()
        .find(|line| line.contains("%and_result = phi i1"))
        .unwrap_or_else(|| panic!("no and phi in:\n{ir}"));
    assert!(phi_line.contains("%or_merge"), "{phi_line}");
}

#[test]
fn fully_returning_if_else_gets_a_dummy_merge_terminator() {
    let ir = lower(
        "fun main(): nothing \
             fun sign(x: int): int { \
                 if x < 0 then return 0 - 1; else return 1; \
             } \
         { writeInteger(sign(5)); }",
    );
    let sign = function_ir(&ir, "main.sign");
    assert!(sign.contains("if_merge:"), "{sign}");
    assert!(sign.contains("ret i64 0"), "{sign}");
}

#[test]
fn dead_code_does_not_change_the_module() {
    let with_dead_code = lower(
        "fun main(): nothing \
             fun sign(x: int): int { \
                 if x < 0 then return 0 - 1; else return 1; \
                 writeInteger(42); \
             } \
         { writeInteger(sign(5)); }",
    );
    let without = lower(
        "fun main(): nothing \
             fun sign(x: int): int { \
                 if x < 0 then return 0 - 1; else return 1; \
             } \
         { writeInteger(sign(5)); }",
    );
    assert_eq!(with_dead_code, without);
}

#[test]
fn statements_after_a_return_are_dropped() {
    let ir = lower(
        "fun main(): nothing \
             fun f(): int { return 1; writeInteger(9); } \
         { writeInteger(f()); }",
    );
    let f = function_ir(&ir, "main.f");
    assert!(!f.contains("writeInteger"), "{f}");
}

#[test]
fn missing_return_on_an_exit_path_is_a_codegen_error() {
    let error = lower_err(
        "fun main(): nothing \
             fun f(): int { if 1 < 2 then return 1; } \
         { writeInteger(f()); }",
    );
    match error {
        CompilerError::Codegen(codegen_error) => {
            assert!(codegen_error.message.contains("does not return a value"));
        }
        other => panic!("expected a codegen error, got {other:?}"),
    }
}

#[test]
fn entry_wrapper_calls_the_top_level_function() {
    let ir = lower("fun hello(): nothing { writeString(\"hi\"); }");
    assert!(ir.contains("define i32 @main()"), "{ir}");
    assert!(ir.contains("call void @hello()"), "{ir}");
    assert!(ir.contains("ret i32 0"), "{ir}");
}

#[test]
fn top_level_function_named_main_steps_aside() {
    let ir = lower("fun main(): nothing { ; }");
    assert!(ir.contains("define void @grace_main()"), "{ir}");
    assert!(ir.contains("define i32 @main()"), "{ir}");
    assert!(ir.contains("call void @grace_main()"), "{ir}");
}

#[test]
fn string_literals_become_private_nul_terminated_globals() {
    let ir = lower("fun main(): nothing { writeString(\"hi\\n\"); }");
    assert!(
        ir.contains("private unnamed_addr constant [4 x i8] c\"hi\\0A\\00\""),
        "{ir}"
    );
    assert!(ir.contains("call void @writeString(ptr"), "{ir}");
}

#[test]
fn owned_arrays_decay_to_first_element_pointers() {
    let ir = lower(
        "fun main(): nothing \
             var s: char[6]; \
         { readString(6, s); writeString(s); }",
    );
    let main = function_ir(&ir, "grace_main");
    // both calls pass a pointer into the frame-held array
    assert!(
        main.matches("getelementptr inbounds [6 x i8]").count() >= 2,
        "{main}"
    );
}

#[test]
fn open_array_parameters_pass_through_unchanged() {
    let ir = lower(
        "fun main(): nothing \
             var s: char[6]; \
             fun shout(ref t: char[]): nothing { writeString(t); } \
         { shout(s); }",
    );
    let shout = function_ir(&ir, "main.shout");
    // t is already a decayed pointer: forwarded without a further GEP
    assert!(!shout.contains("getelementptr inbounds [6 x i8]"), "{shout}");
    assert!(shout.contains("call void @writeString(ptr"), "{shout}");
}

#[test]
fn matrix_row_passes_as_subarray() {
    let ir = lower(
        "fun main(): nothing \
             var m: int[4][7]; \
             fun first(ref row: int[]): int { return row[0]; } \
         { writeInteger(first(m[2])); }",
    );
    let main = function_ir(&ir, "grace_main");
    assert!(main.contains("getelementptr inbounds [4 x [7 x i64]]"), "{main}");
    assert!(main.contains("call i64 @main.first(ptr"), "{main}");
}

#[test]
fn input_loop_scenario_lowers_and_verifies() {
    lower(
        "fun f(): nothing \
             var i: int; \
             fun input(ref i: int): nothing { i <- readInteger(); } \
         { \
             input(i); \
             while i # 0 do { \
                 if i < 5 then writeString(\"Less\"); \
                 else if i # 5 then writeString(\"More\"); \
                 else writeString(\"Equal\"); \
                 writeChar('\\n'); \
                 input(i); \
             } \
         }",
    );
}

#[test]
fn triple_reference_chain_lowers_and_verifies() {
    let ir = lower(
        "fun main(): nothing \
             var x: int; \
             fun outer(ref a: int): nothing \
                 fun middle(ref b: int): nothing \
                     fun inner(ref c: int): nothing { c <- c + 1; } \
                 { inner(b); } \
             { middle(a); } \
         { x <- 0; outer(x); outer(x); outer(x); }",
    );
    // every level simply forwards the pointer it was handed
    let inner = function_ir(&ir, "main.outer.middle.inner");
    assert!(inner.contains("define void @main.outer.middle.inner(ptr"), "{inner}");
}

#[test]
fn runtime_catalog_is_declared() {
    let ir = lower("fun main(): nothing { ; }");
    for declaration in [
        "declare void @writeInteger(i64)",
        "declare void @writeChar(i8)",
        "declare void @writeString(ptr)",
        "declare i64 @readInteger()",
        "declare i8 @readChar()",
        "declare void @readString(i64, ptr)",
        "declare i64 @ascii(i8)",
        "declare i8 @chr(i64)",
        "declare i64 @strlen(ptr)",
        "declare i64 @strcmp(ptr, ptr)",
        "declare void @strcpy(ptr, ptr)",
        "declare void @strcat(ptr, ptr)",
    ] {
        assert!(ir.contains(declaration), "missing '{declaration}' in:\n{ir}");
    }
}
