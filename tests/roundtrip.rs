//! Parse -> pretty-print -> re-parse must reproduce the tree exactly.

use grace_lang::{formatter::format_program, lexer::Lexer, parser::parse_program};

fn roundtrip(source: &str) {
    let tokens = Lexer::new(source).lex().expect("source should lex");
    let program = parse_program(tokens).expect("source should parse");

    let printed = format_program(&program).expect("formatting should succeed");
    let tokens = Lexer::new(&printed)
        .lex()
        .unwrap_or_else(|error| panic!("printed source does not lex: {error}\n{printed}"));
    let reparsed = parse_program(tokens)
        .unwrap_or_else(|error| panic!("printed source does not parse: {error}\n{printed}"));

    assert_eq!(program, reparsed, "tree changed across printing:\n{printed}");
}

#[test]
fn roundtrip_input_loop_program() {
    roundtrip(
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
fn roundtrip_declarations_arrays_and_partial_access() {
    roundtrip(
        "fun main(): nothing \
             var m: int[4][7]; \
             var s: char[20]; \
             fun sum(ref row: int[]; n: int): int; \
             fun sum(ref row: int[]; n: int): int \
                 var acc, k: int; \
             { \
                 acc <- 0; \
                 k <- 0; \
                 while k < n do { acc <- acc + row[k]; k <- k + 1; } \
                 return acc; \
             } \
         { \
             m[0][0] <- 1; \
             writeInteger(sum(m[0], 7)); \
             readString(20, s); \
         }",
    );
}

#[test]
fn roundtrip_expression_shapes() {
    roundtrip(
        "fun main(): nothing \
             var a, b, c: int; \
         { \
             a <- -b + +c * (a - 1) div 2 mod 3; \
             a <- a - (b - c); \
             if not (a = 1) and (b < 2 or c >= 3) then a <- ascii('\\x41'); \
             else a <- strlen(\"he\\\"llo\\n\"); \
         }",
    );
}

#[test]
fn roundtrip_nested_shadowing() {
    roundtrip("fun f(): nothing fun f(): nothing fun f(): nothing {} {} {}");
}

#[test]
fn roundtrip_empty_and_blocks() {
    roundtrip(
        "fun main(): nothing { ; { ; ; } while 1 = 1 do { return; } }",
    );
}
