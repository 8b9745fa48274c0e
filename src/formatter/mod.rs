//! Pretty-printer for the Grace AST.
//!
//! Prints any `Ast<T>` back to concrete syntax. The output is canonical
//! (one parameter per group, one `var` per line) but structure-preserving:
//! re-parsing a formatted program yields the tree it was printed from.

mod context;

pub use context::FormatterContext;

use crate::parser::ast::{
    ArrayAccess, Assignment, BinaryExpression, BinaryOperator, Block, CharLiteral, Comparison,
    Condition, Expression, FunctionCall, FunctionDecl, FunctionDef, FunctionHeader, If,
    IntLiteral, LocalDef, LogicalCondition, LogicalOperator, Lvalue, NotCondition, Param,
    PassMode, Program, Return, Statement, StringLiteral, UnaryExpression, VariableDef, Variable,
    While,
};

pub trait Format {
    fn format(&self, ctx: &mut FormatterContext) -> Result<(), std::fmt::Error>;
}

/// Render a whole program to source text.
pub fn format_program<T>(program: &Program<T>) -> Result<String, std::fmt::Error> {
    let mut ctx = FormatterContext::new();
    program.main.format(&mut ctx)?;
    Ok(ctx.output)
}

impl<T> Format for FunctionDef<T> {
    fn format(&self, ctx: &mut FormatterContext) -> Result<(), std::fmt::Error> {
        self.header.format(ctx)?;
        ctx.write_newline()?;

        ctx.with_indent(|ctx| {
            for local in &self.locals {
                local.format(ctx)?;
            }
            Ok(())
        })?;

        self.body.format(ctx)?;
        ctx.write_newline()
    }
}

impl<T> Format for FunctionHeader<T> {
    fn format(&self, ctx: &mut FormatterContext) -> Result<(), std::fmt::Error> {
        ctx.write_indent()?;
        ctx.write(&format!("fun {}(", self.id.name))?;
        ctx.write_separated(&self.params, "; ", |ctx, param| param.format(ctx))?;
        ctx.write(&format!("): {}", self.return_kind))
    }
}

impl<T> Format for Param<T> {
    fn format(&self, ctx: &mut FormatterContext) -> Result<(), std::fmt::Error> {
        if self.mode == PassMode::ByReference {
            ctx.write("ref ")?;
        }
        ctx.write(&format!("{}: {}", self.id.name, self.data_type))
    }
}

impl<T> Format for LocalDef<T> {
    fn format(&self, ctx: &mut FormatterContext) -> Result<(), std::fmt::Error> {
        match self {
            LocalDef::Function(def) => def.format(ctx),
            LocalDef::Declaration(decl) => decl.format(ctx),
            LocalDef::Variable(variable) => variable.format(ctx),
        }
    }
}

impl<T> Format for FunctionDecl<T> {
    fn format(&self, ctx: &mut FormatterContext) -> Result<(), std::fmt::Error> {
        self.header.format(ctx)?;
        ctx.write(";")?;
        ctx.write_newline()
    }
}

impl<T> Format for VariableDef<T> {
    fn format(&self, ctx: &mut FormatterContext) -> Result<(), std::fmt::Error> {
        ctx.write_indent()?;
        ctx.write(&format!("var {}: {};", self.id.name, self.data_type))?;
        ctx.write_newline()
    }
}

impl<T> Format for Block<T> {
    fn format(&self, ctx: &mut FormatterContext) -> Result<(), std::fmt::Error> {
        ctx.write_indented_line("{")?;
        ctx.with_indent(|ctx| {
            for statement in &self.statements {
                statement.format(ctx)?;
            }
            Ok(())
        })?;
        ctx.write_indent()?;
        ctx.write("}")
    }
}

impl<T> Format for Statement<T> {
    fn format(&self, ctx: &mut FormatterContext) -> Result<(), std::fmt::Error> {
        match self {
            Statement::Empty(_) => ctx.write_indented_line(";"),
            Statement::Assignment(assignment) => assignment.format(ctx),
            Statement::Block(block) => {
                block.format(ctx)?;
                ctx.write_newline()
            }
            Statement::Call(call) => {
                ctx.write_indent()?;
                call.format(ctx)?;
                ctx.write(";")?;
                ctx.write_newline()
            }
            Statement::If(if_statement) => if_statement.format(ctx),
            Statement::While(while_loop) => while_loop.format(ctx),
            Statement::Return(ret) => ret.format(ctx),
        }
    }
}

impl<T> Format for Assignment<T> {
    fn format(&self, ctx: &mut FormatterContext) -> Result<(), std::fmt::Error> {
        ctx.write_indent()?;
        self.target.format(ctx)?;
        ctx.write(" <- ")?;
        format_expression_prec(&self.value, 0, ctx)?;
        ctx.write(";")?;
        ctx.write_newline()
    }
}

impl<T> Format for If<T> {
    fn format(&self, ctx: &mut FormatterContext) -> Result<(), std::fmt::Error> {
        ctx.write_indent()?;
        ctx.write("if ")?;
        format_condition_prec(&self.condition, 0, ctx)?;
        ctx.write(" then")?;
        ctx.write_newline()?;
        ctx.with_indent(|ctx| self.then_branch.format(ctx))?;

        if let Some(else_branch) = &self.else_branch {
            ctx.write_indented_line("else")?;
            ctx.with_indent(|ctx| else_branch.format(ctx))?;
        }
        Ok(())
    }
}

impl<T> Format for While<T> {
    fn format(&self, ctx: &mut FormatterContext) -> Result<(), std::fmt::Error> {
        ctx.write_indent()?;
        ctx.write("while ")?;
        format_condition_prec(&self.condition, 0, ctx)?;
        ctx.write(" do")?;
        ctx.write_newline()?;
        ctx.with_indent(|ctx| self.body.format(ctx))
    }
}

impl<T> Format for Return<T> {
    fn format(&self, ctx: &mut FormatterContext) -> Result<(), std::fmt::Error> {
        ctx.write_indent()?;
        ctx.write("return")?;
        if let Some(value) = &self.value {
            ctx.write(" ")?;
            format_expression_prec(value, 0, ctx)?;
        }
        ctx.write(";")?;
        ctx.write_newline()
    }
}

impl<T> Format for FunctionCall<T> {
    fn format(&self, ctx: &mut FormatterContext) -> Result<(), std::fmt::Error> {
        ctx.write(&self.id.name)?;
        ctx.write("(")?;
        ctx.write_separated(&self.arguments, ", ", |ctx, argument| {
            format_expression_prec(argument, 0, ctx)
        })?;
        ctx.write(")")
    }
}

impl<T> Format for Lvalue<T> {
    fn format(&self, ctx: &mut FormatterContext) -> Result<(), std::fmt::Error> {
        match self {
            Lvalue::Variable(Variable { id, .. }) => ctx.write(&id.name),
            Lvalue::String(string) => string.format(ctx),
            Lvalue::Access(access) => access.format(ctx),
        }
    }
}

impl<T> Format for ArrayAccess<T> {
    fn format(&self, ctx: &mut FormatterContext) -> Result<(), std::fmt::Error> {
        self.base.format(ctx)?;
        for index in &self.indices {
            ctx.write("[")?;
            format_expression_prec(index, 0, ctx)?;
            ctx.write("]")?;
        }
        Ok(())
    }
}

impl<T> Format for StringLiteral<T> {
    fn format(&self, ctx: &mut FormatterContext) -> Result<(), std::fmt::Error> {
        ctx.write("\"")?;
        for byte in &self.value {
            ctx.write(&escape_byte(*byte, b'"'))?;
        }
        ctx.write("\"")
    }
}

impl<T> Format for CharLiteral<T> {
    fn format(&self, ctx: &mut FormatterContext) -> Result<(), std::fmt::Error> {
        ctx.write("'")?;
        ctx.write(&escape_byte(self.value, b'\''))?;
        ctx.write("'")
    }
}

/// Escape a single byte for a literal delimited by `quote`.
fn escape_byte(byte: u8, quote: u8) -> String {
    match byte {
        b'\n' => "\\n".to_string(),
        b'\t' => "\\t".to_string(),
        b'\r' => "\\r".to_string(),
        0 => "\\0".to_string(),
        b'\\' => "\\\\".to_string(),
        b if b == quote => format!("\\{}", b as char),
        0x20..=0x7e => (byte as char).to_string(),
        _ => format!("\\x{byte:02x}"),
    }
}

// Binding strength of expression contexts: additive < multiplicative <
// unary. A child is parenthesised when its own strength is below the one
// its context requires.
fn expression_prec<T>(expression: &Expression<T>) -> u8 {
    match expression {
        Expression::Binary(BinaryExpression { operator, .. }) => match operator {
            BinaryOperator::Add | BinaryOperator::Subtract => 1,
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => 2,
        },
        Expression::Unary(_) => 3,
        _ => 4,
    }
}

fn format_expression_prec<T>(
    expression: &Expression<T>,
    min_prec: u8,
    ctx: &mut FormatterContext,
) -> Result<(), std::fmt::Error> {
    let prec = expression_prec(expression);
    let parenthesise = prec < min_prec;
    if parenthesise {
        ctx.write("(")?;
    }

    match expression {
        Expression::Int(IntLiteral { value, .. }) => ctx.write(&value.to_string())?,
        Expression::Char(literal) => literal.format(ctx)?,
        Expression::Lvalue(lvalue) => lvalue.format(ctx)?,
        Expression::Call(call) => call.format(ctx)?,
        Expression::Unary(UnaryExpression {
            operator, operand, ..
        }) => {
            ctx.write(&operator.to_string())?;
            format_expression_prec(operand, 3, ctx)?;
        }
        Expression::Binary(BinaryExpression {
            operator,
            left,
            right,
            ..
        }) => {
            format_expression_prec(left, prec, ctx)?;
            ctx.write(&format!(" {operator} "))?;
            format_expression_prec(right, prec + 1, ctx)?;
        }
    }

    if parenthesise {
        ctx.write(")")?;
    }
    Ok(())
}

// or < and < not < comparison, mirroring the condition grammar.
fn condition_prec<T>(condition: &Condition<T>) -> u8 {
    match condition {
        Condition::Logical(LogicalCondition { operator, .. }) => match operator {
            LogicalOperator::Or => 1,
            LogicalOperator::And => 2,
        },
        Condition::Not(_) => 3,
        Condition::Comparison(_) => 4,
    }
}

fn format_condition_prec<T>(
    condition: &Condition<T>,
    min_prec: u8,
    ctx: &mut FormatterContext,
) -> Result<(), std::fmt::Error> {
    let prec = condition_prec(condition);
    let parenthesise = prec < min_prec;
    if parenthesise {
        ctx.write("(")?;
    }

    match condition {
        Condition::Comparison(Comparison {
            operator,
            left,
            right,
            ..
        }) => {
            format_expression_prec(left, 0, ctx)?;
            ctx.write(&format!(" {operator} "))?;
            format_expression_prec(right, 0, ctx)?;
        }
        Condition::Logical(LogicalCondition {
            operator,
            left,
            right,
            ..
        }) => {
            format_condition_prec(left, prec, ctx)?;
            ctx.write(&format!(" {operator} "))?;
            format_condition_prec(right, prec + 1, ctx)?;
        }
        Condition::Not(NotCondition { inner, .. }) => {
            ctx.write("not ")?;
            format_condition_prec(inner, 3, ctx)?;
        }
    }

    if parenthesise {
        ctx.write(")")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer::Lexer, parser::parse_program};

    fn roundtrip(source: &str) {
        let tokens = Lexer::new(source).lex().unwrap();
        let program = parse_program(tokens).unwrap();

        let printed = format_program(&program).unwrap();
        let tokens = Lexer::new(&printed)
            .lex()
            .unwrap_or_else(|e| panic!("formatted output does not lex: {e}\n{printed}"));
        let reparsed = parse_program(tokens)
            .unwrap_or_else(|e| panic!("formatted output does not parse: {e}\n{printed}"));

        assert_eq!(program, reparsed, "round-trip changed the tree:\n{printed}");
    }

    #[test]
    fn test_roundtrip_minimal() {
        roundtrip("fun main(): nothing { writeInteger(1+2); }");
    }

    #[test]
    fn test_roundtrip_precedence() {
        roundtrip("fun main(): nothing var x: int; { x <- (1 + 2) * 3 - -4 div (5 mod x); }");
    }

    #[test]
    fn test_roundtrip_right_nested_arithmetic() {
        roundtrip("fun main(): nothing var x: int; { x <- 1 - (2 - 3); }");
    }

    #[test]
    fn test_roundtrip_conditions() {
        roundtrip(
            "fun main(): nothing var a, b: int; { \
                 while (a < 1 or b > 2) and not (a = b) do a <- a + 1; \
             }",
        );
    }

    #[test]
    fn test_roundtrip_nested_functions() {
        roundtrip(
            "fun f(): nothing \
                 var i: int; \
                 fun input(ref i: int): nothing { i <- readInteger(); } \
             { input(i); while i # 0 do { if i < 5 then writeString(\"Less\"); \
               else if i # 5 then writeString(\"More\"); else writeString(\"Equal\"); \
               writeChar('\\n'); input(i); } }",
        );
    }

    #[test]
    fn test_roundtrip_declaration_and_arrays() {
        roundtrip(
            "fun main(): nothing \
                 var m: int[3][5]; \
                 fun f(ref row: int[]; n: int): int; \
                 fun f(ref row: int[]; n: int): int { return row[n]; } \
             { writeInteger(f(m[1], 2)); }",
        );
    }

    #[test]
    fn test_roundtrip_string_escapes() {
        roundtrip("fun main(): nothing { writeString(\"a\\n\\t\\\\\\\"b\\x07c\\0\"); }");
    }

    #[test]
    fn test_roundtrip_else_chain() {
        roundtrip(
            "fun main(): nothing var i: int; { \
                 if i < 5 then writeString(\"Less\"); \
                 else if i # 5 then writeString(\"More\"); \
                 else writeString(\"Equal\"); \
             }",
        );
    }
}
