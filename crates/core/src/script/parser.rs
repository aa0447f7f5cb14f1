//! Script compiler: source text to [`CompiledForm`].
//!
//! Operators fold strictly left to right with no precedence, so
//! `2 + 3 * 4` evaluates as `(2 + 3) * 4`. Parentheses group explicitly.

use super::ast::{named_constant, Assignment, BinaryOp, CompiledForm, Expr, Function};
use super::lexer::{Lexer, Token, TokenKind};
use super::ScriptError;

/// Compiles a whole script.
///
/// Statements are separated by newlines or `;`, and `//` comments run to the
/// end of the line. The first malformed statement fails the whole compile.
pub fn compile(source: &str) -> Result<CompiledForm, ScriptError> {
    let mut assignments = Vec::new();

    for (index, raw_line) in source.lines().enumerate() {
        let line = index + 1;
        let code = match raw_line.find("//") {
            Some(comment) => &raw_line[..comment],
            None => raw_line,
        };

        let mut offset = 0;
        for statement in code.split(';') {
            if !statement.trim().is_empty() {
                assignments.push(parse_statement(statement, line, offset + 1)?);
            }
            offset += statement.chars().count() + 1;
        }
    }

    Ok(CompiledForm { assignments })
}

/// Parses `name = expression`; `column` is where `text` starts in its line.
fn parse_statement(text: &str, line: usize, column: usize) -> Result<Assignment, ScriptError> {
    let Some(eq) = text.find('=') else {
        return Err(ScriptError::MissingAssignment { line });
    };

    let target = text[..eq].trim();
    if !is_identifier(target) {
        return Err(ScriptError::InvalidTarget {
            line,
            name: target.to_string(),
        });
    }

    let start = column + text[..eq].chars().count() + 1;
    let tokens = Lexer::new(&text[eq + 1..], line, start).tokenize()?;
    let expr = Parser::new(tokens, line).parse()?;

    Ok(Assignment {
        target: target.to_string(),
        expr,
    })
}

fn is_identifier(text: &str) -> bool {
    let mut bytes = text.bytes();
    match bytes.next() {
        Some(first) if first.is_ascii_alphabetic() || first == b'_' => {
            bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
        }
        _ => false,
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    line: usize,
    /// Open parentheses not yet closed.
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>, line: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            line,
            depth: 0,
        }
    }

    fn parse(mut self) -> Result<Expr, ScriptError> {
        if self.peek() == &TokenKind::Eof {
            return Err(ScriptError::EmptyExpression { line: self.line });
        }

        let expr = self.parse_expression()?;
        match self.peek() {
            TokenKind::Eof => Ok(expr),
            TokenKind::RParen => Err(ScriptError::Unbalanced { line: self.line }),
            _ => Err(self.unexpected("an operator")),
        }
    }

    /// `operand (op operand)*`, folded left.
    fn parse_expression(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.parse_operand()?;
        while let Some(op) = self.binary_op() {
            self.advance();
            let rhs = self.parse_operand()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_operand(&mut self) -> Result<Expr, ScriptError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(value) => Ok(Expr::Number(value)),
            TokenKind::Minus => Ok(Expr::Neg(Box::new(self.parse_operand()?))),
            TokenKind::Plus => self.parse_operand(),
            TokenKind::LParen => {
                self.depth += 1;
                let inner = self.parse_expression()?;
                self.expect_close()?;
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                if self.peek() == &TokenKind::LParen {
                    let Some(func) = Function::from_name(&name) else {
                        return Err(ScriptError::UnknownFunction {
                            line: self.line,
                            name,
                        });
                    };
                    self.advance();
                    self.depth += 1;
                    let arg = self.parse_expression()?;
                    self.expect_close()?;
                    Ok(Expr::Call {
                        func,
                        arg: Box::new(arg),
                    })
                } else if let Some(value) = named_constant(&name) {
                    Ok(Expr::Number(value))
                } else {
                    Ok(Expr::Var(name))
                }
            }
            TokenKind::RParen => Err(ScriptError::Unbalanced { line: self.line }),
            TokenKind::Eof if self.depth > 0 => Err(ScriptError::Unbalanced { line: self.line }),
            other @ (TokenKind::Star | TokenKind::Slash | TokenKind::Eof) => {
                Err(ScriptError::UnexpectedToken {
                    line: self.line,
                    column: token.column,
                    expected: "an operand",
                    found: other.describe(),
                })
            }
        }
    }

    fn expect_close(&mut self) -> Result<(), ScriptError> {
        match self.peek() {
            TokenKind::RParen => {
                self.advance();
                self.depth -= 1;
                Ok(())
            }
            TokenKind::Eof => Err(ScriptError::Unbalanced { line: self.line }),
            _ => Err(self.unexpected("`)`")),
        }
    }

    fn binary_op(&self) -> Option<BinaryOp> {
        match self.peek() {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            TokenKind::Star => Some(BinaryOp::Mul),
            TokenKind::Slash => Some(BinaryOp::Div),
            _ => None,
        }
    }

    fn unexpected(&self, expected: &'static str) -> ScriptError {
        let token = self.current();
        ScriptError::UnexpectedToken {
            line: self.line,
            column: token.column,
            expected,
            found: token.kind.describe(),
        }
    }

    fn current(&self) -> &Token {
        // The lexer always terminates the stream with `Eof`.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &TokenKind {
        &self.current().kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{evaluate, Environment};

    fn run(source: &str, env: &mut Environment) {
        let form = compile(source).expect("script should compile");
        evaluate(&form, env);
    }

    fn value_of(source: &str, name: &str) -> f64 {
        let mut env = Environment::new();
        run(source, &mut env);
        env.get(name)
    }

    #[test]
    fn splits_on_newlines_and_semicolons() {
        let form = compile("a = 1; b = 2\n\nc = 3;").unwrap();
        let targets: Vec<_> = form.assignments().iter().map(|a| a.target.as_str()).collect();
        assert_eq!(targets, vec!["a", "b", "c"]);
    }

    #[test]
    fn folds_operators_left_to_right_without_precedence() {
        assert_eq!(value_of("v = 2 + 3 * 4", "v"), 20.0);
        assert_eq!(value_of("v = 10 - 4 / 2", "v"), 3.0);
    }

    #[test]
    fn parentheses_group_explicitly() {
        assert_eq!(value_of("v = 2 + (3 * 4)", "v"), 14.0);
    }

    #[test]
    fn supports_unary_minus_on_operands() {
        assert_eq!(value_of("v = -2 * 3", "v"), -6.0);
        assert_eq!(value_of("v = 1 - -1", "v"), 2.0);
    }

    #[test]
    fn evaluates_trig_calls_with_nested_arguments() {
        let v = value_of("v = sin(PI / 2)", "v");
        assert!((v - 1.0).abs() < 1e-12);
        let v = value_of("v = cos(0) + tan(0)", "v");
        assert!((v - 1.0).abs() < 1e-12);
    }

    #[test]
    fn skips_comments() {
        assert_eq!(value_of("v = 3 // v = 4", "v"), 3.0);
    }

    #[test]
    fn line_without_equals_is_reported() {
        let err = compile("x = 1\nnonsense").unwrap_err();
        assert_eq!(err, ScriptError::MissingAssignment { line: 2 });
    }

    #[test]
    fn unbalanced_parentheses_are_reported() {
        assert_eq!(
            compile("x = sin(1").unwrap_err(),
            ScriptError::Unbalanced { line: 1 }
        );
        assert_eq!(
            compile("x = 1)").unwrap_err(),
            ScriptError::Unbalanced { line: 1 }
        );
        for source in ["x = (", "x = sin(", "x = 2 * (1 + ("] {
            assert_eq!(
                compile(source).unwrap_err(),
                ScriptError::Unbalanced { line: 1 },
                "{source}"
            );
        }
        // With nothing left open, a missing operand is an ordinary syntax error.
        assert!(matches!(
            compile("x = 1 +").unwrap_err(),
            ScriptError::UnexpectedToken { expected: "an operand", .. }
        ));
    }

    #[test]
    fn non_ascii_characters_are_reported_whole() {
        assert_eq!(
            compile("x = 2 * é").unwrap_err(),
            ScriptError::UnexpectedChar {
                line: 1,
                column: 9,
                found: 'é'
            }
        );
        assert_eq!(
            compile("a = 1; b = ü").unwrap_err(),
            ScriptError::UnexpectedChar {
                line: 1,
                column: 12,
                found: 'ü'
            }
        );
    }

    #[test]
    fn unknown_function_is_reported() {
        assert_eq!(
            compile("x = wobble(1)").unwrap_err(),
            ScriptError::UnknownFunction {
                line: 1,
                name: "wobble".to_string()
            }
        );
    }

    #[test]
    fn invalid_target_is_reported() {
        assert!(matches!(
            compile("3 = x").unwrap_err(),
            ScriptError::InvalidTarget { line: 1, .. }
        ));
    }

    #[test]
    fn empty_right_hand_side_is_reported() {
        assert_eq!(
            compile("x = ").unwrap_err(),
            ScriptError::EmptyExpression { line: 1 }
        );
    }

    #[test]
    fn dangling_operator_is_reported_with_column() {
        let err = compile("x = 1 +").unwrap_err();
        assert!(matches!(
            err,
            ScriptError::UnexpectedToken {
                line: 1,
                column: 8,
                ..
            }
        ));
    }

    #[test]
    fn adjacent_operands_are_rejected() {
        assert!(matches!(
            compile("x = 1 2").unwrap_err(),
            ScriptError::UnexpectedToken { .. }
        ));
    }

    #[test]
    fn compiling_twice_gives_equivalent_forms() {
        let source = "t = t + 0.1; x = sin(t) * d";
        let first = compile(source).unwrap();
        let second = compile(source).unwrap();
        assert_eq!(first, second);

        let mut a = Environment::new();
        a.set("d", 0.25);
        let mut b = a.clone();
        evaluate(&first, &mut a);
        evaluate(&second, &mut b);
        assert_eq!(a, b);
    }
}
