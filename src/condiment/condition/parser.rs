//! Condition parser
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! expr       := and_expr ("or" and_expr)*
//! and_expr   := not_expr ("and" not_expr)*
//! not_expr   := "not"* comparison
//! comparison := sum (cmp_op sum)*
//! sum        := product (("+" | "-") product)*
//! product    := unary (("*" | "//" | "%") unary)*
//! unary      := "-"* atom
//! atom       := literal | IDENT "(" args ")" | IDENT | "(" expr ")"
//! ```

use super::ast::{BinaryOp, CompareOp, Expr};
use super::tokens::{tokenize, Token};
use super::ConditionError;
use chumsky::{prelude::*, Stream};

type ParserError = Simple<Token>;

/// Parse the text between `if` and the trailing `:` of a guard.
pub fn parse_condition(source: &str) -> Result<Expr, ConditionError> {
    let tokens = tokenize(source).map_err(|err| ConditionError::Syntax {
        span: err.span,
        message: format!("unexpected character `{}`", err.text),
    })?;

    let end = source.len();
    let stream = Stream::from_iter(end..end + 1, tokens.into_iter());
    condition().parse(stream).map_err(|errors| {
        // chumsky reports the error that got furthest first
        match errors.into_iter().next() {
            Some(error) => syntax_error(error),
            None => ConditionError::Syntax {
                span: 0..end,
                message: "invalid condition".to_string(),
            },
        }
    })
}

fn syntax_error(error: ParserError) -> ConditionError {
    let found = match error.found() {
        Some(token) => format!("unexpected `{}`", token),
        None => "unexpected end of condition".to_string(),
    };
    let mut expected: Vec<String> = error
        .expected()
        .map(|token| match token {
            Some(token) => format!("`{}`", token),
            None => "end of condition".to_string(),
        })
        .collect();
    expected.sort();
    expected.dedup();

    let message = if expected.is_empty() {
        found
    } else {
        format!("{}, expected {}", found, expected.join(" or "))
    };
    ConditionError::Syntax {
        span: error.span(),
        message,
    }
}

fn condition() -> impl Parser<Token, Expr, Error = ParserError> {
    let expr = recursive(|expr| {
        let literal = select! {
            Token::Int(n) => Expr::Int(n),
            Token::Str(s) => Expr::Str(s),
            Token::True => Expr::Bool(true),
            Token::False => Expr::Bool(false),
            Token::None => Expr::None,
        };
        let ident = select! { Token::Ident(name) => name };

        let call = ident
            .clone()
            .then(
                expr.clone()
                    .separated_by(just(Token::Comma))
                    .allow_trailing()
                    .delimited_by(just(Token::OpenParen), just(Token::CloseParen)),
            )
            .map(|(function, args)| Expr::Call { function, args });

        let atom = literal
            .or(call)
            .or(ident.map(Expr::Name))
            .or(expr
                .clone()
                .delimited_by(just(Token::OpenParen), just(Token::CloseParen)))
            .boxed();

        let unary = just(Token::Minus)
            .repeated()
            .then(atom)
            .foldr(|_, operand| Expr::Neg(Box::new(operand)))
            .boxed();

        let product_op = choice((
            just(Token::Star).to(BinaryOp::Mul),
            just(Token::SlashSlash).to(BinaryOp::FloorDiv),
            just(Token::Percent).to(BinaryOp::Mod),
        ));
        let product = unary
            .clone()
            .then(product_op.then(unary).repeated())
            .foldl(|lhs, (op, rhs)| Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
            .boxed();

        let sum_op = choice((
            just(Token::Plus).to(BinaryOp::Add),
            just(Token::Minus).to(BinaryOp::Sub),
        ));
        let sum = product
            .clone()
            .then(sum_op.then(product).repeated())
            .foldl(|lhs, (op, rhs)| Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
            .boxed();

        let compare_op = choice((
            just(Token::EqEq).to(CompareOp::Eq),
            just(Token::NotEq).to(CompareOp::NotEq),
            just(Token::LtEq).to(CompareOp::LtEq),
            just(Token::GtEq).to(CompareOp::GtEq),
            just(Token::Lt).to(CompareOp::Lt),
            just(Token::Gt).to(CompareOp::Gt),
            just(Token::In).to(CompareOp::In),
            just(Token::Not).then(just(Token::In)).to(CompareOp::NotIn),
        ));
        let comparison = sum
            .clone()
            .then(compare_op.then(sum).repeated())
            .map(|(first, rest)| {
                if rest.is_empty() {
                    first
                } else {
                    Expr::Compare {
                        first: Box::new(first),
                        rest,
                    }
                }
            })
            .boxed();

        let negation = just(Token::Not)
            .repeated()
            .then(comparison)
            .foldr(|_, operand| Expr::Not(Box::new(operand)))
            .boxed();

        let conjunction = negation
            .clone()
            .then(just(Token::And).ignore_then(negation).repeated())
            .foldl(|lhs, rhs| Expr::And(Box::new(lhs), Box::new(rhs)))
            .boxed();

        conjunction
            .clone()
            .then(just(Token::Or).ignore_then(conjunction).repeated())
            .foldl(|lhs, rhs| Expr::Or(Box::new(lhs), Box::new(rhs)))
    });

    expr.then_ignore(end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> Box<Expr> {
        Box::new(Expr::Name(n.to_string()))
    }

    #[test]
    fn bare_flag() {
        assert_eq!(parse_condition("WITH_A").unwrap(), *name("WITH_A"));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        assert_eq!(
            parse_condition("WITH_A or WITH_B and WITH_C").unwrap(),
            Expr::Or(
                name("WITH_A"),
                Box::new(Expr::And(name("WITH_B"), name("WITH_C")))
            )
        );
    }

    #[test]
    fn not_applies_to_whole_comparison() {
        assert_eq!(
            parse_condition("not WITH_A == 'x'").unwrap(),
            Expr::Not(Box::new(Expr::Compare {
                first: name("WITH_A"),
                rest: vec![(CompareOp::Eq, Expr::Str("x".to_string()))],
            }))
        );
    }

    #[test]
    fn not_in_is_one_operator() {
        assert_eq!(
            parse_condition("'arm' not in WITH_TARGETS").unwrap(),
            Expr::Compare {
                first: Box::new(Expr::Str("arm".to_string())),
                rest: vec![(CompareOp::NotIn, Expr::Name("WITH_TARGETS".to_string()))],
            }
        );
    }

    #[test]
    fn chained_comparison_keeps_every_link() {
        let parsed = parse_condition("1 < int(WITH_LEVEL) <= 3").unwrap();
        match parsed {
            Expr::Compare { rest, .. } => {
                let ops: Vec<_> = rest.iter().map(|(op, _)| *op).collect();
                assert_eq!(ops, vec![CompareOp::Lt, CompareOp::LtEq]);
            }
            other => panic!("expected comparison, got {:?}", other),
        }
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(
            parse_condition("1 + 2 * -3").unwrap(),
            Expr::Binary(
                BinaryOp::Add,
                Box::new(Expr::Int(1)),
                Box::new(Expr::Binary(
                    BinaryOp::Mul,
                    Box::new(Expr::Int(2)),
                    Box::new(Expr::Neg(Box::new(Expr::Int(3))))
                ))
            )
        );
    }

    #[test]
    fn calls_take_arguments() {
        assert_eq!(
            parse_condition("len(WITH_A)").unwrap(),
            Expr::Call {
                function: "len".to_string(),
                args: vec![Expr::Name("WITH_A".to_string())],
            }
        );
    }

    #[test]
    fn parentheses_group() {
        assert_eq!(
            parse_condition("(WITH_A or WITH_B) and WITH_C").unwrap(),
            Expr::And(
                Box::new(Expr::Or(name("WITH_A"), name("WITH_B"))),
                name("WITH_C")
            )
        );
    }

    #[test]
    fn dangling_operator_is_a_syntax_error() {
        let err = parse_condition("WITH_A ==").unwrap_err();
        match err {
            ConditionError::Syntax { message, .. } => {
                assert!(message.starts_with("unexpected end of condition"), "{}", message)
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn empty_condition_is_a_syntax_error() {
        assert!(matches!(
            parse_condition("   "),
            Err(ConditionError::Syntax { .. })
        ));
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        let err = parse_condition("WITH_A WITH_B").unwrap_err();
        match err {
            ConditionError::Syntax { span, message } => {
                assert_eq!(span, 7..13);
                assert!(message.contains("WITH_B"), "{}", message);
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }
}
