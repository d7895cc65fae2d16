//! Shunting-yard conversion from tokens to an RPN program.

use std::sync::Arc;

use crate::error::SyntaxError;

use super::config::{BinaryOp, ExprConfig};
use super::token::Token;

/// One instruction of a compiled formula
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    Number(f64),
    /// Variable or function name, resolved at evaluation time
    Name(Arc<str>),
    Binary(BinaryOp),
    Negate,
    /// Apply the function whose marker sits below the arguments
    Call,
}

/// Entries waiting on the operator stack
#[derive(Debug, Clone, Copy)]
enum Pending {
    Binary(BinaryOp),
    Negate,
    /// An open parenthesis; `call` when it directly follows an identifier
    Group { call: bool },
}

pub fn to_rpn(tokens: &[Token<'_>], config: &ExprConfig) -> Result<Vec<Instr>, SyntaxError> {
    let operators = config.operators();
    let mut out: Vec<Instr> = Vec::with_capacity(tokens.len());
    let mut ops: Vec<Pending> = Vec::new();
    let mut prev: Option<&Token<'_>> = None;

    for token in tokens {
        match token {
            Token::Number(value) => out.push(Instr::Number(*value)),
            Token::Ident(name) => match config.constant(name) {
                // Constants win every lookup, so fold them now
                Some(value) => out.push(Instr::Number(value)),
                None => out.push(Instr::Name(Arc::from(*name))),
            },
            Token::Comma => {
                flush_to_group(&mut out, &mut ops);
                if ops.is_empty() {
                    return Err(SyntaxError::MisplacedComma);
                }
            }
            Token::Operator(symbol) => {
                let op = BinaryOp::from_symbol(*symbol)
                    .filter(|op| operators.is_enabled(*op))
                    .ok_or_else(|| SyntaxError::UnknownSymbol(symbol.to_string()))?;

                let unary = op == BinaryOp::Sub
                    && matches!(
                        prev,
                        None | Some(Token::LParen | Token::Comma | Token::Operator(_))
                    );

                if unary {
                    ops.push(Pending::Negate);
                } else {
                    while let Some(&top) = ops.last() {
                        let pop = match top {
                            Pending::Binary(top) => {
                                if op.is_right_associative() {
                                    op.precedence() < top.precedence()
                                } else {
                                    op.precedence() <= top.precedence()
                                }
                            }
                            // Negation waits for the enclosing group, comma or end of input
                            Pending::Negate => false,
                            Pending::Group { .. } => false,
                        };
                        if !pop {
                            break;
                        }
                        ops.pop();
                        out.push(emit(top));
                    }
                    ops.push(Pending::Binary(op));
                }
            }
            Token::LParen => {
                let call = matches!(prev, Some(Token::Ident(_)));
                ops.push(Pending::Group { call });
            }
            Token::RParen => {
                flush_to_group(&mut out, &mut ops);
                match ops.pop() {
                    Some(Pending::Group { call }) => {
                        if call {
                            out.push(Instr::Call);
                        }
                    }
                    _ => return Err(SyntaxError::UnmatchedParenthesis),
                }
            }
        }
        prev = Some(token);
    }

    while let Some(top) = ops.pop() {
        if matches!(top, Pending::Group { .. }) {
            return Err(SyntaxError::UnmatchedParenthesis);
        }
        out.push(emit(top));
    }

    Ok(out)
}

/// Pop operators to the output until an open group is on top (or the stack is empty)
fn flush_to_group(out: &mut Vec<Instr>, ops: &mut Vec<Pending>) {
    while let Some(&top) = ops.last() {
        if matches!(top, Pending::Group { .. }) {
            break;
        }
        ops.pop();
        out.push(emit(top));
    }
}

fn emit(pending: Pending) -> Instr {
    match pending {
        Pending::Binary(op) => Instr::Binary(op),
        Pending::Negate => Instr::Negate,
        Pending::Group { .. } => unreachable!("groups are never emitted"),
    }
}
