//! A small hierarchy expression language.
//!
//! ```text
//! expr    := operand (("OR" | "AND" | "MINUS") operand)*
//! operand := "(" expr ")" | "*" | [ "<<" | "<" | ">>" | ">" ] id [ "|" term "|" ]
//! ```
//!
//! Binary operators have equal precedence and associate left to right.

use crate::error::QueryError;
use crate::snapshot::Snapshot;
use std::collections::BTreeSet;
use termfix_types::ConceptId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    SelfOnly,
    DescendantsOrSelf,
    Descendants,
    AncestorsOrSelf,
    Ancestors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Or,
    And,
    Minus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyQuery {
    /// Every concept in the snapshot.
    All,
    Focus(Constraint, ConceptId),
    Compound(Box<HierarchyQuery>, SetOp, Box<HierarchyQuery>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    LParen,
    RParen,
    Star,
    Constraint(Constraint),
    Op(SetOp),
    Id(ConceptId),
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    offset: usize,
    text: String,
}

impl HierarchyQuery {
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(QueryError::Empty);
        }
        let mut parser = Parser { tokens, pos: 0 };
        let query = parser.expr()?;
        if let Some(t) = parser.peek() {
            return Err(QueryError::UnexpectedToken {
                offset: t.offset,
                found: t.text.clone(),
            });
        }
        Ok(query)
    }

    /// Evaluate against the snapshot's inferred hierarchy.
    pub fn evaluate(&self, snapshot: &Snapshot) -> Result<BTreeSet<ConceptId>, QueryError> {
        let closure = snapshot.hierarchy();
        match self {
            HierarchyQuery::All => Ok(snapshot.all_concepts().iter().map(|c| c.id).collect()),
            HierarchyQuery::Focus(constraint, id) => {
                let set = match constraint {
                    Constraint::SelfOnly => {
                        snapshot.concept(*id)?;
                        BTreeSet::from([*id])
                    }
                    Constraint::DescendantsOrSelf => closure.descendants_or_self(*id)?,
                    Constraint::Descendants => closure.descendants(*id)?,
                    Constraint::AncestorsOrSelf => closure.ancestors_or_self(*id)?,
                    Constraint::Ancestors => closure.ancestors(*id)?,
                };
                Ok(set)
            }
            HierarchyQuery::Compound(lhs, op, rhs) => {
                let a = lhs.evaluate(snapshot)?;
                let b = rhs.evaluate(snapshot)?;
                Ok(match op {
                    SetOp::Or => a.union(&b).copied().collect(),
                    SetOp::And => a.intersection(&b).copied().collect(),
                    SetOp::Minus => a.difference(&b).copied().collect(),
                })
            }
        }
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Spanned, QueryError> {
        let t = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(QueryError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(t)
    }

    fn expr(&mut self) -> Result<HierarchyQuery, QueryError> {
        let mut lhs = self.operand()?;
        while let Some(Spanned {
            token: Token::Op(op),
            ..
        }) = self.peek()
        {
            let op = *op;
            self.pos += 1;
            let rhs = self.operand()?;
            lhs = HierarchyQuery::Compound(Box::new(lhs), op, Box::new(rhs));
        }
        Ok(lhs)
    }

    fn operand(&mut self) -> Result<HierarchyQuery, QueryError> {
        let t = self.next()?;
        match t.token {
            Token::LParen => {
                let inner = self.expr()?;
                let close = self.next()?;
                if close.token != Token::RParen {
                    return Err(unexpected(&close));
                }
                Ok(inner)
            }
            Token::Star => Ok(HierarchyQuery::All),
            Token::Id(id) => Ok(HierarchyQuery::Focus(Constraint::SelfOnly, id)),
            Token::Constraint(c) => {
                let focus = self.next()?;
                match focus.token {
                    Token::Id(id) => Ok(HierarchyQuery::Focus(c, id)),
                    Token::Star if matches!(c, Constraint::DescendantsOrSelf) => {
                        Ok(HierarchyQuery::All)
                    }
                    _ => Err(unexpected(&focus)),
                }
            }
            Token::RParen | Token::Op(_) => Err(unexpected(&t)),
        }
    }
}

fn unexpected(t: &Spanned) -> QueryError {
    QueryError::UnexpectedToken {
        offset: t.offset,
        found: t.text.clone(),
    }
}

fn tokenize(input: &str) -> Result<Vec<Spanned>, QueryError> {
    let bytes = input.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    let push = |out: &mut Vec<Spanned>, token, offset, text: &str| {
        out.push(Spanned {
            token,
            offset,
            text: text.to_string(),
        })
    };

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b'(' => {
                push(&mut out, Token::LParen, i, "(");
                i += 1;
            }
            b')' => {
                push(&mut out, Token::RParen, i, ")");
                i += 1;
            }
            b'*' => {
                push(&mut out, Token::Star, i, "*");
                i += 1;
            }
            b'<' | b'>' => {
                let double = bytes.get(i + 1) == Some(&b);
                let (c, len) = match (b, double) {
                    (b'<', true) => (Constraint::DescendantsOrSelf, 2),
                    (b'<', false) => (Constraint::Descendants, 1),
                    (_, true) => (Constraint::AncestorsOrSelf, 2),
                    (_, false) => (Constraint::Ancestors, 1),
                };
                push(&mut out, Token::Constraint(c), i, &input[i..i + len]);
                i += len;
            }
            b'|' => {
                // Display term; ignored.
                let start = i;
                match input[i + 1..].find('|') {
                    Some(end) => i = i + 1 + end + 1,
                    None => return Err(QueryError::UnterminatedTerm(start)),
                }
            }
            _ if b.is_ascii_alphanumeric() => {
                let start = i;
                while i < bytes.len() && bytes[i].is_ascii_alphanumeric() {
                    i += 1;
                }
                let word = &input[start..i];
                let token = if word.bytes().all(|c| c.is_ascii_digit()) {
                    let id = word
                        .parse::<ConceptId>()
                        .map_err(|_| QueryError::InvalidId(word.to_string()))?;
                    Token::Id(id)
                } else {
                    match word.to_ascii_uppercase().as_str() {
                        "OR" => Token::Op(SetOp::Or),
                        "AND" => Token::Op(SetOp::And),
                        "MINUS" => Token::Op(SetOp::Minus),
                        _ if word.as_bytes()[0].is_ascii_digit() => {
                            return Err(QueryError::InvalidId(word.to_string()));
                        }
                        _ => {
                            return Err(QueryError::UnexpectedToken {
                                offset: start,
                                found: word.to_string(),
                            });
                        }
                    }
                };
                push(&mut out, token, start, word);
            }
            _ => {
                let ch = input[i..].chars().next().unwrap_or('?');
                return Err(QueryError::UnexpectedToken {
                    offset: i,
                    found: ch.to_string(),
                });
            }
        }
    }
    Ok(out)
}
