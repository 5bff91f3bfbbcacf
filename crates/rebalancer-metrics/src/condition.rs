//! Boolean conditions over a query result.
//!
//! ```text
//! expr       := or
//! or         := and ( "||" and )*
//! and        := unary ( "&&" unary )*
//! unary      := "!" unary | "(" expr ")" | comparison
//! comparison := operand ( "==" | "!=" | "<" | "<=" | ">" | ">=" ) operand
//! operand    := "result" [ "[" index "]" ] | number
//! ```
//!
//! `result` against a vector means every element; a comparison involving
//! an empty vector is false.

use rebalancer_strategy::{RebalanceError, RebalanceResult};

/// Decoded value of an instant query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl QueryValue {
    fn all(&self) -> Vec<f64> {
        match self {
            QueryValue::Scalar(v) => vec![*v],
            QueryValue::Vector(vs) => vs.clone(),
        }
    }

    fn index(&self, i: usize) -> RebalanceResult<f64> {
        let found = match self {
            QueryValue::Scalar(v) if i == 0 => Some(*v),
            QueryValue::Scalar(_) => None,
            QueryValue::Vector(vs) => vs.get(i).copied(),
        };
        found.ok_or_else(|| {
            RebalanceError::Retrieval(format!("result[{i}] is out of range"))
        })
    }
}

/// Parse `expression` and evaluate it against `value`.
pub fn evaluate(expression: &str, value: &QueryValue) -> RebalanceResult<bool> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expr()?;
    if let Some(tok) = parser.peek() {
        return Err(syntax(format!("unexpected {tok:?} after expression")));
    }
    expr.eval(value)
}

fn syntax(msg: String) -> RebalanceError {
    RebalanceError::Config(format!("invalid condition: {msg}"))
}

// ── Lexer ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Result,
    Number(f64),
    LBracket,
    RBracket,
    LParen,
    RParen,
    Cmp(CmpOp),
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn apply(self, l: f64, r: f64) -> bool {
        match self {
            CmpOp::Eq => l == r,
            CmpOp::Ne => l != r,
            CmpOp::Lt => l < r,
            CmpOp::Le => l <= r,
            CmpOp::Gt => l > r,
            CmpOp::Ge => l >= r,
        }
    }
}

fn tokenize(input: &str) -> RebalanceResult<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let (token, width) = match (c, next) {
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('[', _) => (Token::LBracket, 1),
            (']', _) => (Token::RBracket, 1),
            ('&', Some('&')) => (Token::And, 2),
            ('|', Some('|')) => (Token::Or, 2),
            ('=', Some('=')) => (Token::Cmp(CmpOp::Eq), 2),
            ('!', Some('=')) => (Token::Cmp(CmpOp::Ne), 2),
            ('!', _) => (Token::Not, 1),
            ('<', Some('=')) => (Token::Cmp(CmpOp::Le), 2),
            ('<', _) => (Token::Cmp(CmpOp::Lt), 1),
            ('>', Some('=')) => (Token::Cmp(CmpOp::Ge), 2),
            ('>', _) => (Token::Cmp(CmpOp::Gt), 1),
            _ if c.is_ascii_digit() || c == '.' || (c == '-' && next.is_some_and(|n| n.is_ascii_digit() || n == '.')) => {
                let start = i;
                i += 1;
                while i < chars.len() {
                    let d = chars[i];
                    let exponent_sign = (d == '-' || d == '+') && matches!(chars[i - 1], 'e' | 'E');
                    if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' || exponent_sign {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|_| syntax(format!("bad number {text:?}")))?;
                tokens.push(Token::Number(n));
                continue;
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                if word != "result" {
                    return Err(syntax(format!("unknown identifier {word:?}")));
                }
                tokens.push(Token::Result);
                continue;
            }
            _ => return Err(syntax(format!("unexpected character {c:?}"))),
        };

        tokens.push(token);
        i += width;
    }

    Ok(tokens)
}

// ── Parser ─────────────────────────────────────────────────────────

#[derive(Debug)]
enum Operand {
    Result,
    Index(usize),
    Number(f64),
}

impl Operand {
    fn values(&self, value: &QueryValue) -> RebalanceResult<Vec<f64>> {
        match self {
            Operand::Result => Ok(value.all()),
            Operand::Index(i) => Ok(vec![value.index(*i)?]),
            Operand::Number(n) => Ok(vec![*n]),
        }
    }
}

#[derive(Debug)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare(Operand, CmpOp, Operand),
}

impl Expr {
    fn eval(&self, value: &QueryValue) -> RebalanceResult<bool> {
        match self {
            Expr::Or(l, r) => Ok(l.eval(value)? || r.eval(value)?),
            Expr::And(l, r) => Ok(l.eval(value)? && r.eval(value)?),
            Expr::Not(e) => Ok(!e.eval(value)?),
            Expr::Compare(l, op, r) => {
                let lhs = l.values(value)?;
                let rhs = r.values(value)?;
                if lhs.is_empty() || rhs.is_empty() {
                    return Ok(false);
                }
                Ok(lhs
                    .iter()
                    .all(|a| rhs.iter().all(|b| op.apply(*a, *b))))
            }
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, want: Token) -> RebalanceResult<()> {
        match self.next() {
            Some(tok) if tok == want => Ok(()),
            Some(tok) => Err(syntax(format!("expected {want:?}, found {tok:?}"))),
            None => Err(syntax(format!("expected {want:?}, found end of input"))),
        }
    }

    fn expr(&mut self) -> RebalanceResult<Expr> {
        let mut lhs = self.and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> RebalanceResult<Expr> {
        let mut lhs = self.unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> RebalanceResult<Expr> {
        match self.peek() {
            Some(Token::Not) => {
                self.pos += 1;
                Ok(Expr::Not(Box::new(self.unary()?)))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            _ => self.comparison(),
        }
    }

    fn comparison(&mut self) -> RebalanceResult<Expr> {
        let lhs = self.operand()?;
        let op = match self.next() {
            Some(Token::Cmp(op)) => op,
            Some(tok) => return Err(syntax(format!("expected comparison, found {tok:?}"))),
            None => return Err(syntax("expected comparison, found end of input".to_string())),
        };
        let rhs = self.operand()?;
        Ok(Expr::Compare(lhs, op, rhs))
    }

    fn operand(&mut self) -> RebalanceResult<Operand> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Operand::Number(n)),
            Some(Token::Result) => {
                if self.peek() != Some(&Token::LBracket) {
                    return Ok(Operand::Result);
                }
                self.pos += 1;
                let index = match self.next() {
                    Some(Token::Number(n)) if n >= 0.0 && n.fract() == 0.0 => n as usize,
                    Some(tok) => return Err(syntax(format!("bad index {tok:?}"))),
                    None => return Err(syntax("unterminated index".to_string())),
                };
                self.expect(Token::RBracket)?;
                Ok(Operand::Index(index))
            }
            Some(tok) => Err(syntax(format!("expected operand, found {tok:?}"))),
            None => Err(syntax("expected operand, found end of input".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(v: f64) -> QueryValue {
        QueryValue::Scalar(v)
    }

    fn vector(vs: &[f64]) -> QueryValue {
        QueryValue::Vector(vs.to_vec())
    }

    #[test]
    fn scalar_comparisons() {
        let v = scalar(150.0);
        assert!(evaluate("result > 100", &v).unwrap());
        assert!(evaluate("result >= 150", &v).unwrap());
        assert!(evaluate("result == 150", &v).unwrap());
        assert!(!evaluate("result < 100", &v).unwrap());
        assert!(!evaluate("result <= 149.5", &v).unwrap());
        assert!(evaluate("result != 1e2", &v).unwrap());
    }

    #[test]
    fn literal_on_the_left() {
        assert!(evaluate("100 < result", &scalar(150.0)).unwrap());
        assert!(evaluate("-1 < result", &scalar(0.0)).unwrap());
    }

    #[test]
    fn boolean_operators_and_precedence() {
        let v = scalar(5.0);
        assert!(evaluate("result > 1 && result < 10", &v).unwrap());
        assert!(!evaluate("result > 1 && result > 10", &v).unwrap());
        assert!(evaluate("result > 10 || result == 5", &v).unwrap());
        // && binds tighter than ||.
        assert!(evaluate("result == 5 || result > 10 && result < 0", &v).unwrap());
        assert!(!evaluate("(result == 5 || result > 10) && result < 0", &v).unwrap());
        assert!(evaluate("!(result > 10)", &v).unwrap());
        assert!(!evaluate("!!(result > 10)", &v).unwrap());
    }

    #[test]
    fn vector_requires_every_element() {
        let v = vector(&[3.0, 7.0, 9.0]);
        assert!(evaluate("result > 1", &v).unwrap());
        assert!(!evaluate("result > 5", &v).unwrap());
    }

    #[test]
    fn vector_indexing() {
        let v = vector(&[3.0, 7.0]);
        assert!(evaluate("result[1] == 7", &v).unwrap());
        assert!(evaluate("result[0] < result[1]", &v).unwrap());
        assert!(evaluate("result[0] == 4", &scalar(4.0)).unwrap());
    }

    #[test]
    fn empty_vector_never_satisfies() {
        let v = vector(&[]);
        assert!(!evaluate("result > 0", &v).unwrap());
        assert!(!evaluate("result <= 0", &v).unwrap());
        assert!(evaluate("!(result > 0)", &v).unwrap());
    }

    #[test]
    fn index_out_of_range_is_retrieval_error() {
        let err = evaluate("result[2] > 0", &vector(&[1.0])).unwrap_err();
        assert!(matches!(err, RebalanceError::Retrieval(_)));

        let err = evaluate("result[1] > 0", &scalar(1.0)).unwrap_err();
        assert!(matches!(err, RebalanceError::Retrieval(_)));
    }

    #[test]
    fn syntax_errors_are_config_errors() {
        for bad in [
            "",
            "result",
            "result >",
            "value > 1",
            "result > 1 &&",
            "(result > 1",
            "result > 1)",
            "result[1.5] > 0",
            "result = 1",
            "result > 1 # comment",
        ] {
            let err = evaluate(bad, &scalar(1.0)).unwrap_err();
            assert!(matches!(err, RebalanceError::Config(_)), "{bad:?} gave {err:?}");
        }
    }
}
