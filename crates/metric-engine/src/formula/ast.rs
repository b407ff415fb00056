//! Restricted arithmetic language for custom metrics.
//!
//! Numbers, field identifiers, `+ - * / %`, unary sign, parentheses and a
//! fixed set of math functions. There is no way to name anything outside
//! the field scope handed to [`Expr::evaluate`].

use std::collections::HashMap;

use metrics_core::MetricsError;

/// Deepest nesting of parentheses, signs and calls accepted.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Abs,
    Sqrt,
    Min,
    Max,
    Pow,
    Round,
    Floor,
    Ceil,
    Log,
    Log10,
    Exp,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "abs" => Function::Abs,
            "sqrt" => Function::Sqrt,
            "min" => Function::Min,
            "max" => Function::Max,
            "pow" => Function::Pow,
            "round" => Function::Round,
            "floor" => Function::Floor,
            "ceil" => Function::Ceil,
            "log" => Function::Log,
            "log10" => Function::Log10,
            "exp" => Function::Exp,
            _ => return None,
        })
    }

    /// (minimum, maximum) argument count.
    fn arity(&self) -> (usize, usize) {
        match self {
            Function::Min | Function::Max => (1, usize::MAX),
            Function::Pow => (2, 2),
            _ => (1, 1),
        }
    }

    fn apply(&self, args: &[f64]) -> f64 {
        match self {
            Function::Abs => args[0].abs(),
            Function::Sqrt => args[0].sqrt(),
            Function::Min => args.iter().copied().fold(f64::INFINITY, f64::min),
            Function::Max => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Function::Pow => args[0].powf(args[1]),
            Function::Round => (args[0] + 0.5).floor(),
            Function::Floor => args[0].floor(),
            Function::Ceil => args[0].ceil(),
            Function::Log => args[0].ln(),
            Function::Log10 => args[0].log10(),
            Function::Exp => args[0].exp(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// The `null` literal. Any arithmetic touching it has no value.
    Null,
    Field(String),
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        function: Function,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Evaluate against a sanitized-name scope. `Ok(None)` means the result
    /// has no value (a `null` operand); an identifier missing from the scope
    /// is an error.
    pub fn evaluate(&self, scope: &HashMap<String, f64>) -> Result<Option<f64>, MetricsError> {
        Ok(match self {
            Expr::Number(n) => Some(*n),
            Expr::Null => None,
            Expr::Field(name) => match scope.get(name) {
                Some(v) => Some(*v),
                None => return Err(MetricsError::UnknownFields(vec![name.clone()])),
            },
            Expr::Negate(inner) => inner.evaluate(scope)?.map(|v| -v),
            Expr::Binary { op, lhs, rhs } => {
                let (Some(a), Some(b)) = (lhs.evaluate(scope)?, rhs.evaluate(scope)?) else {
                    return Ok(None);
                };
                Some(match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Rem => a % b,
                })
            }
            Expr::Call { function, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    match arg.evaluate(scope)? {
                        Some(v) => values.push(v),
                        None => return Ok(None),
                    }
                }
                Some(function.apply(&values))
            }
        })
    }

    /// Every field identifier in the expression, in first-use order.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Field(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Expr::Negate(inner) => inner.collect_fields(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_fields(out);
                rhs.collect_fields(out);
            }
            Expr::Call { args, .. } => args.iter().for_each(|a| a.collect_fields(out)),
            Expr::Number(_) | Expr::Null => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Comma,
    Dot,
}

fn invalid(message: impl Into<String>) -> MetricsError {
    MetricsError::InvalidFormula(message.into())
}

fn tokenize(text: &str) -> Result<Vec<Token>, MetricsError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let starts_number =
            c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit()));
        if starts_number {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    while j < chars.len() && chars[j].is_ascii_digit() {
                        j += 1;
                    }
                    i = j;
                }
            }
            let literal: String = chars[start..i].iter().collect();
            let value = literal
                .parse::<f64>()
                .map_err(|_| invalid(format!("bad number '{}'", literal)))?;
            tokens.push(Token::Number(value));
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' || c == '$' {
            let start = i;
            while i < chars.len()
                && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '$')
            {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
            continue;
        }

        tokens.push(match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '.' => Token::Dot,
            other => return Err(invalid(format!("unsupported character '{}'", other))),
        });
        i += 1;
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), MetricsError> {
        match self.next() {
            Some(ref t) if *t == expected => Ok(()),
            Some(t) => Err(invalid(format!("expected {:?}, found {:?}", expected, t))),
            None => Err(invalid(format!("expected {:?}, found end of formula", expected))),
        }
    }

    fn enter(&mut self) -> Result<(), MetricsError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(invalid("formula is nested too deeply"));
        }
        Ok(())
    }

    fn expression(&mut self) -> Result<Expr, MetricsError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn term(&mut self) -> Result<Expr, MetricsError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, MetricsError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                self.enter()?;
                let inner = self.unary()?;
                self.depth -= 1;
                Ok(Expr::Negate(Box::new(inner)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.enter()?;
                let inner = self.unary();
                self.depth -= 1;
                inner
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, MetricsError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::LParen) => {
                self.enter()?;
                let inner = self.expression()?;
                self.expect(Token::RParen)?;
                self.depth -= 1;
                Ok(inner)
            }
            Some(Token::Ident(name)) => self.identifier(name),
            Some(t) => Err(invalid(format!("unexpected {:?}", t))),
            None => Err(invalid("unexpected end of formula")),
        }
    }

    fn identifier(&mut self, name: String) -> Result<Expr, MetricsError> {
        if name == "Math" {
            self.expect(Token::Dot)?;
            let member = match self.next() {
                Some(Token::Ident(member)) => member,
                _ => return Err(invalid("expected a Math member after 'Math.'")),
            };
            return match member.as_str() {
                "PI" => Ok(Expr::Number(std::f64::consts::PI)),
                "E" => Ok(Expr::Number(std::f64::consts::E)),
                _ => match Function::from_name(&member) {
                    Some(function) => self.call(function),
                    None => Err(invalid(format!("unknown function 'Math.{}'", member))),
                },
            };
        }

        match name.as_str() {
            "true" => return Ok(Expr::Number(1.0)),
            "false" => return Ok(Expr::Number(0.0)),
            "null" | "undefined" => return Ok(Expr::Null),
            _ => {}
        }

        if self.peek() == Some(&Token::LParen) {
            return match Function::from_name(&name) {
                Some(function) => self.call(function),
                None => Err(invalid(format!("unknown function '{}'", name))),
            };
        }
        Ok(Expr::Field(name))
    }

    fn call(&mut self, function: Function) -> Result<Expr, MetricsError> {
        self.expect(Token::LParen)?;
        self.enter()?;
        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                args.push(self.expression()?);
                if self.peek() == Some(&Token::Comma) {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RParen)?;
        self.depth -= 1;

        let (min, max) = function.arity();
        if args.len() < min || args.len() > max {
            return Err(invalid(format!(
                "{:?} takes {} argument(s), got {}",
                function,
                if min == max { min.to_string() } else { format!("at least {}", min) },
                args.len()
            )));
        }
        Ok(Expr::Call { function, args })
    }
}

/// Parse a sanitized, field-substituted formula.
pub fn parse_expression(text: &str) -> Result<Expr, MetricsError> {
    let mut parser = Parser {
        tokens: tokenize(text)?,
        pos: 0,
        depth: 0,
    };
    if parser.tokens.is_empty() {
        return Err(invalid("formula is empty"));
    }
    let expr = parser.expression()?;
    if let Some(extra) = parser.peek() {
        return Err(invalid(format!("unexpected {:?} after expression", extra)));
    }
    Ok(expr)
}
