use serde_json::{Number, Value};

use super::{CompareOp, Expr};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    True,
    False,
    Null,
    And,
    Or,
    Not,
    In,
    Compare(CompareOp),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier '{name}'"),
            Token::Str(text) => format!("string \"{text}\""),
            Token::Num(number) => format!("number {number}"),
            Token::True => "'true'".to_string(),
            Token::False => "'false'".to_string(),
            Token::Null => "'null'".to_string(),
            Token::And => "'and'".to_string(),
            Token::Or => "'or'".to_string(),
            Token::Not => "'not'".to_string(),
            Token::In => "'in'".to_string(),
            Token::Compare(op) => format!("'{}'", op.symbol()),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::Comma => "','".to_string(),
        }
    }
}

/// Position-tagged parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParseError {
    pub(crate) position: usize,
    pub(crate) message: String,
}

impl ParseError {
    fn at(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

pub(crate) fn parse(source: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(ParseError::at(0, "expression is empty"));
    }
    let mut parser = Parser {
        tokens,
        cursor: 0,
        end: source.len(),
    };
    let expr = parser.or_expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some((position, token)) => Err(ParseError::at(
            position,
            format!("unexpected {}", token.describe()),
        )),
    }
}

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, ParseError> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (position, ch) = chars[i];
        let next = chars.get(i + 1).map(|(_, c)| *c);

        if ch.is_whitespace() {
            i += 1;
            continue;
        }

        let (token, width) = match (ch, next) {
            ('=', Some('=')) => (Token::Compare(CompareOp::Eq), 2),
            ('!', Some('=')) => (Token::Compare(CompareOp::Ne), 2),
            ('<', Some('=')) => (Token::Compare(CompareOp::Lte), 2),
            ('>', Some('=')) => (Token::Compare(CompareOp::Gte), 2),
            ('&', Some('&')) => (Token::And, 2),
            ('|', Some('|')) => (Token::Or, 2),
            ('<', _) => (Token::Compare(CompareOp::Lt), 1),
            ('>', _) => (Token::Compare(CompareOp::Gt), 1),
            ('!', _) => (Token::Not, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('[', _) => (Token::LBracket, 1),
            (']', _) => (Token::RBracket, 1),
            (',', _) => (Token::Comma, 1),
            ('"' | '\'', _) => {
                let (text, consumed) = read_string(&chars, i)?;
                tokens.push((position, Token::Str(text)));
                i += consumed;
                continue;
            }
            ('-', Some(digit)) if digit.is_ascii_digit() => {
                let (number, consumed) = read_number(&chars, i)?;
                tokens.push((position, Token::Num(number)));
                i += consumed;
                continue;
            }
            (digit, _) if digit.is_ascii_digit() => {
                let (number, consumed) = read_number(&chars, i)?;
                tokens.push((position, Token::Num(number)));
                i += consumed;
                continue;
            }
            (start, _) if start.is_alphabetic() || start == '_' => {
                let mut end = i;
                while end < chars.len() {
                    let c = chars[end].1;
                    if c.is_alphanumeric() || c == '_' || c == '.' {
                        end += 1;
                    } else {
                        break;
                    }
                }
                let word: String = chars[i..end].iter().map(|(_, c)| *c).collect();
                let token = match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "in" => Token::In,
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    _ => Token::Ident(word),
                };
                tokens.push((position, token));
                i = end;
                continue;
            }
            (other, _) => {
                return Err(ParseError::at(
                    position,
                    format!("unexpected character '{other}'"),
                ))
            }
        };

        tokens.push((position, token));
        i += width;
    }

    Ok(tokens)
}

fn read_string(chars: &[(usize, char)], start: usize) -> Result<(String, usize), ParseError> {
    let (position, quote) = chars[start];
    let mut text = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        let ch = chars[i].1;
        if ch == quote {
            return Ok((text, i - start + 1));
        }
        if ch == '\\' {
            let escaped = chars
                .get(i + 1)
                .map(|(_, c)| *c)
                .ok_or_else(|| ParseError::at(chars[i].0, "dangling escape"))?;
            text.push(match escaped {
                'n' => '\n',
                't' => '\t',
                other => other,
            });
            i += 2;
            continue;
        }
        text.push(ch);
        i += 1;
    }
    Err(ParseError::at(position, "unterminated string literal"))
}

fn read_number(chars: &[(usize, char)], start: usize) -> Result<(f64, usize), ParseError> {
    let mut end = start + 1;
    while end < chars.len() && (chars[end].1.is_ascii_digit() || chars[end].1 == '.') {
        end += 1;
    }
    let literal: String = chars[start..end].iter().map(|(_, c)| *c).collect();
    literal
        .parse::<f64>()
        .map(|number| (number, end - start))
        .map_err(|_| ParseError::at(chars[start].0, format!("invalid number '{literal}'")))
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    cursor: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<(usize, &Token)> {
        self.tokens
            .get(self.cursor)
            .map(|(position, token)| (*position, token))
    }

    fn peek_second(&self) -> Option<&Token> {
        self.tokens.get(self.cursor + 1).map(|(_, token)| token)
    }

    fn advance(&mut self) -> Option<(usize, Token)> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if matches!(self.peek(), Some((_, token)) if token == expected) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        match self.advance() {
            Some((_, token)) if token == expected => Ok(()),
            Some((position, token)) => Err(ParseError::at(
                position,
                format!("expected {} but found {}", expected.describe(), token.describe()),
            )),
            None => Err(ParseError::at(
                self.end,
                format!("expected {} at end of expression", expected.describe()),
            )),
        }
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.and_expr()?;
        while self.eat(&Token::Or) {
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.not_expr()?;
        while self.eat(&Token::And) {
            let right = self.not_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Not) {
            let inner = self.not_expr()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.operand()?;
        match self.peek() {
            Some((_, Token::Compare(op))) => {
                let op = *op;
                self.cursor += 1;
                let right = self.operand()?;
                Ok(Expr::Compare {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            Some((_, Token::In)) => {
                self.cursor += 1;
                let haystack = self.operand()?;
                Ok(Expr::In {
                    needle: Box::new(left),
                    haystack: Box::new(haystack),
                    negated: false,
                })
            }
            Some((_, Token::Not)) if self.peek_second() == Some(&Token::In) => {
                self.cursor += 2;
                let haystack = self.operand()?;
                Ok(Expr::In {
                    needle: Box::new(left),
                    haystack: Box::new(haystack),
                    negated: true,
                })
            }
            _ => Ok(left),
        }
    }

    fn operand(&mut self) -> Result<Expr, ParseError> {
        let Some((position, token)) = self.advance() else {
            return Err(ParseError::at(self.end, "expected a value at end of expression"));
        };
        match token {
            Token::Ident(path) => Ok(Expr::Answer(path)),
            Token::Str(text) => Ok(Expr::Literal(Value::String(text))),
            Token::Num(number) => Ok(Expr::Literal(number_value(number))),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Null => Ok(Expr::Literal(Value::Null)),
            Token::LParen => {
                let inner = self.or_expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => {
                let mut items = Vec::new();
                if self.eat(&Token::RBracket) {
                    return Ok(Expr::List(items));
                }
                loop {
                    items.push(self.or_expr()?);
                    if self.eat(&Token::Comma) {
                        continue;
                    }
                    self.expect(Token::RBracket)?;
                    break;
                }
                Ok(Expr::List(items))
            }
            other => Err(ParseError::at(
                position,
                format!("expected a value but found {}", other.describe()),
            )),
        }
    }
}

fn number_value(number: f64) -> Value {
    if number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
        Value::from(number as i64)
    } else {
        Number::from_f64(number)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_precedence_of_and_over_or() {
        let expr = parse("a == 1 or b == 2 and c == 3").expect("parses");
        assert!(matches!(expr, Expr::Or(_, right) if matches!(*right, Expr::And(_, _))));
    }

    #[test]
    fn parses_not_in_as_negated_membership() {
        let expr = parse("country not in ['UK', 'IE']").expect("parses");
        assert!(matches!(expr, Expr::In { negated: true, .. }));
    }

    #[test]
    fn reports_position_of_unexpected_token() {
        let err = parse("age >= ").expect_err("missing operand");
        assert_eq!(err.position, 7);

        let err = parse("age 18").expect_err("dangling operand");
        assert_eq!(err.position, 4);
        assert!(err.message.contains("number 18"));
    }

    #[test]
    fn rejects_unterminated_strings() {
        let err = parse("name == \"Ada").expect_err("unterminated");
        assert!(err.message.contains("unterminated"));
    }
}
