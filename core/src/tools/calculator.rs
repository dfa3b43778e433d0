use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

use crate::traits::Tool;

// A leading minus belongs to the expression only when no word character
// or decimal point sits right before it.
static EXPRESSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\w.])(-?[\d(][\d\s.+\-*/%()^]*[\d)])").expect("valid regex")
});
static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(\.\d+)?").expect("valid regex"));
static CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(what\s+is|what's|how\s+much\s+is|calculate|compute|evaluate|solve)\b")
        .expect("valid regex")
});

const OPERATORS: &[char] = &['+', '-', '*', '/', '%', '^'];

/// Answers arithmetic questions such as "What is 123 * 456?" locally.
#[derive(Debug, Default, Clone, Copy)]
pub struct CalculatorTool;

impl CalculatorTool {
    pub fn new() -> Self {
        Self
    }

    /// The arithmetic span of `message`, if the message asks for one.
    ///
    /// Dates, phone numbers and scores inside prose look like arithmetic, so
    /// a span only counts when the message is the bare expression or carries
    /// a cue such as "what is" or "calculate".
    fn find_expression(message: &str) -> Option<&str> {
        let span = EXPRESSION
            .captures_iter(message)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim())
            .find(|span| span.contains(OPERATORS) && NUMBER.find_iter(span).count() >= 2)?;

        let bare = message
            .trim()
            .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '?' | '=' | '.' | '!'));
        (bare == span || CUE.is_match(message)).then_some(span)
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate arithmetic expressions with + - * / % ^ and parentheses"
    }

    fn matches(&self, message: &str) -> bool {
        Self::find_expression(message).is_some()
    }

    async fn run(&self, message: &str) -> Result<String> {
        let span = Self::find_expression(message)
            .ok_or_else(|| anyhow!("No arithmetic expression found"))?;
        let expression = span.split_whitespace().collect::<Vec<_>>().join(" ");
        let value = evaluate(&expression)?;
        Ok(format!("{} = {}", expression, format_number(value)))
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Op(char),
    Open,
    Close,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        match ch {
            c if c.is_whitespace() => {}
            '(' => tokens.push(Token::Open),
            ')' => tokens.push(Token::Close),
            c if OPERATORS.contains(&c) => tokens.push(Token::Op(c)),
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, next)) = chars.peek() {
                    if next.is_ascii_digit() || next == '.' {
                        end = i + next.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let literal = &input[start..end];
                let number = literal
                    .parse::<f64>()
                    .map_err(|_| anyhow!("Invalid number '{}'", literal))?;
                tokens.push(Token::Number(number));
            }
            other => bail!("Unexpected character '{}'", other),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expression(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64> {
        let mut value = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                _ if rhs == 0.0 => bail!("Division by zero"),
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<f64> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    // Right-associative: 2^3^2 == 2^9.
    fn power(&mut self) -> Result<f64> {
        let base = self.primary()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::Open) => {
                let value = self.expression()?;
                match self.next() {
                    Some(Token::Close) => Ok(value),
                    _ => bail!("Missing closing parenthesis"),
                }
            }
            Some(Token::Op(op)) => bail!("Unexpected operator '{}'", op),
            Some(Token::Close) => bail!("Unexpected ')'"),
            None => bail!("Unexpected end of expression"),
        }
    }
}

pub fn evaluate(expression: &str) -> Result<f64> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        bail!("Empty expression");
    }

    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expression()?;

    if parser.pos < parser.tokens.len() {
        bail!("Malformed expression '{}'", expression);
    }
    if !value.is_finite() {
        bail!("Result of '{}' is not finite", expression);
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn answers_multiplication_question() {
        let tool = CalculatorTool::new();
        assert!(tool.matches("What is 123 * 456?"));
        assert_eq!(tool.run("What is 123 * 456?").await.unwrap(), "123 * 456 = 56088");
    }

    #[test]
    fn ignores_plain_text_and_lone_numbers() {
        let tool = CalculatorTool::new();
        assert!(!tool.matches("Tell me a story"));
        assert!(!tool.matches("I was born in 1990"));
        assert!(!tool.matches("Is (42) the answer?"));
    }

    #[test]
    fn numbers_inside_prose_go_to_the_model() {
        let tool = CalculatorTool::new();
        assert!(!tool.matches("Remind me about my appointment on 2024-01-15"));
        assert!(!tool.matches("Call me at 555-1234 tomorrow"));
        assert!(!tool.matches("I got 3/4 on the quiz, is that good?"));
        assert!(!tool.matches("Route 66-A is closed, 4 + lanes"));

        assert!(tool.matches("12 * 12"));
        assert!(tool.matches("12 * 12 = ?"));
        assert!(tool.matches("Calculate 3/4 for me"));
        assert!(tool.matches("what's 2+2"));
    }

    #[tokio::test]
    async fn keeps_leading_minus() {
        let tool = CalculatorTool::new();
        assert_eq!(tool.run("What is -5 + 3?").await.unwrap(), "-5 + 3 = -2");
        assert_eq!(tool.run("-(2 * 4) + 1").await.unwrap(), "-(2 * 4) + 1 = -7");
        assert_eq!(tool.run("what is 10-4").await.unwrap(), "10-4 = 6");
    }

    #[test]
    fn respects_precedence_and_grouping() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("2 ^ 3 ^ 2").unwrap(), 512.0);
        assert_eq!(evaluate("-2 ^ 2").unwrap(), -4.0);
        assert_eq!(evaluate("10 - 4 - 3").unwrap(), 3.0);
        assert_eq!(evaluate("17 % 5").unwrap(), 2.0);
    }

    #[tokio::test]
    async fn formats_fractions_and_collapses_whitespace() {
        let tool = CalculatorTool::new();
        assert_eq!(tool.run("compute 1   /  4 please").await.unwrap(), "1 / 4 = 0.25");
        assert_eq!(tool.run("(1.5 + 1.5) * 2").await.unwrap(), "(1.5 + 1.5) * 2 = 6");
    }

    #[tokio::test]
    async fn rejects_bad_input() {
        let tool = CalculatorTool::new();
        assert!(tool.run("what is 5 / 0?").await.is_err());
        assert!(tool.run("what is 5 % 0?").await.is_err());
        assert!(tool.run("what is 2 + * 3?").await.is_err());
        assert!(tool.run("what is (2 + 3?").await.is_err());
        assert!(evaluate("1.2.3 + 1").is_err());
    }
}
