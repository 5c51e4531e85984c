//! 语法分析器
//!
//! 递归下降 + 优先级爬升。优先级由低到高：
//! 相等（`= == !=`）< 关系（`< <= > >=`）< 加减 < 乘除取模 < 一元负号 < 基本项。
//! 二元运算全部左结合。
//!
//! `max_depth` 同时限制括号嵌套层数和生成的语法树高度，
//! 求值与析构都按树高递归，超出限制的表达式在解析阶段即被拒绝。

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::ParseError;
use crate::lexer::{Token, TokenKind};
use crate::value::Value;

/// 默认最大嵌套深度
pub const DEFAULT_MAX_DEPTH: usize = 64;

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self::with_max_depth(tokens, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(mut tokens: Vec<Token>, max_depth: usize) -> Self {
        // 保证末尾总有 Eof，手工构造的 token 序列也能安全解析
        if !matches!(tokens.last(), Some(Token { kind: TokenKind::Eof, .. })) {
            let position = tokens.last().map_or(0, |t| t.position + 1);
            tokens.push(Token {
                kind: TokenKind::Eof,
                position,
            });
        }

        Self {
            tokens,
            position: 0,
            depth: 0,
            max_depth,
        }
    }

    /// 解析完整表达式，要求消费掉全部 token
    pub fn parse(mut self) -> Result<Expr, ParseError> {
        if matches!(self.current().kind, TokenKind::Eof) {
            return Err(ParseError::new(self.current().position, "表达式为空"));
        }

        let expr = self.parse_expression()?;

        let token = self.current();
        match token.kind {
            TokenKind::Eof => Ok(expr),
            TokenKind::RightParen => Err(ParseError::new(token.position, "多余的右括号")),
            ref kind => Err(ParseError::new(
                token.position,
                format!("表达式结束后出现多余的 {}", kind.describe()),
            )),
        }
    }

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        let mut height = left.height();

        while let Some((op, precedence)) = binary_operator(&self.current().kind) {
            if precedence < min_precedence {
                break;
            }
            let position = self.current().position;
            self.advance();

            let right = self.parse_binary(precedence + 1)?;
            // 左结合的长链只加深左子树，逐个运算符累计高度
            height = 1 + height.max(right.height());
            self.check_height(height, position)?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.current().kind, TokenKind::Minus) {
            let position = self.current().position;
            self.advance();
            self.enter(position)?;
            let operand = self.parse_unary()?;
            self.leave();
            self.check_height(1 + operand.height(), position)?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.current().clone();

        match token.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Literal(Value::Number(n)))
            }
            TokenKind::Text(s) => {
                self.advance();
                Ok(Expr::Literal(Value::Text(s)))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                if matches!(self.current().kind, TokenKind::LeftParen) {
                    self.parse_call(name, token.position)
                } else {
                    Ok(Expr::Field(name))
                }
            }
            TokenKind::LeftParen => {
                self.advance();
                self.enter(token.position)?;
                let expr = self.parse_expression()?;
                self.leave();
                self.expect_right_paren(token.position)?;
                Ok(expr)
            }
            TokenKind::Eof => Err(ParseError::new(token.position, "缺少操作数")),
            ref kind => Err(ParseError::new(
                token.position,
                format!("此处需要操作数, 却遇到 {}", kind.describe()),
            )),
        }
    }

    /// 解析函数调用参数，当前 token 为 `(`
    fn parse_call(&mut self, name: String, position: usize) -> Result<Expr, ParseError> {
        let open = self.current().position;
        self.advance();
        self.enter(position)?;

        let mut args = Vec::new();

        if !matches!(self.current().kind, TokenKind::RightParen) {
            loop {
                args.push(self.parse_expression()?);

                if matches!(self.current().kind, TokenKind::Comma) {
                    self.advance();
                    if matches!(self.current().kind, TokenKind::RightParen) {
                        return Err(ParseError::new(
                            self.current().position,
                            format!("函数 {} 的参数列表末尾多了逗号", name),
                        ));
                    }
                } else {
                    break;
                }
            }
        }

        self.leave();
        self.expect_right_paren(open)?;

        let height = 1 + args.iter().map(Expr::height).max().unwrap_or(0);
        self.check_height(height, position)?;

        Ok(Expr::Call { name, args })
    }

    fn expect_right_paren(&mut self, open: usize) -> Result<(), ParseError> {
        let token = self.current();
        match token.kind {
            TokenKind::RightParen => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof => Err(ParseError::new(
                token.position,
                format!("位置 {} 的左括号缺少匹配的右括号", open),
            )),
            ref kind => Err(ParseError::new(
                token.position,
                format!("此处需要 ')', 却遇到 {}", kind.describe()),
            )),
        }
    }

    fn enter(&mut self, position: usize) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ParseError::new(
                position,
                format!("表达式嵌套超过最大深度 {}", self.max_depth),
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn check_height(&self, height: usize, position: usize) -> Result<(), ParseError> {
        if height > self.max_depth {
            return Err(ParseError::new(
                position,
                format!("表达式语法树深度超过最大深度 {}", self.max_depth),
            ));
        }
        Ok(())
    }

    fn current(&self) -> &Token {
        // 构造时保证最后一个 token 为 Eof，越界时停留在 Eof 上
        let index = self.position.min(self.tokens.len().saturating_sub(1));
        &self.tokens[index]
    }

    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }
}

fn binary_operator(kind: &TokenKind) -> Option<(BinaryOp, u8)> {
    let op = match kind {
        TokenKind::Equal => (BinaryOp::Eq, 1),
        TokenKind::NotEqual => (BinaryOp::NotEq, 1),
        TokenKind::Less => (BinaryOp::Lt, 2),
        TokenKind::LessEqual => (BinaryOp::LtEq, 2),
        TokenKind::Greater => (BinaryOp::Gt, 2),
        TokenKind::GreaterEqual => (BinaryOp::GtEq, 2),
        TokenKind::Plus => (BinaryOp::Add, 3),
        TokenKind::Minus => (BinaryOp::Sub, 3),
        TokenKind::Star => (BinaryOp::Mul, 4),
        TokenKind::Slash => (BinaryOp::Div, 4),
        TokenKind::Percent => (BinaryOp::Mod, 4),
        _ => return None,
    };
    Some(op)
}

/// 词法分析并解析表达式
pub fn parse(input: &str) -> Result<Expr, crate::error::RuleError> {
    let tokens = crate::lexer::tokenize(input)?;
    Ok(Parser::new(tokens).parse()?)
}
