//! 词法分析器
//!
//! 将规则表达式文本切分为 token 序列。任何无法识别的字符都会产生 `LexError`，
//! 不会被静默丢弃。

use crate::error::LexError;

/// Token 类型
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// 字段名或函数名
    Identifier(String),
    /// 数值字面量，可能包含折叠进来的负号
    Number(f64),
    /// 字符串字面量（已去除引号并处理转义）
    Text(String),

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    /// `=` 与 `==`
    Equal,
    NotEqual,

    LeftParen,
    RightParen,
    Comma,

    Eof,
}

impl TokenKind {
    /// 该 token 之后是否处于“操作数已结束”的状态
    ///
    /// 用于判断紧随其后的 `-` 是减号还是负数字面量的一部分。
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            Self::Identifier(_) | Self::Number(_) | Self::Text(_) | Self::RightParen
        )
    }

    /// 用于错误信息的简短描述
    pub fn describe(&self) -> String {
        match self {
            Self::Identifier(name) => format!("标识符 '{}'", name),
            Self::Number(n) => format!("数值 {}", n),
            Self::Text(s) => format!("字符串 \"{}\"", s),
            Self::Plus => "'+'".to_string(),
            Self::Minus => "'-'".to_string(),
            Self::Star => "'*'".to_string(),
            Self::Slash => "'/'".to_string(),
            Self::Percent => "'%'".to_string(),
            Self::Less => "'<'".to_string(),
            Self::LessEqual => "'<='".to_string(),
            Self::Greater => "'>'".to_string(),
            Self::GreaterEqual => "'>='".to_string(),
            Self::Equal => "'='".to_string(),
            Self::NotEqual => "'!='".to_string(),
            Self::LeftParen => "'('".to_string(),
            Self::RightParen => "')'".to_string(),
            Self::Comma => "','".to_string(),
            Self::Eof => "表达式结尾".to_string(),
        }
    }
}

/// Token 及其在表达式中的起始字节偏移
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, position: usize) -> Self {
        Self { kind, position }
    }
}

/// 词法分析器
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    /// 上一个 token 是否结束了一个操作数
    after_operand: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            after_operand: false,
        }
    }

    /// 切分整个输入，最后一个 token 总是 `Eof`
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::with_capacity((self.input.len() / 4).max(4));

        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            self.after_operand = token.kind.ends_operand();
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        let start = self.position;

        let Some(ch) = self.current_char() else {
            return Ok(Token::new(TokenKind::Eof, start));
        };

        let kind = match ch {
            '(' => self.single(TokenKind::LeftParen),
            ')' => self.single(TokenKind::RightParen),
            ',' => self.single(TokenKind::Comma),
            '+' => self.single(TokenKind::Plus),
            '*' => self.single(TokenKind::Star),
            '/' => self.single(TokenKind::Slash),
            '%' => self.single(TokenKind::Percent),

            '-' if !self.after_operand && self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                self.advance();
                let number = self.read_number(start)?;
                TokenKind::Number(-number)
            }
            '-' => self.single(TokenKind::Minus),

            '<' if self.peek() == Some('=') => self.double(TokenKind::LessEqual),
            '<' => self.single(TokenKind::Less),
            '>' if self.peek() == Some('=') => self.double(TokenKind::GreaterEqual),
            '>' => self.single(TokenKind::Greater),
            '=' if self.peek() == Some('=') => self.double(TokenKind::Equal),
            '=' => self.single(TokenKind::Equal),
            '!' if self.peek() == Some('=') => self.double(TokenKind::NotEqual),
            '!' => {
                return Err(LexError::new(start, "'!' 只能用于 '!='"));
            }

            '"' | '\'' => TokenKind::Text(self.read_string(ch)?),

            c if c.is_ascii_digit() => TokenKind::Number(self.read_number(start)?),

            c if c.is_ascii_alphabetic() || c == '_' => {
                TokenKind::Identifier(self.read_identifier().to_string())
            }

            c => {
                return Err(LexError::new(start, format!("无法识别的字符 '{}'", c)));
            }
        };

        Ok(Token::new(kind, start))
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek(&self) -> Option<char> {
        let mut chars = self.input[self.position..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.position += ch.len_utf8();
        }
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn double(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        self.advance();
        kind
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> &'a str {
        let start = self.position;
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        &self.input[start..self.position]
    }

    /// 读取十进制数：`digits` 或 `digits.digits`，不支持指数
    ///
    /// `token_start` 是整个字面量（含负号）的起点，仅用于错误定位。
    fn read_number(&mut self, token_start: usize) -> Result<f64, LexError> {
        let digits_start = self.position;
        self.consume_digits();

        if self.current_char() == Some('.') {
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(LexError::new(token_start, "小数点后缺少数字"));
            }
            self.advance();
            self.consume_digits();
        }

        let literal = &self.input[digits_start..self.position];
        literal
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| LexError::new(token_start, format!("无效的数值 '{}'", literal)))
    }

    fn consume_digits(&mut self) {
        while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    /// 读取字符串字面量
    ///
    /// 反斜杠只转义外层引号和反斜杠本身，其他转义序列原样保留。
    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let start = self.position;
        self.advance();

        let mut value = String::new();

        loop {
            match self.current_char() {
                None => {
                    return Err(LexError::new(start, "字符串未闭合"));
                }
                Some(ch) if ch == quote => {
                    self.advance();
                    return Ok(value);
                }
                Some('\\') => {
                    self.advance();
                    match self.current_char() {
                        Some(next) if next == quote || next == '\\' => {
                            value.push(next);
                            self.advance();
                        }
                        Some(next) => {
                            value.push('\\');
                            value.push(next);
                            self.advance();
                        }
                        None => {
                            return Err(LexError::new(start, "字符串未闭合"));
                        }
                    }
                }
                Some(ch) => {
                    value.push(ch);
                    self.advance();
                }
            }
        }
    }
}

/// 对表达式进行词法分析
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input).tokenize()
}
