use crate::compiler::artifact::Artifact;
use crate::compiler::generator::{CallSite, CodeGenerator};
use crate::compiler::ir::Operation;
use crate::compiler::types::{Operand, Type};
use crate::error::{Error, Result};
use crate::lexer::{Token, TokenKind};
use crate::memory::Value;

/// Recursive-descent parser for OOPL.
///
/// There is no syntax tree: every construct is handed to the
/// [`CodeGenerator`] as soon as it is recognized, so quadruples are emitted
/// in a single pass. Errors raised by the generator are tagged with the
/// position of the construct being compiled.
pub struct Parser<'g> {
    tokens: Vec<Token>,
    current: usize,
    generator: &'g mut CodeGenerator,
}

impl<'g> Parser<'g> {
    /// Creates a parser over a token stream ending in `Eof`
    pub fn new(tokens: Vec<Token>, generator: &'g mut CodeGenerator) -> Self {
        Parser {
            tokens,
            current: 0,
            generator,
        }
    }

    /// Compiles the whole program
    pub fn parse(&mut self) -> Result<Artifact> {
        let start = self.consume(TokenKind::Program, "'program'")?;
        let name = self.identifier()?;
        self.lower(&start, |g| g.begin_program(&name))?;
        self.consume(TokenKind::Semicolon, "';'")?;

        while !self.is_at_end() {
            self.declaration()?;
        }

        let end = self.peek().clone();
        self.lower(&end, |g| g.end_program())
    }

    /// Runs a generator action, attaching the position of `at` to its error
    fn lower<T>(
        &mut self,
        at: &Token,
        action: impl FnOnce(&mut CodeGenerator) -> Result<T>,
    ) -> Result<T> {
        action(&mut *self.generator).map_err(|e| e.at(at.line, at.column))
    }

    // ---------------------------------------------------------------------
    // Declarations
    // ---------------------------------------------------------------------

    fn declaration(&mut self) -> Result<()> {
        if self.check(&TokenKind::Class) {
            return self.class_declaration();
        }
        let start = self.peek().clone();
        let ty = self.type_name(true)?;
        let name = self.identifier()?;
        if self.check(&TokenKind::LeftParen) {
            self.function(&start, ty, name)
        } else {
            self.variable_list(&start, ty, name)
        }
    }

    fn class_declaration(&mut self) -> Result<()> {
        let start = self.advance();
        let name = self.identifier()?;
        let parent = if self.match_kind(&TokenKind::Colon) {
            Some(self.identifier()?)
        } else {
            None
        };
        self.lower(&start, |g| g.begin_class(&name, parent.as_deref()))?;
        self.consume(TokenKind::LeftBrace, "'{' to open the class body")?;

        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            let member = self.peek().clone();
            let ty = self.type_name(true)?;
            let field = self.identifier()?;
            if self.check(&TokenKind::LeftParen) {
                self.function(&member, ty, field)?;
            } else {
                self.variable_list(&member, ty, field)?;
            }
        }

        let end = self.consume(TokenKind::RightBrace, "'}' to close the class body")?;
        self.match_kind(&TokenKind::Semicolon);
        self.lower(&end, |g| g.end_class())
    }

    /// `ID dims ("," ID dims)* ";"`, the type and first name already consumed
    fn variable_list(&mut self, start: &Token, ty: Type, first: String) -> Result<()> {
        let mut name = first;
        let mut at = start.clone();
        loop {
            let dims = self.dimensions()?;
            let declared = ty.clone();
            self.lower(&at, |g| g.declare_variable(&name, declared, &dims))?;
            if !self.match_kind(&TokenKind::Comma) {
                break;
            }
            at = self.peek().clone();
            name = self.identifier()?;
        }
        self.consume(TokenKind::Semicolon, "';' after declaration")?;
        Ok(())
    }

    fn dimensions(&mut self) -> Result<Vec<i64>> {
        let mut dims = Vec::new();
        while self.match_kind(&TokenKind::LeftBracket) {
            let token = self.advance();
            match token.kind {
                TokenKind::Integer(n) => dims.push(n),
                TokenKind::Minus => match self.advance().kind {
                    TokenKind::Integer(n) => dims.push(-n),
                    _ => return Err(self.error_at(&token, "expected array size")),
                },
                _ => return Err(self.error_at(&token, "expected array size")),
            }
            self.consume(TokenKind::RightBracket, "']'")?;
        }
        Ok(dims)
    }

    /// Header and body (or `;`) of a function, the return type and name already consumed
    fn function(&mut self, start: &Token, return_type: Type, name: String) -> Result<()> {
        self.consume(TokenKind::LeftParen, "'('")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                let ty = self.type_name(false)?;
                params.push((self.identifier()?, ty));
                if !self.match_kind(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "')' after parameters")?;

        if self.match_kind(&TokenKind::Semicolon) {
            return self.lower(start, |g| g.declare_function(&name, return_type, &params));
        }

        self.lower(start, |g| g.begin_function(&name, return_type, &params))?;
        self.consume(TokenKind::LeftBrace, "'{' to open the function body")?;
        self.statements()?;
        let end = self.consume(TokenKind::RightBrace, "'}' to close the function body")?;
        self.lower(&end, |g| g.end_function())
    }

    /// `int | float | bool | string | ID`, and `void` where allowed
    fn type_name(&mut self, allow_void: bool) -> Result<Type> {
        let token = self.advance();
        let ty = match &token.kind {
            TokenKind::IntType => Type::Int,
            TokenKind::FloatType => Type::Float,
            TokenKind::BoolType => Type::Bool,
            TokenKind::StringType => Type::String,
            TokenKind::Void if allow_void => Type::Void,
            TokenKind::Identifier(class) => Type::Class(class.clone()),
            other => {
                return Err(self.error_at(&token, format!("expected a type, found {}", other)));
            }
        };
        Ok(ty)
    }

    // ---------------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------------

    /// Statements up to the closing `}` of the enclosing block
    fn statements(&mut self) -> Result<()> {
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            self.statement()?;
        }
        Ok(())
    }

    fn block(&mut self) -> Result<()> {
        let open = self.consume(TokenKind::LeftBrace, "'{'")?;
        self.generator.begin_block();
        self.statements()?;
        self.consume(TokenKind::RightBrace, "'}'")?;
        self.lower(&open, |g| g.end_block())
    }

    fn statement(&mut self) -> Result<()> {
        let start = self.peek().clone();
        match &start.kind {
            kind if kind.is_simple_type() => {
                let ty = self.type_name(false)?;
                let name = self.identifier()?;
                self.variable_list(&start, ty, name)
            }
            TokenKind::Identifier(_) if self.check_next_identifier() => {
                let ty = self.type_name(false)?;
                let name = self.identifier()?;
                self.variable_list(&start, ty, name)
            }
            TokenKind::Identifier(_) | TokenKind::This => {
                self.assignment_or_call()?;
                self.consume(TokenKind::Semicolon, "';' after statement")?;
                Ok(())
            }
            TokenKind::Print => self.print_statement(),
            TokenKind::Read => self.read_statement(),
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::For => self.for_statement(),
            TokenKind::Break => {
                self.advance();
                self.lower(&start, |g| g.break_loop())?;
                self.consume(TokenKind::Semicolon, "';' after 'break'")?;
                Ok(())
            }
            TokenKind::Return => self.return_statement(),
            TokenKind::LeftBrace => self.block(),
            other => Err(self.error_at(&start, format!("unexpected {}", other))),
        }
    }

    /// `var = expr` or `path(args)`
    fn assignment_or_call(&mut self) -> Result<()> {
        let start = self.peek().clone();
        let path = self.path()?;
        if self.check(&TokenKind::LeftParen) {
            self.call(&start, &path)?;
            return Ok(());
        }
        let target = self.access(&start, &path)?;
        self.assign_rest(&start, target)
    }

    /// `var = expr` where the statement must be an assignment
    fn assignment(&mut self) -> Result<()> {
        let start = self.peek().clone();
        let path = self.path()?;
        let target = self.access(&start, &path)?;
        self.assign_rest(&start, target)
    }

    fn assign_rest(&mut self, start: &Token, target: Operand) -> Result<()> {
        self.consume(TokenKind::Assign, "'='")?;
        let value = self.expression()?;
        self.lower(start, |g| g.assign(target, value))
    }

    fn print_statement(&mut self) -> Result<()> {
        self.advance();
        self.consume(TokenKind::LeftParen, "'(' after 'print'")?;
        loop {
            let at = self.peek().clone();
            let value = self.expression()?;
            self.lower(&at, |g| g.print(value))?;
            if !self.match_kind(&TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::RightParen, "')'")?;
        self.consume(TokenKind::Semicolon, "';' after 'print'")?;
        Ok(())
    }

    fn read_statement(&mut self) -> Result<()> {
        let start = self.advance();
        self.consume(TokenKind::LeftParen, "'(' after 'read'")?;
        let at = self.peek().clone();
        let path = self.path()?;
        let target = self.access(&at, &path)?;
        self.consume(TokenKind::RightParen, "')'")?;
        self.consume(TokenKind::Semicolon, "';' after 'read'")?;
        self.lower(&start, |g| g.read(target))
    }

    fn if_statement(&mut self) -> Result<()> {
        let start = self.advance();
        self.generator.begin_if();
        self.condition(&start, |g, cond| g.if_condition(cond))?;
        self.block()?;

        while self.check(&TokenKind::ElseIf) {
            let branch = self.advance();
            self.lower(&branch, |g| g.begin_elseif())?;
            self.condition(&branch, |g, cond| g.if_condition(cond))?;
            self.block()?;
        }

        if self.check(&TokenKind::Else) {
            let branch = self.advance();
            self.lower(&branch, |g| g.begin_else())?;
            self.block()?;
        }

        self.lower(&start, |g| g.end_if())
    }

    fn while_statement(&mut self) -> Result<()> {
        let start = self.advance();
        self.generator.begin_while();
        self.condition(&start, |g, cond| g.while_condition(cond))?;
        self.block()?;
        self.lower(&start, |g| g.end_while())
    }

    fn for_statement(&mut self) -> Result<()> {
        let start = self.advance();
        self.consume(TokenKind::LeftParen, "'(' after 'for'")?;
        self.generator.begin_for();
        if !self.check(&TokenKind::Semicolon) {
            self.assignment()?;
        }
        self.consume(TokenKind::Semicolon, "';' after the loop initializer")?;

        self.generator.for_condition_start();
        let at = self.peek().clone();
        let cond = self.expression()?;
        self.lower(&at, |g| g.for_condition(cond))?;
        self.consume(TokenKind::Semicolon, "';' after the loop condition")?;

        if !self.check(&TokenKind::RightParen) {
            self.assignment()?;
        }
        self.consume(TokenKind::RightParen, "')'")?;
        self.lower(&start, |g| g.for_step_end())?;

        self.block()?;
        self.lower(&start, |g| g.end_for())
    }

    fn return_statement(&mut self) -> Result<()> {
        let start = self.advance();
        let value = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::Semicolon, "';' after 'return'")?;
        self.lower(&start, |g| g.return_value(value))
    }

    /// `"(" expr ")"` handed to a condition hook
    fn condition(
        &mut self,
        start: &Token,
        hook: impl FnOnce(&mut CodeGenerator, Operand) -> Result<()>,
    ) -> Result<()> {
        self.consume(TokenKind::LeftParen, "'(' before the condition")?;
        let cond = self.expression()?;
        self.consume(TokenKind::RightParen, "')' after the condition")?;
        self.lower(start, |g| hook(g, cond))
    }

    // ---------------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------------

    fn expression(&mut self) -> Result<Operand> {
        let mut left = self.and()?;
        while self.check(&TokenKind::Or) {
            let op = self.advance();
            let right = self.and()?;
            left = self.lower(&op, |g| g.binary(Operation::Or, left, right))?;
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Operand> {
        let mut left = self.relational()?;
        while self.check(&TokenKind::And) {
            let op = self.advance();
            let right = self.relational()?;
            left = self.lower(&op, |g| g.binary(Operation::And, left, right))?;
        }
        Ok(left)
    }

    fn relational(&mut self) -> Result<Operand> {
        let left = self.additive()?;
        let op = match self.peek().kind {
            TokenKind::Eq => Operation::Eq,
            TokenKind::NotEq => Operation::Diff,
            TokenKind::Lt => Operation::Lt,
            TokenKind::Gt => Operation::Gt,
            TokenKind::LtEq => Operation::LtEq,
            TokenKind::GtEq => Operation::GtEq,
            _ => return Ok(left),
        };
        let token = self.advance();
        let right = self.additive()?;
        self.lower(&token, |g| g.binary(op, left, right))
    }

    fn additive(&mut self) -> Result<Operand> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => Operation::Plus,
                TokenKind::Minus => Operation::Minus,
                _ => return Ok(left),
            };
            let token = self.advance();
            let right = self.multiplicative()?;
            left = self.lower(&token, |g| g.binary(op, left, right))?;
        }
    }

    fn multiplicative(&mut self) -> Result<Operand> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => Operation::Times,
                TokenKind::Slash => Operation::Divides,
                _ => return Ok(left),
            };
            let token = self.advance();
            let right = self.unary()?;
            left = self.lower(&token, |g| g.binary(op, left, right))?;
        }
    }

    fn unary(&mut self) -> Result<Operand> {
        if !self.check(&TokenKind::Minus) {
            return self.factor();
        }
        let minus = self.advance();
        // Negative literals are pooled directly
        match self.peek().kind {
            TokenKind::Integer(n) => {
                self.advance();
                self.lower(&minus, |g| g.constant(Value::Int(n.wrapping_neg())))
            }
            TokenKind::Float(f) => {
                self.advance();
                self.lower(&minus, |g| g.constant(Value::Float(-f)))
            }
            _ => {
                let operand = self.unary()?;
                self.lower(&minus, |g| g.negate(operand))
            }
        }
    }

    fn factor(&mut self) -> Result<Operand> {
        let token = self.peek().clone();
        let literal = match &token.kind {
            TokenKind::Integer(n) => Some(Value::Int(*n)),
            TokenKind::Float(f) => Some(Value::Float(*f)),
            TokenKind::String(s) => Some(Value::Str(s.clone())),
            TokenKind::True => Some(Value::Bool(true)),
            TokenKind::False => Some(Value::Bool(false)),
            _ => None,
        };
        if let Some(value) = literal {
            self.advance();
            return self.lower(&token, |g| g.constant(value));
        }

        match &token.kind {
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.expression()?;
                self.consume(TokenKind::RightParen, "')' to close the expression")?;
                Ok(inner)
            }
            TokenKind::Identifier(_) | TokenKind::This => {
                let path = self.path()?;
                if self.check(&TokenKind::LeftParen) {
                    let site = self.call_site(&token, &path)?;
                    self.lower(&token, |g| g.end_call_value(site))
                } else {
                    self.access(&token, &path)
                }
            }
            other => Err(self.error_at(&token, format!("expected an expression, found {}", other))),
        }
    }

    /// `path(args)` as a statement; the value of a non-void call is discarded
    fn call(&mut self, start: &Token, path: &str) -> Result<Option<Operand>> {
        let site = self.call_site(start, path)?;
        self.lower(start, |g| g.end_call(site))
    }

    /// Resolves the callee and compiles the arguments, leaving the call sequence to the caller
    fn call_site(&mut self, start: &Token, path: &str) -> Result<CallSite> {
        let mut site = self.lower(start, |g| g.begin_call(path))?;
        self.consume(TokenKind::LeftParen, "'('")?;
        if !self.check(&TokenKind::RightParen) {
            loop {
                let arg = self.expression()?;
                self.generator.call_argument(&mut site, arg);
                if !self.match_kind(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "')' after arguments")?;
        Ok(site)
    }

    /// Variable or array element named by `path`, reading any `[expr]` suffixes
    fn access(&mut self, start: &Token, path: &str) -> Result<Operand> {
        let mut indices = Vec::new();
        while self.match_kind(&TokenKind::LeftBracket) {
            indices.push(self.expression()?);
            self.consume(TokenKind::RightBracket, "']'")?;
        }
        if indices.is_empty() {
            self.lower(start, |g| g.variable(path))
        } else {
            self.lower(start, |g| g.element(path, &indices))
        }
    }

    /// `(ID | this) ("." ID)*` joined with dots
    fn path(&mut self) -> Result<String> {
        let token = self.advance();
        let mut path = match &token.kind {
            TokenKind::Identifier(name) => name.clone(),
            TokenKind::This => "this".to_string(),
            other => {
                return Err(self.error_at(
                    &token,
                    format!("expected an identifier, found {}", other),
                ));
            }
        };
        while self.match_kind(&TokenKind::Dot) {
            path.push('.');
            path.push_str(&self.identifier()?);
        }
        Ok(path)
    }

    // ---------------------------------------------------------------------
    // Helper methods
    // ---------------------------------------------------------------------

    fn identifier(&mut self) -> Result<String> {
        let token = self.advance();
        match &token.kind {
            TokenKind::Identifier(name) => Ok(name.clone()),
            other => Err(self.error_at(
                &token,
                format!("expected an identifier, found {}", other),
            )),
        }
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> Error {
        Error::SyntaxError {
            line: token.line,
            col: token.column,
            message: message.into(),
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    /// `ID ID` starts a declaration of a class-typed variable
    fn check_next_identifier(&self) -> bool {
        matches!(
            self.tokens.get(self.current + 1).map(|t| &t.kind),
            Some(TokenKind::Identifier(_))
        )
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
            self.tokens[self.current - 1].clone()
        } else {
            self.peek().clone()
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        if self.is_at_end() {
            return false;
        }
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn match_kind(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, expected: &str) -> Result<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            let token = self.peek();
            Err(self.error_at(
                token,
                format!("expected {}, found {}", expected, token.kind),
            ))
        }
    }
}
