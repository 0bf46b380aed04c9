use crate::{
    ast::{Block, FuncArg, Lambda, Node, NodeKind, Program},
    diagnostics::{Diagnostic, DiagnosticKind, Position},
    lexer::{self, Keyword, Operator, Token, TokenKind},
};

const INDENT_PER_BLOCK: usize = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Strict mode: no positions on nodes, and the first diagnostic stops
    /// parsing.
    pub testing: bool,
}

impl ParseOptions {
    pub fn testing() -> Self {
        Self { testing: true }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    pub ast: Program,
    pub errors: Vec<Diagnostic>,
}

impl ParseResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn parse(source: &str, options: ParseOptions) -> ParseResult {
    let lexed = lexer::tokenize(source);
    let mut parser = Parser::new(lexed.tokens, options);
    for error in lexed.errors {
        parser.report(error);
    }
    let ast = parser.program();
    ParseResult {
        ast,
        errors: parser.errors,
    }
}

struct Parser {
    tokens: Vec<Token>,
    current: usize,
    testing: bool,
    halted: bool,
    errors: Vec<Diagnostic>,
}

impl Parser {
    fn new(tokens: Vec<Token>, options: ParseOptions) -> Self {
        Self {
            tokens,
            current: 0,
            testing: options.testing,
            halted: false,
            errors: Vec::new(),
        }
    }

    fn program(&mut self) -> Program {
        let mut statements = Vec::new();
        self.clear_newlines();
        while !self.is_at_end() && !self.halted {
            if let Some(node) = self.element(0) {
                statements.push(node);
            }
            self.clear_newlines();
        }
        Program::new(statements)
    }

    fn block(&mut self, level: usize) -> Block {
        let mut elements = Vec::new();
        loop {
            self.clear_newlines();
            if self.is_at_end() || self.halted || depth(self.peek()) < level {
                break;
            }
            if let Some(node) = self.element(level) {
                elements.push(node);
            }
        }
        Block::new(elements)
    }

    /// Parses one statement, recovering at the statement boundary on failure.
    fn element(&mut self, level: usize) -> Option<Node> {
        let start = self.position(self.peek());
        match self.statement(level) {
            Ok(node) => {
                if let Err(diagnostic) = self.end_of_statement() {
                    self.report(diagnostic);
                    self.synchronize();
                }
                Some(node)
            }
            Err(diagnostic) => {
                self.report(diagnostic);
                if self.halted {
                    return None;
                }
                self.synchronize();
                Some(Node::null().at(start))
            }
        }
    }

    fn statement(&mut self, level: usize) -> Result<Node, Diagnostic> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Keyword(Keyword::If) => self.if_statement(level),
            TokenKind::Keyword(Keyword::Func) => self.func_def(level),
            TokenKind::Keyword(Keyword::Loop) => self.loop_statement(level),
            TokenKind::Identifier => {
                self.advance();
                self.check_indentation(level, &token);
                match self.peek().kind {
                    TokenKind::Assign | TokenKind::Colon => self.assignment(&token),
                    TokenKind::LParen => self.application(level, &token),
                    _ => Err(self.unexpected(self.peek())),
                }
            }
            _ => Err(self.unexpected(&token)),
        }
    }

    fn if_statement(&mut self, level: usize) -> Result<Node, Diagnostic> {
        let if_token = self.advance();
        self.check_indentation(level, &if_token);
        let predicate = self.expression()?;
        self.end_of_header()?;
        let mut conditionals = vec![(predicate, self.block(level + 1))];

        while !self.halted {
            let token = self.peek().clone();
            if depth(&token) < level {
                break;
            }
            let predicate = match token.kind {
                TokenKind::Keyword(Keyword::Else) => {
                    self.advance();
                    self.check_indentation(level, &token);
                    if self.matches(TokenKind::Keyword(Keyword::If)) {
                        self.expression()?
                    } else {
                        Node::num(1.0).at(self.position(&token))
                    }
                }
                TokenKind::Keyword(Keyword::Elif) => {
                    self.advance();
                    self.check_indentation(level, &token);
                    self.expression()?
                }
                _ => break,
            };
            self.end_of_header()?;
            conditionals.push((predicate, self.block(level + 1)));
        }

        Ok(Node::if_(conditionals).at(self.position(&if_token)))
    }

    fn func_def(&mut self, level: usize) -> Result<Node, Diagnostic> {
        let func_token = self.advance();
        self.check_indentation(level, &func_token);
        let name = self.consume(TokenKind::Identifier, "Expected function name")?;
        self.consume(TokenKind::LParen, "Expected open paren after function name")?;
        let args = self.arg_list(TokenKind::RParen)?;
        self.consume(TokenKind::RParen, "Expected close paren after arguments")?;
        let body = if self.matches(TokenKind::LambdaArrow) {
            Block::new(vec![self.expression()?])
        } else {
            self.end_of_header()?;
            self.block(level + 1)
        };
        Ok(Node::func(name.content, args, body).at(self.position(&func_token)))
    }

    fn arg_list(&mut self, end: TokenKind) -> Result<Vec<FuncArg>, Diagnostic> {
        let mut args = Vec::new();
        if self.check(end) {
            return Ok(args);
        }
        loop {
            args.push(self.function_arg()?);
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        Ok(args)
    }

    fn function_arg(&mut self) -> Result<FuncArg, Diagnostic> {
        if self.matches(TokenKind::Ampersand) {
            let id = self.consume(TokenKind::Identifier, "Expected block argument name")?;
            return Ok(FuncArg::Block(id.content));
        }
        let id = self.consume(TokenKind::Identifier, "Expected argument name")?;
        Ok(FuncArg::Var(id.content))
    }

    fn loop_statement(&mut self, level: usize) -> Result<Node, Diagnostic> {
        let loop_token = self.advance();
        self.check_indentation(level, &loop_token);
        let count = self.expression()?;
        self.consume(
            TokenKind::Keyword(Keyword::Times),
            "Expected `times` after loop count",
        )?;
        let loop_var = if self.matches(TokenKind::Keyword(Keyword::With)) {
            Some(
                self.consume(TokenKind::Identifier, "Expected loop variable name")?
                    .content,
            )
        } else {
            None
        };
        self.end_of_header()?;
        let block = self.block(level + 1);
        Ok(Node::new(NodeKind::Loop {
            count: Box::new(count),
            block,
            loop_var,
        })
        .at(self.position(&loop_token)))
    }

    fn assignment(&mut self, id_token: &Token) -> Result<Node, Diagnostic> {
        let position = self.position(id_token);
        if self.matches(TokenKind::Colon) {
            self.consume(TokenKind::Assign, "Expected `=` after `:`")?;
            let expr = self.expression()?;
            return Ok(Node::conditional_assignment(id_token.content.clone(), expr).at(position));
        }
        self.consume(TokenKind::Assign, "Expected assignment")?;
        let expr = self.expression()?;
        Ok(Node::assignment(id_token.content.clone(), expr).at(position))
    }

    fn application(&mut self, level: usize, id_token: &Token) -> Result<Node, Diagnostic> {
        let position = self.position(id_token);
        self.consume(TokenKind::LParen, "Expected open paren")?;
        let args = self.expr_list(TokenKind::RParen)?;
        self.consume(TokenKind::RParen, "Expected close paren after arguments")?;

        let name = id_token.content.clone();
        let plain = |args: Vec<Node>| -> Result<Node, Diagnostic> {
            Ok(Node::application(name.clone(), args).at(position))
        };
        if !self.check(TokenKind::Newline) {
            return plain(args);
        }
        let mut ahead = self.current;
        while self.tokens[ahead].kind == TokenKind::Newline {
            ahead += 1;
        }
        let next = &self.tokens[ahead];
        if next.kind == TokenKind::Eof || depth(next) <= level {
            return plain(args);
        }
        self.current = ahead;
        let lambda = self.application_lambda(level + 1)?;
        Ok(Node::new(NodeKind::Application {
            name,
            args,
            lambda: Some(lambda),
        })
        .at(position))
    }

    fn application_lambda(&mut self, level: usize) -> Result<Lambda, Diagnostic> {
        let mut args = Vec::new();
        if self.check(TokenKind::Pipe) {
            let pipe = self.advance();
            self.check_indentation(level, &pipe);
            args = self.arg_list(TokenKind::Pipe)?;
            self.consume(TokenKind::Pipe, "Expected closing pipe")?;
            self.end_of_header()?;
        } else if self.check(TokenKind::Operator(Operator::Or)) {
            // `||` lexes as a single operator: an empty argument header.
            let pipes = self.advance();
            self.check_indentation(level, &pipes);
            self.end_of_header()?;
        }
        let body = self.block(level);
        Ok(Lambda { args, body })
    }

    fn expr_list(&mut self, end: TokenKind) -> Result<Vec<Node>, Diagnostic> {
        let mut values = Vec::new();
        if self.check(end) {
            return Ok(values);
        }
        loop {
            let start = self.position(self.peek());
            let value = match self.expression() {
                Ok(value) => value,
                Err(diagnostic) if !self.testing => {
                    self.report(diagnostic);
                    self.synchronize_element(end);
                    Node::null().at(start)
                }
                Err(diagnostic) => return Err(diagnostic),
            };
            values.push(value);
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        Ok(values)
    }

    fn expression(&mut self) -> Result<Node, Diagnostic> {
        let first = self.base_expression()?;
        if !matches!(self.peek().kind, TokenKind::Operator(_)) {
            return Ok(first);
        }

        let mut output = vec![first];
        let mut operators: Vec<(Operator, Option<Position>)> = Vec::new();
        while let TokenKind::Operator(op) = self.peek().kind {
            let op_token = self.advance();
            while let Some(&(top, top_position)) = operators.last() {
                if top.precedence() < op.precedence() {
                    break;
                }
                operators.pop();
                reduce(&mut output, top, top_position);
            }
            operators.push((op, self.position(&op_token)));
            output.push(self.base_expression()?);
        }
        while let Some((op, position)) = operators.pop() {
            reduce(&mut output, op, position);
        }
        Ok(output.pop().unwrap_or_else(Node::null))
    }

    fn base_expression(&mut self) -> Result<Node, Diagnostic> {
        let token = self.peek().clone();
        let position = self.position(&token);
        let mut initial = match token.kind {
            TokenKind::Number => {
                self.advance();
                let value: f64 = token
                    .content
                    .parse()
                    .map_err(|_| self.error(&token, "Invalid number"))?;
                Node::num(value).at(position)
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenKind::RParen, "Expected close paren")?;
                expr
            }
            TokenKind::Operator(op) => {
                self.advance();
                let expr = self.base_expression()?;
                Node::unary_op(op, expr).at(position)
            }
            TokenKind::Colon => {
                self.advance();
                let id = self.consume(TokenKind::Identifier, "Expected symbol name after colon")?;
                Node::symbol(id.content).at(position)
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Node::null().at(position)
            }
            TokenKind::LBracket => {
                self.advance();
                let values = self.expr_list(TokenKind::RBracket)?;
                self.consume(TokenKind::RBracket, "Expected close bracket")?;
                Node::list(values).at(position)
            }
            TokenKind::Identifier => {
                self.advance();
                if self.matches(TokenKind::LParen) {
                    let args = self.expr_list(TokenKind::RParen)?;
                    self.consume(TokenKind::RParen, "Expected close paren after arguments")?;
                    Node::application(token.content, args).at(position)
                } else {
                    Node::variable(token.content).at(position)
                }
            }
            _ => return Err(self.unexpected(&token)),
        };

        while self.matches(TokenKind::LBracket) {
            let index = self.expression()?;
            self.consume(TokenKind::RBracket, "Expected close bracket after index")?;
            initial = Node::index(initial, index).at(position);
        }
        Ok(initial)
    }

    fn end_of_header(&self) -> Result<(), Diagnostic> {
        if self.is_at_end() || self.check(TokenKind::Newline) {
            Ok(())
        } else {
            Err(self.unexpected(self.peek()))
        }
    }

    fn end_of_statement(&self) -> Result<(), Diagnostic> {
        let after_block =
            self.current > 0 && self.tokens[self.current - 1].kind == TokenKind::Newline;
        if after_block {
            return Ok(());
        }
        self.end_of_header()
    }

    fn check_indentation(&mut self, level: usize, token: &Token) {
        let actual = depth(token);
        if actual != level {
            self.report(
                Diagnostic::new(
                    DiagnosticKind::Indentation,
                    format!("Expected {level} levels of indentation but found {actual}"),
                )
                .at(token.position(), token.length.max(1)),
            );
        }
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        if self.halted {
            return;
        }
        self.errors.push(diagnostic);
        if self.testing {
            self.halted = true;
        }
    }

    /// Skips past the rest of the current line.
    fn synchronize(&mut self) {
        while !self.is_at_end() && !self.check(TokenKind::Newline) {
            self.advance();
        }
        self.clear_newlines();
    }

    /// Skips to the next list separator, the closing token, or the line end.
    fn synchronize_element(&mut self, end: TokenKind) {
        while !self.is_at_end()
            && !self.check(TokenKind::Comma)
            && !self.check(end)
            && !self.check(TokenKind::Newline)
        {
            self.advance();
        }
    }

    fn clear_newlines(&mut self) {
        while self.check(TokenKind::Newline) {
            self.advance();
        }
    }

    fn position(&self, token: &Token) -> Option<Position> {
        if self.testing {
            None
        } else {
            Some(token.position())
        }
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<Token, Diagnostic> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let found = self.peek();
            Err(self.error(found, &format!("{message} but found {}", found.kind)))
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn unexpected(&self, token: &Token) -> Diagnostic {
        self.error(token, &format!("Unexpected {}", token.kind))
    }

    fn error(&self, token: &Token, message: &str) -> Diagnostic {
        Diagnostic::new(DiagnosticKind::Syntax, message).at(token.position(), token.length.max(1))
    }
}

fn depth(token: &Token) -> usize {
    // round((character - 1) / 2) with halves rounding up
    token.character / INDENT_PER_BLOCK
}

fn reduce(output: &mut Vec<Node>, operator: Operator, position: Option<Position>) {
    let (Some(right), Some(left)) = (output.pop(), output.pop()) else {
        return;
    };
    output.push(Node::binary_op(operator, left, right).at(position));
}
