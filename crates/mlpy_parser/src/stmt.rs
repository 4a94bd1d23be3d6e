use crate::{lexer::Kind, Parser};
use mlpy_ast::ast::*;
use mlpy_diagnostics::Result;

impl Parser {
    pub(crate) fn parse_program_body(&mut self) -> Vec<Stmt> {
        let mut body = Vec::new();
        while !self.cursor.at(Kind::Eof) {
            match self.parse_statement() {
                Ok(stmt) => body.push(stmt),
                Err(error) => {
                    self.error(error);
                    self.synchronize();
                }
            }
        }
        body
    }

    /// Recover to the next statement boundary so more than one parse
    /// diagnostic can be reported per run (spec.md `7`, "Recovery").
    fn synchronize(&mut self) {
        loop {
            match self.cursor.cur_kind() {
                Kind::Eof => return,
                Kind::Semicolon => {
                    self.cursor.bump();
                    return;
                }
                Kind::RBrace | Kind::If | Kind::While | Kind::For | Kind::Return | Kind::Fn | Kind::Try | Kind::Throw
                | Kind::Import | Kind::Capability | Kind::Break | Kind::Continue => return,
                _ => {
                    self.cursor.bump();
                }
            }
        }
    }

    pub(crate) fn parse_statement(&mut self) -> Result<Stmt> {
        match self.cursor.cur_kind() {
            Kind::LBrace => Ok(Stmt::Block(Box::new(self.parse_block()?))),
            Kind::If => self.parse_if(),
            Kind::While => self.parse_while(),
            Kind::For => self.parse_for_in(),
            Kind::Break => {
                let span = self.cursor.cur_span();
                self.cursor.bump();
                self.expect(Kind::Semicolon)?;
                Ok(Stmt::Break(Box::new(BreakStmt { span })))
            }
            Kind::Continue => {
                let span = self.cursor.cur_span();
                self.cursor.bump();
                self.expect(Kind::Semicolon)?;
                Ok(Stmt::Continue(Box::new(ContinueStmt { span })))
            }
            Kind::Return => self.parse_return(),
            Kind::Try => self.parse_try(),
            Kind::Throw => self.parse_throw(),
            Kind::Import => self.parse_import(),
            Kind::Capability => self.parse_capability(),
            Kind::Fn if self.cursor.peek_kind(1) == Kind::Identifier => self.parse_function_def(),
            _ => self.parse_expr_statement(),
        }
    }

    pub(crate) fn parse_block(&mut self) -> Result<BlockStmt> {
        let start = self.expect(Kind::LBrace)?;
        let mut body = Vec::new();
        while !self.cursor.at(Kind::RBrace) && !self.cursor.at(Kind::Eof) {
            match self.parse_statement() {
                Ok(stmt) => body.push(stmt),
                Err(error) => {
                    self.error(error);
                    self.synchronize();
                }
            }
        }
        let end = self.expect(Kind::RBrace)?;
        Ok(BlockStmt { span: start.merge(end), body })
    }

    fn parse_expr_statement(&mut self) -> Result<Stmt> {
        let start = self.cursor.cur_span();
        let expr = self.parse_expr()?;
        let end = self.expect(Kind::Semicolon)?;
        Ok(Stmt::Expr(Box::new(ExprStmt { span: start.merge(end), expr })))
    }

    fn parse_function_def(&mut self) -> Result<Stmt> {
        let start = self.cursor.cur_span();
        self.cursor.bump(); // `fn`
        let name = self.cursor.take_ident().ok_or_else(|| self.unexpected())?;
        let params = self.parse_param_list()?;
        let body = self.parse_block()?;
        let span = start.merge(body.span);
        Ok(Stmt::FunctionDef(Box::new(FunctionDef { span, name, params, body })))
    }

    /// `if (test) { ... } elif (test2) { ... } else { ... }`. `elif`
    /// chains are represented as nested `If` statements in `alternate`.
    fn parse_if(&mut self) -> Result<Stmt> {
        let start = self.cursor.cur_span();
        self.cursor.bump(); // `if` or `elif`
        self.expect(Kind::LParen)?;
        let test = self.parse_expr()?;
        self.expect(Kind::RParen)?;
        let consequent = self.parse_block()?;
        let mut span = start.merge(consequent.span);
        let alternate = if self.cursor.at(Kind::Elif) {
            let elif = self.parse_if_tail()?;
            span = span.merge(elif.span());
            Some(Box::new(elif))
        } else if self.cursor.eat(Kind::Else) {
            let block = self.parse_block()?;
            span = span.merge(block.span);
            Some(Box::new(Stmt::Block(Box::new(block))))
        } else {
            None
        };
        Ok(Stmt::If(Box::new(IfStmt { span, test, consequent, alternate })))
    }

    fn parse_if_tail(&mut self) -> Result<Stmt> {
        self.parse_if()
    }

    fn parse_while(&mut self) -> Result<Stmt> {
        let start = self.cursor.cur_span();
        self.cursor.bump();
        self.expect(Kind::LParen)?;
        let test = self.parse_expr()?;
        self.expect(Kind::RParen)?;
        let body = self.parse_block()?;
        let span = start.merge(body.span);
        Ok(Stmt::While(Box::new(WhileStmt { span, test, body })))
    }

    fn parse_for_in(&mut self) -> Result<Stmt> {
        let start = self.cursor.cur_span();
        self.cursor.bump();
        self.expect(Kind::LParen)?;
        let binding = self.cursor.take_ident().ok_or_else(|| self.unexpected())?;
        self.expect(Kind::In)?;
        let iterable = self.parse_expr()?;
        self.expect(Kind::RParen)?;
        let body = self.parse_block()?;
        let span = start.merge(body.span);
        Ok(Stmt::ForIn(Box::new(ForInStmt { span, binding, iterable, body })))
    }

    fn parse_return(&mut self) -> Result<Stmt> {
        let start = self.cursor.cur_span();
        self.cursor.bump();
        let argument = if self.cursor.at(Kind::Semicolon) { None } else { Some(self.parse_expr()?) };
        let end = self.expect(Kind::Semicolon)?;
        Ok(Stmt::Return(Box::new(ReturnStmt { span: start.merge(end), argument })))
    }

    fn parse_throw(&mut self) -> Result<Stmt> {
        let start = self.cursor.cur_span();
        self.cursor.bump();
        let argument = self.parse_expr()?;
        let end = self.expect(Kind::Semicolon)?;
        Ok(Stmt::Throw(Box::new(ThrowStmt { span: start.merge(end), argument })))
    }

    fn parse_try(&mut self) -> Result<Stmt> {
        let start = self.cursor.cur_span();
        self.cursor.bump();
        let block = self.parse_block()?;
        let mut span = start.merge(block.span);

        let handler = if self.cursor.eat(Kind::Except) {
            let param = if self.cursor.eat(Kind::LParen) {
                let name = self.cursor.take_ident().ok_or_else(|| self.unexpected())?;
                self.expect(Kind::RParen)?;
                Some(name)
            } else {
                None
            };
            let body = self.parse_block()?;
            span = span.merge(body.span);
            Some(CatchClause { span: body.span, param, body })
        } else {
            None
        };

        let finalizer = if self.cursor.eat(Kind::Finally) {
            let body = self.parse_block()?;
            span = span.merge(body.span);
            Some(body)
        } else {
            None
        };

        Ok(Stmt::Try(Box::new(TryStmt { span, block, handler, finalizer })))
    }

    /// `import a.b.c;`. The validator enforces that the target is a
    /// simple dotted name.
    fn parse_import(&mut self) -> Result<Stmt> {
        let start = self.cursor.cur_span();
        self.cursor.bump();
        let mut path = vec![self.cursor.take_ident().ok_or_else(|| self.unexpected())?];
        while self.cursor.eat(Kind::Dot) {
            path.push(self.cursor.take_ident().ok_or_else(|| self.unexpected())?);
        }
        let end = self.expect(Kind::Semicolon)?;
        Ok(Stmt::Import(Box::new(ImportStmt { span: start.merge(end), path })))
    }

    /// `capability name { ... }`. `name` must be a simple identifier
    /// (invariant I5).
    fn parse_capability(&mut self) -> Result<Stmt> {
        let start = self.cursor.cur_span();
        self.cursor.bump();
        let name = self.cursor.take_ident().ok_or_else(|| self.unexpected())?;
        let body = self.parse_block()?;
        let span = start.merge(body.span);
        Ok(Stmt::Capability(Box::new(CapabilityStmt { span, name, body })))
    }
}
