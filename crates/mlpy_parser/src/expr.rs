use crate::{diagnostics, lexer::Kind, Parser};
use mlpy_ast::ast::*;
use mlpy_ast::operators::{BinaryOperator, UnaryOperator};
use mlpy_diagnostics::{Error, Result};
use mlpy_span::Span;

impl Parser {
    /// Entry point for expression parsing. Precedence, low to high:
    /// assignment (right-assoc) > ternary > `||` > `&&` > comparison
    /// (non-associative) > additive > multiplicative > unary > postfix >
    /// primary (spec.md `4.1`).
    pub(crate) fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr> {
        let start = self.cursor.cur_span();
        let target = self.parse_ternary()?;
        if self.cursor.eat(Kind::Eq) {
            if !target.is_assignment_target() {
                return Err(diagnostics::UnexpectedToken(target.span()).into());
            }
            let value = self.parse_assignment()?;
            let span = start.merge(value.span());
            return Ok(Expr::Assignment(Box::new(AssignmentExpr { span, target, value })));
        }
        Ok(target)
    }

    fn parse_ternary(&mut self) -> Result<Expr> {
        let start = self.cursor.cur_span();
        let test = self.parse_logical_or()?;
        if self.cursor.eat(Kind::Question) {
            let consequent = self.parse_assignment()?;
            self.expect(Kind::Colon)?;
            let alternate = self.parse_ternary()?;
            let span = start.merge(alternate.span());
            return Ok(Expr::Ternary(Box::new(TernaryExpr { span, test, consequent, alternate })));
        }
        Ok(test)
    }

    fn parse_logical_or(&mut self) -> Result<Expr> {
        let start = self.cursor.cur_span();
        let mut left = self.parse_logical_and()?;
        while self.cursor.eat(Kind::PipePipe) {
            let right = self.parse_logical_and()?;
            let span = start.merge(right.span());
            left = Expr::Binary(Box::new(BinaryExpr { span, operator: BinaryOperator::LogicalOr, left, right }));
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expr> {
        let start = self.cursor.cur_span();
        let mut left = self.parse_comparison()?;
        while self.cursor.eat(Kind::AmpAmp) {
            let right = self.parse_comparison()?;
            let span = start.merge(right.span());
            left = Expr::Binary(Box::new(BinaryExpr { span, operator: BinaryOperator::LogicalAnd, left, right }));
        }
        Ok(left)
    }

    /// Non-associative: build at most one comparison at this level, then
    /// reject an immediately following comparison operator (the grammar
    /// requires explicit parentheses to chain, spec.md `4.1`).
    fn parse_comparison(&mut self) -> Result<Expr> {
        let start = self.cursor.cur_span();
        let left = self.parse_additive()?;
        let Some(operator) = comparison_operator(self.cursor.cur_kind()) else {
            return Ok(left);
        };
        self.cursor.bump();
        let right = self.parse_additive()?;
        let span = start.merge(right.span());
        let expr = Expr::Binary(Box::new(BinaryExpr { span, operator, left, right }));
        if self.cursor.cur_kind().is_comparison() {
            return Err(diagnostics::UnexpectedToken(self.cursor.cur_span()).into());
        }
        Ok(expr)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let start = self.cursor.cur_span();
        let mut left = self.parse_multiplicative()?;
        loop {
            let operator = match self.cursor.cur_kind() {
                Kind::Plus => BinaryOperator::Add,
                Kind::Minus => BinaryOperator::Sub,
                _ => break,
            };
            self.cursor.bump();
            let right = self.parse_multiplicative()?;
            let span = start.merge(right.span());
            left = Expr::Binary(Box::new(BinaryExpr { span, operator, left, right }));
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let start = self.cursor.cur_span();
        let mut left = self.parse_unary()?;
        loop {
            let operator = match self.cursor.cur_kind() {
                Kind::Star => BinaryOperator::Mul,
                Kind::Slash => BinaryOperator::Div,
                Kind::Percent => BinaryOperator::Mod,
                _ => break,
            };
            self.cursor.bump();
            let right = self.parse_unary()?;
            let span = start.merge(right.span());
            left = Expr::Binary(Box::new(BinaryExpr { span, operator, left, right }));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let start = self.cursor.cur_span();
        let operator = match self.cursor.cur_kind() {
            Kind::Minus => UnaryOperator::Minus,
            Kind::Plus => UnaryOperator::Plus,
            Kind::Bang => UnaryOperator::Not,
            _ => return self.parse_postfix(),
        };
        self.cursor.bump();
        let argument = self.parse_unary()?;
        let span = start.merge(argument.span());
        Ok(Expr::Unary(Box::new(UnaryExpr { span, operator, argument })))
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let start = self.cursor.cur_span();
        let mut expr = self.parse_primary()?;
        loop {
            expr = match self.cursor.cur_kind() {
                Kind::Dot => {
                    self.cursor.bump();
                    let property_span = self.cursor.cur_span();
                    let Some(property) = self.cursor.take_ident() else {
                        return Err(self.unexpected());
                    };
                    let span = start.merge(property_span);
                    Expr::Member(Box::new(MemberExpr { span, object: expr, property, property_span }))
                }
                Kind::LBracket => {
                    self.cursor.bump();
                    let index = self.parse_expr()?;
                    let end = self.expect(Kind::RBracket)?;
                    Expr::Index(Box::new(IndexExpr { span: start.merge(end), object: expr, index }))
                }
                Kind::LParen => {
                    self.cursor.bump();
                    let arguments = self.parse_call_arguments()?;
                    let end = self.expect(Kind::RParen)?;
                    Expr::Call(Box::new(CallExpr { span: start.merge(end), callee: expr, arguments }))
                }
                _ => break,
            };
        }
        Ok(expr)
    }

    fn parse_call_arguments(&mut self) -> Result<Vec<Expr>> {
        let mut arguments = Vec::new();
        if self.cursor.at(Kind::RParen) {
            return Ok(arguments);
        }
        loop {
            arguments.push(self.parse_assignment()?);
            if !self.cursor.eat(Kind::Comma) {
                break;
            }
        }
        Ok(arguments)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let span = self.cursor.cur_span();
        match self.cursor.cur_kind() {
            Kind::Number => {
                let token = self.cursor.bump();
                let value = match token.value {
                    crate::lexer::TokenValue::Int(v) => NumberValue::Int(v),
                    crate::lexer::TokenValue::Float(v) => NumberValue::Float(v),
                    _ => unreachable!("lexer always attaches a numeric value to Kind::Number"),
                };
                Ok(Expr::NumberLiteral(Box::new(NumberLiteral { span, value })))
            }
            Kind::String => {
                let token = self.cursor.bump();
                let crate::lexer::TokenValue::Str(value) = token.value else {
                    unreachable!("lexer always attaches a string value to Kind::String");
                };
                Ok(Expr::StringLiteral(Box::new(StringLiteral { span, value })))
            }
            Kind::True => {
                self.cursor.bump();
                Ok(Expr::BoolLiteral(Box::new(BoolLiteral { span, value: true })))
            }
            Kind::False => {
                self.cursor.bump();
                Ok(Expr::BoolLiteral(Box::new(BoolLiteral { span, value: false })))
            }
            Kind::Null => {
                self.cursor.bump();
                Ok(Expr::NullLiteral(Box::new(NullLiteral { span })))
            }
            Kind::Identifier => {
                let name = self.cursor.take_ident().unwrap();
                Ok(Expr::Identifier(Box::new(IdentifierRef { span, name })))
            }
            Kind::LParen => {
                self.cursor.bump();
                let expr = self.parse_expr()?;
                self.expect(Kind::RParen)?;
                Ok(expr)
            }
            Kind::LBracket => self.parse_array(),
            Kind::LBrace => self.parse_object(),
            Kind::Fn => self.parse_arrow_function(),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_array(&mut self) -> Result<Expr> {
        let start = self.cursor.cur_span();
        self.cursor.bump();
        let mut elements = Vec::new();
        if !self.cursor.at(Kind::RBracket) {
            loop {
                elements.push(self.parse_assignment()?);
                if !self.cursor.eat(Kind::Comma) {
                    break;
                }
                if self.cursor.at(Kind::RBracket) {
                    break;
                }
            }
        }
        let end = self.expect(Kind::RBracket)?;
        Ok(Expr::Array(Box::new(ArrayExpr { span: start.merge(end), elements })))
    }

    fn parse_object(&mut self) -> Result<Expr> {
        let start = self.cursor.cur_span();
        self.cursor.bump();
        let mut properties = Vec::new();
        if !self.cursor.at(Kind::RBrace) {
            loop {
                let key_span = self.cursor.cur_span();
                let key = match self.cursor.cur_kind() {
                    Kind::Identifier => self.cursor.take_ident().unwrap(),
                    Kind::String => {
                        let token = self.cursor.bump();
                        let crate::lexer::TokenValue::Str(s) = token.value else { unreachable!() };
                        s
                    }
                    _ => return Err(self.unexpected()),
                };
                self.expect(Kind::Colon)?;
                let value = self.parse_assignment()?;
                let span = key_span.merge(value.span());
                properties.push(ObjectProperty { span, key, value });
                if !self.cursor.eat(Kind::Comma) {
                    break;
                }
                if self.cursor.at(Kind::RBrace) {
                    break;
                }
            }
        }
        let end = self.expect(Kind::RBrace)?;
        Ok(Expr::Object(Box::new(ObjectExpr { span: start.merge(end), properties })))
    }

    /// `fn(a, b) => expr` or `fn(a, b) => { ... }` (spec.md `4.1`).
    fn parse_arrow_function(&mut self) -> Result<Expr> {
        let start = self.cursor.cur_span();
        self.cursor.bump(); // `fn`
        let params = self.parse_param_list()?;
        self.expect(Kind::FatArrow)?;
        let body = if self.cursor.at(Kind::LBrace) {
            ArrowBody::Block(Box::new(self.parse_block()?))
        } else {
            ArrowBody::Expr(Box::new(self.parse_assignment()?))
        };
        let end_span = match &body {
            ArrowBody::Block(b) => b.span,
            ArrowBody::Expr(e) => e.span(),
        };
        Ok(Expr::Arrow(Box::new(ArrowFunctionExpr { span: start.merge(end_span), params, body })))
    }

    pub(crate) fn parse_param_list(&mut self) -> Result<Vec<Param>> {
        self.expect(Kind::LParen)?;
        let mut params = Vec::new();
        if !self.cursor.at(Kind::RParen) {
            loop {
                let span = self.cursor.cur_span();
                let Some(name) = self.cursor.take_ident() else {
                    return Err(self.unexpected());
                };
                params.push(Param { span, name });
                if !self.cursor.eat(Kind::Comma) {
                    break;
                }
            }
        }
        self.expect(Kind::RParen)?;
        Ok(params)
    }

    pub(crate) fn expect(&mut self, kind: Kind) -> Result<Span> {
        if self.cursor.at(kind) {
            Ok(self.cursor.bump().span)
        } else {
            Err(self.unexpected())
        }
    }

    pub(crate) fn unexpected(&mut self) -> Error {
        diagnostics::UnexpectedToken(self.cursor.cur_span()).into()
    }
}

fn comparison_operator(kind: Kind) -> Option<BinaryOperator> {
    Some(match kind {
        Kind::EqEq => BinaryOperator::Equal,
        Kind::NotEq => BinaryOperator::NotEqual,
        Kind::Lt => BinaryOperator::Less,
        Kind::LtEq => BinaryOperator::LessEqual,
        Kind::Gt => BinaryOperator::Greater,
        Kind::GtEq => BinaryOperator::GreaterEqual,
        _ => return None,
    })
}
