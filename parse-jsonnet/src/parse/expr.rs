use super::Parser;
use crate::ast::Arg;
use crate::ast::BinaryOp;
use crate::ast::ExprId;
use crate::ast::ExprKind;
use crate::ast::LiteralStringKind;
use crate::ast::UnaryOp;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::lex::string::unescape;
use crate::loc::Loc;
use crate::token::Token;
use crate::token::TT;

// Looser than every binary operator.
const MIN_PRECEDENCE: u8 = 0;

fn string_kind(typ: TT) -> Option<LiteralStringKind> {
  Some(match typ {
    TT::LiteralStringSingle => LiteralStringKind::Single,
    TT::LiteralStringDouble => LiteralStringKind::Double,
    TT::LiteralStringBlock => LiteralStringKind::Block,
    TT::LiteralVerbatimStringSingle => LiteralStringKind::VerbatimSingle,
    TT::LiteralVerbatimStringDouble => LiteralStringKind::VerbatimDouble,
    _ => return None,
  })
}

fn binary_op(t: &Token) -> Option<BinaryOp> {
  match t.typ {
    TT::KeywordIn => Some(BinaryOp::In),
    TT::Operator => BinaryOp::from_operator(&t.text),
    _ => None,
  }
}

fn is_keyword_led(typ: TT) -> bool {
  matches!(
    typ,
    TT::KeywordAssert
      | TT::KeywordError
      | TT::KeywordIf
      | TT::KeywordFunction
      | TT::KeywordImport
      | TT::KeywordImportbin
      | TT::KeywordImportstr
      | TT::KeywordLocal
  )
}

impl<'a> Parser<'a> {
  pub fn parse_expr(&mut self) -> SyntaxResult<ExprId> {
    self.parse_expr_with_min_prec(MIN_PRECEDENCE)
  }

  fn parse_expr_with_min_prec(&mut self, min_prec: u8) -> SyntaxResult<ExprId> {
    if is_keyword_led(self.peek_typ()) {
      return self.parse_keyword_expr();
    }
    let start = self.peek().loc.0;
    let mut left = self.parse_unary()?;
    loop {
      let t = self.peek();
      let Some(op) = binary_op(&t) else {
        break;
      };
      let prec = op.precedence();
      if prec < min_prec {
        break;
      }
      self.consume();
      if op == BinaryOp::In && self.consume_if(TT::KeywordSuper).is_match() {
        left = self.alloc_since(start, ExprKind::InSuper { element: left });
        continue;
      }
      // All binary operators are left associative.
      let right = self.parse_expr_with_min_prec(prec + 1)?;
      left = self.alloc_since(start, ExprKind::Binary { op, left, right });
    }
    Ok(left)
  }

  fn parse_unary(&mut self) -> SyntaxResult<ExprId> {
    if is_keyword_led(self.peek_typ()) {
      return self.parse_keyword_expr();
    }
    let t = self.peek();
    if t.typ == TT::Operator {
      if let Some(op) = UnaryOp::from_operator(&t.text) {
        self.consume();
        let expr = self.parse_unary()?;
        return Ok(self.alloc_since(t.loc.0, ExprKind::Unary { op, expr }));
      }
    }
    let primary = self.parse_primary()?;
    self.parse_postfix(t.loc.0, primary)
  }

  /// Forms led by a keyword extend as far to the right as possible.
  fn parse_keyword_expr(&mut self) -> SyntaxResult<ExprId> {
    let t = self.consume();
    let start = t.loc.0;
    let kind = match t.typ {
      TT::KeywordAssert => {
        let cond = self.parse_expr()?;
        let message = if self.consume_if_operator(":").is_match() {
          Some(self.parse_expr()?)
        } else {
          None
        };
        self.require(TT::Semicolon)?;
        let rest = self.parse_expr()?;
        ExprKind::Assert { cond, message, rest }
      }
      TT::KeywordError => ExprKind::Error {
        expr: self.parse_expr()?,
      },
      TT::KeywordIf => {
        let cond = self.parse_expr()?;
        self.require(TT::KeywordThen)?;
        let then = self.parse_expr()?;
        let otherwise = if self.consume_if(TT::KeywordElse).is_match() {
          Some(self.parse_expr()?)
        } else {
          None
        };
        ExprKind::Conditional {
          cond,
          then,
          otherwise,
        }
      }
      TT::KeywordFunction => {
        self.require(TT::ParenthesisOpen)?;
        let params = self.parse_params()?;
        let body = self.parse_expr()?;
        ExprKind::Function { params, body }
      }
      TT::KeywordImport | TT::KeywordImportbin | TT::KeywordImportstr => {
        let path = self.peek();
        if !path.typ.is_string() || path.typ == TT::LiteralStringBlock {
          return Err(path.error(SyntaxErrorType::ExpectedSyntax("import path string")));
        }
        self.consume();
        let file = unescape(&path)?;
        match t.typ {
          TT::KeywordImport => ExprKind::Import { file },
          TT::KeywordImportbin => ExprKind::ImportBin { file },
          _ => ExprKind::ImportStr { file },
        }
      }
      TT::KeywordLocal => {
        let mut binds = Vec::new();
        loop {
          binds.push(self.parse_bind()?);
          if self.consume_if(TT::Comma).is_match() {
            continue;
          }
          self.require(TT::Semicolon)?;
          break;
        }
        let body = self.parse_expr()?;
        ExprKind::Local { binds, body }
      }
      _ => return Err(t.error(SyntaxErrorType::ExpectedSyntax("expression"))),
    };
    Ok(self.alloc_since(start, kind))
  }

  fn parse_primary(&mut self) -> SyntaxResult<ExprId> {
    if self.at_partial_end() {
      let at = self.peek().loc.0;
      return Ok(self.alloc(Some(Loc(at, at)), ExprKind::Partial));
    }
    let t = self.consume();
    let start = t.loc.0;
    if let Some(kind) = string_kind(t.typ) {
      let value = unescape(&t)?;
      return Ok(self.alloc_since(start, ExprKind::LiteralString { value, kind }));
    }
    let kind = match t.typ {
      TT::BraceOpen => return self.parse_object_remainder(start),
      TT::BracketOpen => return self.parse_array_remainder(start),
      TT::ParenthesisOpen => {
        let inner = self.parse_expr()?;
        self.require(TT::ParenthesisClose)?;
        ExprKind::Parens { inner }
      }
      TT::LiteralNumber => ExprKind::LiteralNumber { text: t.text },
      TT::KeywordTrue => ExprKind::LiteralBoolean { value: true },
      TT::KeywordFalse => ExprKind::LiteralBoolean { value: false },
      TT::KeywordNull => ExprKind::LiteralNull,
      TT::KeywordSelf => ExprKind::SelfRef,
      TT::Dollar => ExprKind::Dollar,
      TT::Identifier => ExprKind::Var { name: t.text },
      TT::KeywordSuper => {
        let index = if self.consume_if(TT::Dot).is_match() {
          self.parse_field_access_name()?
        } else if self.consume_if(TT::BracketOpen).is_match() {
          let index = self.parse_expr()?;
          self.require(TT::BracketClose)?;
          index
        } else {
          let next = self.peek();
          return Err(next.error(SyntaxErrorType::ExpectedSyntax("'.' or '[' after super")));
        };
        ExprKind::SuperIndex { index }
      }
      TT::EOF => return Err(t.error(SyntaxErrorType::UnexpectedEnd)),
      _ => return Err(t.error(SyntaxErrorType::ExpectedSyntax("expression"))),
    };
    Ok(self.alloc_since(start, kind))
  }

  /// The identifier after a `.`, desugared into a string literal.
  fn parse_field_access_name(&mut self) -> SyntaxResult<ExprId> {
    if self.at_partial_end() {
      let at = self.peek().loc.0;
      return Ok(self.alloc(Some(Loc(at, at)), ExprKind::Partial));
    }
    let name = self.require(TT::Identifier)?;
    Ok(self.alloc(Some(name.loc), ExprKind::LiteralString {
      value: name.text,
      kind: LiteralStringKind::Double,
    }))
  }

  fn parse_postfix(&mut self, start: usize, mut target: ExprId) -> SyntaxResult<ExprId> {
    loop {
      let t = self.peek();
      target = match t.typ {
        TT::Dot => {
          self.consume();
          let index = self.parse_field_access_name()?;
          self.alloc_since(start, ExprKind::Index { target, index })
        }
        TT::BracketOpen => {
          self.consume();
          self.parse_index_or_slice(start, target)?
        }
        TT::ParenthesisOpen => {
          self.consume();
          let args = self.parse_args()?;
          let tailstrict = self.consume_if(TT::KeywordTailstrict).is_match();
          self.alloc_since(start, ExprKind::Apply {
            target,
            args,
            tailstrict,
          })
        }
        // `a { ... }` is sugar for `a + { ... }`.
        TT::BraceOpen => {
          self.consume();
          let right = self.parse_object_remainder(t.loc.0)?;
          self.alloc_since(start, ExprKind::Binary {
            op: BinaryOp::Plus,
            left: target,
            right,
          })
        }
        _ => break,
      };
    }
    Ok(target)
  }

  fn is_slice_separator(&self) -> bool {
    self.peek_is_operator(":") || self.peek_is_operator("::")
  }

  fn parse_optional_slice_part(&mut self) -> SyntaxResult<Option<ExprId>> {
    if self.peek_typ() == TT::BracketClose || self.is_slice_separator() {
      Ok(None)
    } else {
      Ok(Some(self.parse_expr()?))
    }
  }

  fn parse_index_or_slice(&mut self, start: usize, target: ExprId) -> SyntaxResult<ExprId> {
    let begin = self.parse_optional_slice_part()?;
    if !self.is_slice_separator() {
      let Some(index) = begin else {
        let t = self.peek();
        return Err(t.error(SyntaxErrorType::ExpectedSyntax("index expression")));
      };
      self.require(TT::BracketClose)?;
      return Ok(self.alloc_since(start, ExprKind::Index { target, index }));
    }
    let (end, step) = if self.consume_if_operator("::").is_match() {
      (None, self.parse_optional_slice_part()?)
    } else {
      self.require_operator(":")?;
      let end = self.parse_optional_slice_part()?;
      let step = if self.consume_if_operator(":").is_match() {
        self.parse_optional_slice_part()?
      } else {
        None
      };
      (end, step)
    };
    self.require(TT::BracketClose)?;
    Ok(self.alloc_since(start, ExprKind::Slice {
      target,
      begin,
      end,
      step,
    }))
  }

  /// Arguments after the opening parenthesis, through the closing one.
  pub fn parse_args(&mut self) -> SyntaxResult<Vec<Arg>> {
    let mut args = Vec::new();
    let mut seen_named = false;
    loop {
      if self.consume_if(TT::ParenthesisClose).is_match() || self.at_partial_end() {
        break;
      }
      let (a, b) = self.peek_2();
      let name = if a.typ == TT::Identifier && b.is_operator("=") {
        self.consume();
        self.consume();
        seen_named = true;
        Some(a.text)
      } else {
        if seen_named {
          return Err(a.error(SyntaxErrorType::ExpectedSyntax(
            "named argument; positional arguments cannot follow named ones",
          )));
        }
        None
      };
      let value = self.parse_expr()?;
      args.push(Arg { name, value });
      if !self.consume_if(TT::Comma).is_match() {
        self.require(TT::ParenthesisClose)?;
        break;
      }
    }
    Ok(args)
  }

  fn parse_array_remainder(&mut self, start: usize) -> SyntaxResult<ExprId> {
    let mut elements = Vec::new();
    loop {
      if self.consume_if(TT::BracketClose).is_match() || self.at_partial_end() {
        break;
      }
      let element = self.parse_expr()?;
      let comma = self.consume_if(TT::Comma).is_match();
      if elements.is_empty() && self.peek_typ() == TT::KeywordFor {
        let specs = self.parse_comp_specs()?;
        self.require(TT::BracketClose)?;
        return Ok(self.alloc_since(start, ExprKind::ArrayComp {
          body: element,
          specs,
        }));
      }
      elements.push(element);
      if !comma {
        self.require(TT::BracketClose)?;
        break;
      }
    }
    Ok(self.alloc_since(start, ExprKind::Array { elements }))
  }
}
