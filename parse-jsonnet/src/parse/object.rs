use super::Parser;
use crate::ast::Bind;
use crate::ast::CompSpec;
use crate::ast::ExprId;
use crate::ast::ExprKind;
use crate::ast::FieldKind;
use crate::ast::Hide;
use crate::ast::LiteralStringKind;
use crate::ast::ObjectAssert;
use crate::ast::ObjectField;
use crate::ast::ObjectMember;
use crate::ast::Param;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::lex::string::unescape;
use crate::token::TT;

fn field_operator(text: &str) -> Option<(bool, Hide)> {
  Some(match text {
    ":" => (false, Hide::Inherit),
    "::" => (false, Hide::Hidden),
    ":::" => (false, Hide::Visible),
    "+:" => (true, Hide::Inherit),
    "+::" => (true, Hide::Hidden),
    "+:::" => (true, Hide::Visible),
    _ => return None,
  })
}

impl<'a> Parser<'a> {
  /// Parameters after the opening parenthesis, through the closing one.
  pub fn parse_params(&mut self) -> SyntaxResult<Vec<Param>> {
    let mut params: Vec<Param> = Vec::new();
    loop {
      if self.consume_if(TT::ParenthesisClose).is_match() || self.at_partial_end() {
        break;
      }
      let name = self.require(TT::Identifier)?;
      let default = if self.consume_if_operator("=").is_match() {
        Some(self.parse_expr()?)
      } else {
        None
      };
      params.push(Param {
        name: name.text,
        default,
      });
      if !self.consume_if(TT::Comma).is_match() {
        self.require(TT::ParenthesisClose)?;
        break;
      }
    }
    Ok(params)
  }

  /// Wraps a method body in the function it desugars to. The function has no location of its own.
  fn desugar_method(&mut self, params: Vec<Param>, body: ExprId) -> ExprId {
    self.alloc(None, ExprKind::Function { params, body })
  }

  /// `x = e` or `f(params) = e`.
  pub fn parse_bind(&mut self) -> SyntaxResult<Bind> {
    let name = self.require(TT::Identifier)?;
    let params = if self.consume_if(TT::ParenthesisOpen).is_match() {
      Some(self.parse_params()?)
    } else {
      None
    };
    self.require_operator("=")?;
    let body = self.parse_expr()?;
    let method = params.is_some();
    let body = match params {
      Some(params) => self.desugar_method(params, body),
      None => body,
    };
    Ok(Bind {
      name_range: self.range(name.loc),
      name: name.text,
      body,
      method,
    })
  }

  /// One or more `for x in e` / `if e` clauses; the first must be a `for`.
  pub fn parse_comp_specs(&mut self) -> SyntaxResult<Vec<CompSpec>> {
    let mut specs = Vec::new();
    self.require(TT::KeywordFor)?;
    loop {
      let var = self.require(TT::Identifier)?;
      self.require(TT::KeywordIn)?;
      let iter = self.parse_expr()?;
      specs.push(CompSpec::For {
        var: var.text,
        iter,
      });
      loop {
        if self.consume_if(TT::KeywordIf).is_match() {
          let cond = self.parse_expr()?;
          specs.push(CompSpec::If { cond });
          continue;
        }
        break;
      }
      if !self.consume_if(TT::KeywordFor).is_match() {
        break;
      }
    }
    Ok(specs)
  }

  fn parse_field_name(&mut self) -> SyntaxResult<(FieldKind, ExprId)> {
    let t = self.consume();
    if t.typ == TT::Identifier {
      let name = self.alloc(Some(t.loc), ExprKind::LiteralString {
        value: t.text,
        kind: LiteralStringKind::Double,
      });
      return Ok((FieldKind::Id, name));
    }
    if t.typ.is_string() {
      let value = unescape(&t)?;
      let kind = match t.typ {
        TT::LiteralStringSingle => LiteralStringKind::Single,
        TT::LiteralStringBlock => LiteralStringKind::Block,
        TT::LiteralVerbatimStringSingle => LiteralStringKind::VerbatimSingle,
        TT::LiteralVerbatimStringDouble => LiteralStringKind::VerbatimDouble,
        _ => LiteralStringKind::Double,
      };
      let name = self.alloc(Some(t.loc), ExprKind::LiteralString { value, kind });
      return Ok((FieldKind::Str, name));
    }
    if t.typ == TT::BracketOpen {
      let name = self.parse_expr()?;
      self.require(TT::BracketClose)?;
      return Ok((FieldKind::Computed, name));
    }
    Err(t.error(SyntaxErrorType::ExpectedSyntax("field name")))
  }

  fn parse_field(&mut self) -> SyntaxResult<ObjectField> {
    let (kind, name) = self.parse_field_name()?;
    let params = if self.consume_if(TT::ParenthesisOpen).is_match() {
      Some(self.parse_params()?)
    } else {
      None
    };
    let (plus_super, hide) = if self.at_partial_end() {
      (false, Hide::Inherit)
    } else {
      let op = self.consume();
      match (op.typ, field_operator(&op.text)) {
        (TT::Operator, Some(v)) => v,
        _ => return Err(op.error(SyntaxErrorType::ExpectedSyntax("field operator"))),
      }
    };
    if plus_super && params.is_some() {
      return Err(self.exprs[name.index()].error(SyntaxErrorType::ExpectedSyntax(
        "plain field operator; methods cannot use +:",
      )));
    }
    let body = self.parse_expr()?;
    let method = params.is_some();
    let body = match params {
      Some(params) => self.desugar_method(params, body),
      None => body,
    };
    Ok(ObjectField {
      kind,
      name,
      hide,
      plus_super,
      method,
      body,
    })
  }

  fn parse_member(&mut self) -> SyntaxResult<ObjectMember> {
    if self.consume_if(TT::KeywordLocal).is_match() {
      return Ok(ObjectMember::Local(self.parse_bind()?));
    }
    if self.consume_if(TT::KeywordAssert).is_match() {
      let cond = self.parse_expr()?;
      let message = if self.consume_if_operator(":").is_match() {
        Some(self.parse_expr()?)
      } else {
        None
      };
      return Ok(ObjectMember::Assert(ObjectAssert { cond, message }));
    }
    Ok(ObjectMember::Field(self.parse_field()?))
  }

  /// An object or object comprehension whose `{` at `start` has already been consumed.
  pub fn parse_object_remainder(&mut self, start: usize) -> SyntaxResult<ExprId> {
    let mut members = Vec::new();
    loop {
      if self.consume_if(TT::BraceClose).is_match() || self.at_partial_end() {
        break;
      }
      members.push(self.parse_member()?);
      let comma = self.consume_if(TT::Comma).is_match();
      if self.peek_typ() == TT::KeywordFor {
        return self.parse_object_comp_remainder(start, members);
      }
      if !comma {
        self.require(TT::BraceClose)?;
        break;
      }
    }
    Ok(self.alloc_since(start, ExprKind::Object { members }))
  }

  fn parse_object_comp_remainder(
    &mut self,
    start: usize,
    members: Vec<ObjectMember>,
  ) -> SyntaxResult<ExprId> {
    let for_token = self.peek();
    let mut fields = members.iter().filter_map(|m| match m {
      ObjectMember::Field(f) => Some(f),
      _ => None,
    });
    let field = fields.next();
    let valid = match field {
      Some(f) => {
        fields.next().is_none()
          && f.kind == FieldKind::Computed
          && !f.plus_super
          && f.hide == Hide::Inherit
      }
      None => false,
    };
    if !valid
      || members
        .iter()
        .any(|m| matches!(m, ObjectMember::Assert(_)))
    {
      return Err(for_token.error(SyntaxErrorType::ExpectedSyntax(
        "object comprehension with exactly one `[e]: e` field and no asserts",
      )));
    }
    let specs = self.parse_comp_specs()?;
    self.require(TT::BraceClose)?;
    Ok(self.alloc_since(start, ExprKind::ObjectComp { members, specs }))
  }
}
