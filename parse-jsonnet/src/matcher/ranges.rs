use super::Matcher;
use crate::ast::Ast;
use crate::ast::Bind;
use crate::ast::ExprId;
use crate::ast::ExprKind;
use crate::ast::FieldKind;
use crate::ast::ObjectField;
use crate::ast::ObjectMember;
use crate::error::SyntaxResult;
use crate::loc::LocationRange;
use crate::token::TT;

/// Ranges of one comprehension clause.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompSpecRanges {
  pub keyword: LocationRange,
  pub variable: Option<LocationRange>,
  pub full: LocationRange,
}

/// Ranges of one parameter or argument: just the name (or the value, for positional arguments),
/// and the whole element including any default or value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementRanges {
  pub head: LocationRange,
  pub full: LocationRange,
}

/// Recovers ranges the AST doesn't keep by anchoring the matcher at nodes that do have one.
pub struct RangeRecovery<'a> {
  ast: &'a Ast,
  matcher: Matcher<'a>,
  parents: Vec<Option<ExprId>>,
}

impl<'a> RangeRecovery<'a> {
  pub fn new(ast: &'a Ast) -> RangeRecovery<'a> {
    RangeRecovery {
      ast,
      matcher: Matcher::new(&ast.tokens),
      parents: ast.parents(),
    }
  }

  pub fn ast(&self) -> &'a Ast {
    self.ast
  }

  pub fn matcher(&self) -> &Matcher<'a> {
    &self.matcher
  }

  pub fn parent(&self, id: ExprId) -> Option<ExprId> {
    self.parents[id.index()]
  }

  fn start_token(&self, id: ExprId) -> Option<usize> {
    let loc = self.ast.get(id).loc?;
    self.matcher.token_index_starting_at(loc.0)
  }

  fn bind_name_token(&self, bind: &Bind) -> Option<usize> {
    self
      .matcher
      .token_index_starting_at(self.ast.offset(bind.name_range.begin))
  }

  /// The first token of a field: its name, or the `[` of a computed name.
  fn field_start_token(&self, field: &ObjectField) -> Option<usize> {
    let name = self.start_token(field.name)?;
    match field.kind {
      FieldKind::Computed => {
        let open = name.checked_sub(1)?;
        (self.matcher.token(open).typ == TT::BracketOpen).then_some(open)
      }
      FieldKind::Id | FieldKind::Str => Some(name),
    }
  }

  /// The name of a field, including the brackets of a computed name.
  pub fn field_name_range(&self, field: &ObjectField) -> SyntaxResult<Option<LocationRange>> {
    let Some(start) = self.field_start_token(field) else {
      return Ok(None);
    };
    Ok(
      self
        .matcher
        .field_name(start)?
        .map(|end| self.matcher.range(start, end)),
    )
  }

  /// A field from the start of its name through the end of its body.
  pub fn field_range(&self, field: &ObjectField) -> SyntaxResult<Option<LocationRange>> {
    let Some(start) = self.field_start_token(field) else {
      return Ok(None);
    };
    Ok(self.matcher.member(start)?.map(|end| self.matcher.range(start, end)))
  }

  pub fn field_body_range(&self, field: &ObjectField) -> SyntaxResult<Option<LocationRange>> {
    self.expr_range(field.body)
  }

  /// The index of the `(` opening a function's parameter list. Method sugar has no location, so its
  /// parameter list is found from the field or bind it came from.
  fn params_open(&self, func: ExprId) -> SyntaxResult<Option<usize>> {
    if let Some(start) = self.start_token(func) {
      return Ok(Some(start + 1));
    }
    let Some(owner) = self.parent(func) else {
      return Ok(None);
    };
    let name_end = match self.ast.kind(owner) {
      ExprKind::Local { binds, .. } => binds
        .iter()
        .find(|b| b.body == func)
        .and_then(|b| self.bind_name_token(b)),
      ExprKind::Object { members } | ExprKind::ObjectComp { members, .. } => {
        let mut found = None;
        for member in members {
          match member {
            ObjectMember::Local(b) if b.body == func => found = self.bind_name_token(b),
            ObjectMember::Field(f) if f.body == func => {
              if let Some(start) = self.field_start_token(f) {
                found = self.matcher.field_name(start)?;
              }
            }
            _ => continue,
          };
          break;
        }
        found
      }
      _ => None,
    };
    Ok(name_end.map(|i| i + 1).filter(|&i| self.matcher.token(i).typ == TT::ParenthesisOpen))
  }

  /// The range of a method's desugared function: from its parameter list through its body.
  pub fn function_range(&self, func: ExprId) -> SyntaxResult<Option<LocationRange>> {
    if let Some(range) = self.ast.range(func) {
      return Ok(Some(range.clone()));
    }
    let ExprKind::Function { body, .. } = self.ast.kind(func) else {
      return Ok(None);
    };
    let (Some(open), Some(body)) = (self.params_open(func)?, self.ast.range(*body)) else {
      return Ok(None);
    };
    let open = &self.matcher.token(open).range;
    Ok(Some(LocationRange::new(open.file.clone(), open.begin, body.end)))
  }

  /// The node's own range, or one recovered from tokens for nodes the parser left without one.
  pub fn expr_range(&self, id: ExprId) -> SyntaxResult<Option<LocationRange>> {
    match self.ast.range(id) {
      Some(range) => Ok(Some(range.clone())),
      None => self.function_range(id),
    }
  }

  pub fn param_ranges(&self, func: ExprId) -> SyntaxResult<Vec<ElementRanges>> {
    let Some(open) = self.params_open(func)? else {
      return Ok(Vec::new());
    };
    Ok(
      self
        .matcher
        .param_spans(open)?
        .unwrap_or_default()
        .into_iter()
        .map(|s| ElementRanges {
          head: self.matcher.range(s.start, s.start),
          full: self.matcher.range(s.start, s.end),
        })
        .collect(),
    )
  }

  pub fn arg_ranges(&self, apply: ExprId) -> SyntaxResult<Vec<ElementRanges>> {
    let ExprKind::Apply { target, .. } = self.ast.kind(apply) else {
      return Ok(Vec::new());
    };
    let Some(target_loc) = self.ast.get(*target).loc else {
      return Ok(Vec::new());
    };
    let open = self.matcher.token_index_from(target_loc.1);
    Ok(
      self
        .matcher
        .arg_spans(open)?
        .unwrap_or_default()
        .into_iter()
        .map(|s| ElementRanges {
          head: self.matcher.range(s.start, s.start),
          full: self.matcher.range(s.start, s.end),
        })
        .collect(),
    )
  }

  /// The `(` of an apply's argument list, if the source has one.
  pub fn args_open(&self, apply: ExprId) -> Option<usize> {
    let ExprKind::Apply { target, .. } = self.ast.kind(apply) else {
      return None;
    };
    let open = self.matcher.token_index_from(self.ast.get(*target).loc?.1);
    (self.matcher.token(open).typ == TT::ParenthesisOpen).then_some(open)
  }

  pub fn comp_spec_ranges(&self, comp: ExprId) -> SyntaxResult<Vec<CompSpecRanges>> {
    let Some(start) = self.start_token(comp) else {
      return Ok(Vec::new());
    };
    let Some(first_for) = self.matcher.comprehension_for(start)? else {
      return Ok(Vec::new());
    };
    Ok(
      self
        .matcher
        .comp_specs(first_for)?
        .into_iter()
        .map(|s| CompSpecRanges {
          keyword: self.matcher.range(s.keyword, s.keyword),
          variable: s.variable.map(|v| self.matcher.range(v, v)),
          full: self.matcher.range(s.keyword, s.end),
        })
        .collect(),
    )
  }
}
