use super::node::ExprId;
use crate::loc::LocationRange;
use serde::Serialize;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize)]
pub enum BinaryOp {
  Mult,
  Div,
  Percent,
  Plus,
  Minus,
  ShiftL,
  ShiftR,
  Greater,
  GreaterEq,
  Less,
  LessEq,
  In,
  ManifestEqual,
  ManifestUnequal,
  BitwiseAnd,
  BitwiseXor,
  BitwiseOr,
  And,
  Or,
}

impl BinaryOp {
  pub fn from_operator(op: &str) -> Option<BinaryOp> {
    Some(match op {
      "*" => BinaryOp::Mult,
      "/" => BinaryOp::Div,
      "%" => BinaryOp::Percent,
      "+" => BinaryOp::Plus,
      "-" => BinaryOp::Minus,
      "<<" => BinaryOp::ShiftL,
      ">>" => BinaryOp::ShiftR,
      ">" => BinaryOp::Greater,
      ">=" => BinaryOp::GreaterEq,
      "<" => BinaryOp::Less,
      "<=" => BinaryOp::LessEq,
      "==" => BinaryOp::ManifestEqual,
      "!=" => BinaryOp::ManifestUnequal,
      "&" => BinaryOp::BitwiseAnd,
      "^" => BinaryOp::BitwiseXor,
      "|" => BinaryOp::BitwiseOr,
      "&&" => BinaryOp::And,
      "||" => BinaryOp::Or,
      _ => return None,
    })
  }

  pub fn as_str(self) -> &'static str {
    match self {
      BinaryOp::Mult => "*",
      BinaryOp::Div => "/",
      BinaryOp::Percent => "%",
      BinaryOp::Plus => "+",
      BinaryOp::Minus => "-",
      BinaryOp::ShiftL => "<<",
      BinaryOp::ShiftR => ">>",
      BinaryOp::Greater => ">",
      BinaryOp::GreaterEq => ">=",
      BinaryOp::Less => "<",
      BinaryOp::LessEq => "<=",
      BinaryOp::In => "in",
      BinaryOp::ManifestEqual => "==",
      BinaryOp::ManifestUnequal => "!=",
      BinaryOp::BitwiseAnd => "&",
      BinaryOp::BitwiseXor => "^",
      BinaryOp::BitwiseOr => "|",
      BinaryOp::And => "&&",
      BinaryOp::Or => "||",
    }
  }

  /// Binding power; higher binds tighter.
  pub fn precedence(self) -> u8 {
    match self {
      BinaryOp::Mult | BinaryOp::Div | BinaryOp::Percent => 11,
      BinaryOp::Plus | BinaryOp::Minus => 10,
      BinaryOp::ShiftL | BinaryOp::ShiftR => 9,
      BinaryOp::Greater | BinaryOp::GreaterEq | BinaryOp::Less | BinaryOp::LessEq | BinaryOp::In => 8,
      BinaryOp::ManifestEqual | BinaryOp::ManifestUnequal => 7,
      BinaryOp::BitwiseAnd => 6,
      BinaryOp::BitwiseXor => 5,
      BinaryOp::BitwiseOr => 4,
      BinaryOp::And => 3,
      BinaryOp::Or => 2,
    }
  }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize)]
pub enum UnaryOp {
  Not,
  BitwiseNot,
  Plus,
  Minus,
}

impl UnaryOp {
  pub fn from_operator(op: &str) -> Option<UnaryOp> {
    Some(match op {
      "!" => UnaryOp::Not,
      "~" => UnaryOp::BitwiseNot,
      "+" => UnaryOp::Plus,
      "-" => UnaryOp::Minus,
      _ => return None,
    })
  }

  pub fn as_str(self) -> &'static str {
    match self {
      UnaryOp::Not => "!",
      UnaryOp::BitwiseNot => "~",
      UnaryOp::Plus => "+",
      UnaryOp::Minus => "-",
    }
  }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize)]
pub enum LiteralStringKind {
  Single,
  Double,
  Block,
  VerbatimSingle,
  VerbatimDouble,
}

#[derive(Clone, Debug, Serialize)]
pub struct Arg {
  pub name: Option<String>,
  pub value: ExprId,
}

/// Parameters carry no ranges; they're recovered from tokens when needed.
#[derive(Clone, Debug, Serialize)]
pub struct Param {
  pub name: String,
  pub default: Option<ExprId>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Bind {
  pub name: String,
  pub name_range: LocationRange,
  // For `f(x) = ...` this is a desugared, location-less function.
  pub body: ExprId,
  pub method: bool,
}

#[derive(Clone, Debug, Serialize)]
pub enum CompSpec {
  For { var: String, iter: ExprId },
  If { cond: ExprId },
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize)]
pub enum FieldKind {
  // `a: 1`
  Id,
  // `"a": 1`
  Str,
  // `[e]: 1`
  Computed,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize)]
pub enum Hide {
  // `:`
  Inherit,
  // `::`
  Hidden,
  // `:::`
  Visible,
}

impl Hide {
  pub fn as_str(self) -> &'static str {
    match self {
      Hide::Inherit => ":",
      Hide::Hidden => "::",
      Hide::Visible => ":::",
    }
  }
}

/// A field's overall range isn't stored; it's recovered from tokens when needed.
#[derive(Clone, Debug, Serialize)]
pub struct ObjectField {
  pub kind: FieldKind,
  // A string literal for `Id` and `Str` fields, otherwise the bracketed expression.
  pub name: ExprId,
  pub hide: Hide,
  pub plus_super: bool,
  pub method: bool,
  pub body: ExprId,
}

#[derive(Clone, Debug, Serialize)]
pub struct ObjectAssert {
  pub cond: ExprId,
  pub message: Option<ExprId>,
}

#[derive(Clone, Debug, Serialize)]
pub enum ObjectMember {
  Local(Bind),
  Assert(ObjectAssert),
  Field(ObjectField),
}

#[derive(Clone, Debug, Serialize)]
pub enum ExprKind {
  Apply {
    target: ExprId,
    args: Vec<Arg>,
    tailstrict: bool,
  },
  Array {
    elements: Vec<ExprId>,
  },
  ArrayComp {
    body: ExprId,
    specs: Vec<CompSpec>,
  },
  Assert {
    cond: ExprId,
    message: Option<ExprId>,
    rest: ExprId,
  },
  Binary {
    op: BinaryOp,
    left: ExprId,
    right: ExprId,
  },
  Conditional {
    cond: ExprId,
    then: ExprId,
    otherwise: Option<ExprId>,
  },
  Dollar,
  Error {
    expr: ExprId,
  },
  Function {
    params: Vec<Param>,
    body: ExprId,
  },
  Import {
    file: String,
  },
  ImportBin {
    file: String,
  },
  ImportStr {
    file: String,
  },
  Index {
    target: ExprId,
    index: ExprId,
  },
  InSuper {
    element: ExprId,
  },
  LiteralBoolean {
    value: bool,
  },
  LiteralNull,
  LiteralNumber {
    text: String,
  },
  LiteralString {
    value: String,
    kind: LiteralStringKind,
  },
  Local {
    binds: Vec<Bind>,
    body: ExprId,
  },
  Object {
    members: Vec<ObjectMember>,
  },
  // Exactly one member is a field, and its name is computed.
  ObjectComp {
    members: Vec<ObjectMember>,
    specs: Vec<CompSpec>,
  },
  Parens {
    inner: ExprId,
  },
  // Stands in for an expression the source ended before supplying.
  Partial,
  SelfRef,
  Slice {
    target: ExprId,
    begin: Option<ExprId>,
    end: Option<ExprId>,
    step: Option<ExprId>,
  },
  SuperIndex {
    index: ExprId,
  },
  Unary {
    op: UnaryOp,
    expr: ExprId,
  },
  Var {
    name: String,
  },
}

impl ExprKind {
  pub fn name(&self) -> &'static str {
    match self {
      ExprKind::Apply { .. } => "Apply",
      ExprKind::Array { .. } => "Array",
      ExprKind::ArrayComp { .. } => "ArrayComp",
      ExprKind::Assert { .. } => "Assert",
      ExprKind::Binary { .. } => "Binary",
      ExprKind::Conditional { .. } => "Conditional",
      ExprKind::Dollar => "Dollar",
      ExprKind::Error { .. } => "Error",
      ExprKind::Function { .. } => "Function",
      ExprKind::Import { .. } => "Import",
      ExprKind::ImportBin { .. } => "ImportBin",
      ExprKind::ImportStr { .. } => "ImportStr",
      ExprKind::Index { .. } => "Index",
      ExprKind::InSuper { .. } => "InSuper",
      ExprKind::LiteralBoolean { .. } => "LiteralBoolean",
      ExprKind::LiteralNull => "LiteralNull",
      ExprKind::LiteralNumber { .. } => "LiteralNumber",
      ExprKind::LiteralString { .. } => "LiteralString",
      ExprKind::Local { .. } => "Local",
      ExprKind::Object { .. } => "Object",
      ExprKind::ObjectComp { .. } => "ObjectComp",
      ExprKind::Parens { .. } => "Parens",
      ExprKind::Partial => "Partial",
      ExprKind::SelfRef => "Self",
      ExprKind::Slice { .. } => "Slice",
      ExprKind::SuperIndex { .. } => "SuperIndex",
      ExprKind::Unary { .. } => "Unary",
      ExprKind::Var { .. } => "Var",
    }
  }

  /// The path of an import expression, if this is one.
  pub fn import_path(&self) -> Option<&str> {
    match self {
      ExprKind::Import { file } | ExprKind::ImportBin { file } | ExprKind::ImportStr { file } => {
        Some(file)
      }
      _ => None,
    }
  }

  pub fn as_string_literal(&self) -> Option<&str> {
    match self {
      ExprKind::LiteralString { value, .. } => Some(value),
      _ => None,
    }
  }
}

fn push_members(out: &mut Vec<ExprId>, members: &[ObjectMember]) {
  for member in members {
    match member {
      ObjectMember::Local(bind) => out.push(bind.body),
      ObjectMember::Assert(a) => {
        out.push(a.cond);
        out.extend(a.message);
      }
      ObjectMember::Field(f) => {
        out.push(f.name);
        out.push(f.body);
      }
    }
  }
}

fn push_specs(out: &mut Vec<ExprId>, specs: &[CompSpec]) {
  for spec in specs {
    match spec {
      CompSpec::For { iter, .. } => out.push(*iter),
      CompSpec::If { cond } => out.push(*cond),
    }
  }
}

impl ExprKind {
  /// Direct children in source order.
  pub fn children(&self) -> Vec<ExprId> {
    let mut out = Vec::new();
    match self {
      ExprKind::Apply { target, args, .. } => {
        out.push(*target);
        out.extend(args.iter().map(|a| a.value));
      }
      ExprKind::Array { elements } => out.extend(elements.iter().copied()),
      ExprKind::ArrayComp { body, specs } => {
        out.push(*body);
        push_specs(&mut out, specs);
      }
      ExprKind::Assert { cond, message, rest } => {
        out.push(*cond);
        out.extend(*message);
        out.push(*rest);
      }
      ExprKind::Binary { left, right, .. } => {
        out.push(*left);
        out.push(*right);
      }
      ExprKind::Conditional { cond, then, otherwise } => {
        out.push(*cond);
        out.push(*then);
        out.extend(*otherwise);
      }
      ExprKind::Error { expr } => out.push(*expr),
      ExprKind::Function { params, body } => {
        out.extend(params.iter().filter_map(|p| p.default));
        out.push(*body);
      }
      ExprKind::Index { target, index } => {
        out.push(*target);
        out.push(*index);
      }
      ExprKind::InSuper { element } => out.push(*element),
      ExprKind::Local { binds, body } => {
        out.extend(binds.iter().map(|b| b.body));
        out.push(*body);
      }
      ExprKind::Object { members } => push_members(&mut out, members),
      ExprKind::ObjectComp { members, specs } => {
        push_members(&mut out, members);
        push_specs(&mut out, specs);
      }
      ExprKind::Parens { inner } => out.push(*inner),
      ExprKind::Slice {
        target,
        begin,
        end,
        step,
      } => {
        out.push(*target);
        out.extend(*begin);
        out.extend(*end);
        out.extend(*step);
      }
      ExprKind::SuperIndex { index } => out.push(*index),
      ExprKind::Unary { expr, .. } => out.push(*expr),
      ExprKind::Dollar
      | ExprKind::Import { .. }
      | ExprKind::ImportBin { .. }
      | ExprKind::ImportStr { .. }
      | ExprKind::LiteralBoolean { .. }
      | ExprKind::LiteralNull
      | ExprKind::LiteralNumber { .. }
      | ExprKind::LiteralString { .. }
      | ExprKind::Partial
      | ExprKind::SelfRef
      | ExprKind::Var { .. } => {}
    };
    out
  }
}
