use super::Engine;
use super::QueryResult;
use parse_jsonnet::ast::BinaryOp;
use parse_jsonnet::ast::ExprId;
use parse_jsonnet::ast::ExprKind;
use parse_jsonnet::ast::FieldKind;
use parse_jsonnet::ast::ObjectMember;
use parse_jsonnet::error::SyntaxResult;
use parse_jsonnet::loc::LocationRange;
use parse_jsonnet::matcher::RangeRecovery;
use parse_jsonnet::parse;
use serde::Serialize;
use tracing::debug_span;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum SymbolKind {
  Variable,
  Function,
  Field,
  Method,
}

/// An entry of a file's outline.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct DocumentSymbol {
  pub name: String,
  pub kind: SymbolKind,
  /// The whole declaration, from its name through its value.
  pub range: LocationRange,
  /// Just the name.
  pub selection_range: LocationRange,
  pub children: Vec<DocumentSymbol>,
}

struct Outline<'a> {
  recovery: RangeRecovery<'a>,
}

impl<'a> Outline<'a> {
  fn is_function(&self, id: ExprId) -> bool {
    matches!(self.recovery.ast().kind(id), ExprKind::Function { .. })
  }

  /// Symbols declared by an expression. Locals only count at the top of the file; below that, only
  /// object fields make up the outline.
  fn symbols(&self, id: ExprId, top: bool, out: &mut Vec<DocumentSymbol>) -> SyntaxResult<()> {
    let ast = self.recovery.ast();
    match ast.kind(id) {
      ExprKind::Local { binds, body } => {
        if top {
          for bind in binds {
            let range = match self.recovery.expr_range(bind.body)? {
              Some(body) => bind.name_range.join(&body),
              None => bind.name_range.clone(),
            };
            let mut children = Vec::new();
            self.symbols(bind.body, false, &mut children)?;
            out.push(DocumentSymbol {
              name: bind.name.clone(),
              kind: if self.is_function(bind.body) {
                SymbolKind::Function
              } else {
                SymbolKind::Variable
              },
              range,
              selection_range: bind.name_range.clone(),
              children,
            });
          }
        }
        self.symbols(*body, top, out)?;
      }
      ExprKind::Object { members } => {
        for member in members {
          let ObjectMember::Field(field) = member else {
            continue;
          };
          if field.kind == FieldKind::Computed {
            continue;
          }
          let (Some(name), Some(selection_range)) =
            (ast.kind(field.name).as_string_literal(), ast.range(field.name))
          else {
            continue;
          };
          let range = self
            .recovery
            .field_range(field)?
            .unwrap_or_else(|| selection_range.clone());
          let mut children = Vec::new();
          self.symbols(field.body, false, &mut children)?;
          out.push(DocumentSymbol {
            name: name.to_string(),
            kind: if field.method || self.is_function(field.body) {
              SymbolKind::Method
            } else {
              SymbolKind::Field
            },
            range,
            selection_range: selection_range.clone(),
            children,
          });
        }
      }
      ExprKind::Parens { inner } => self.symbols(*inner, top, out)?,
      ExprKind::Binary {
        op: BinaryOp::Plus,
        left,
        right,
      } => {
        self.symbols(*left, top, out)?;
        self.symbols(*right, top, out)?;
      }
      _ => {}
    };
    Ok(())
  }
}

impl Engine {
  /// The outline of a file: its top-level locals and the fields of the object it evaluates to,
  /// with nested objects' fields as children. The file doesn't need to be free of static errors.
  pub fn document_symbols(&self, source: &str) -> QueryResult<Vec<DocumentSymbol>> {
    let _span = debug_span!("document_symbols").entered();
    let ast = parse(None, source)?;
    let outline = Outline {
      recovery: RangeRecovery::new(&ast),
    };
    let mut out = Vec::new();
    outline.symbols(ast.root, true, &mut out)?;
    Ok(out)
  }
}
