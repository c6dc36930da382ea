use super::Ast;
use super::CompSpec;
use super::ExprId;
use super::ExprKind;
use super::ObjectMember;
use std::fmt::Write;

/// Renders an expression as a compact S-expression. Mostly useful for tests and debugging; sugar is
/// shown in its desugared form.
pub fn sexpr(ast: &Ast, id: ExprId) -> String {
  let mut out = String::new();
  write_expr(ast, id, &mut out);
  out
}

fn write_opt(ast: &Ast, id: Option<ExprId>, out: &mut String) {
  match id {
    Some(id) => write_expr(ast, id, out),
    None => out.push('_'),
  }
}

fn write_members(ast: &Ast, members: &[ObjectMember], out: &mut String) {
  for member in members {
    out.push(' ');
    match member {
      ObjectMember::Local(bind) => {
        let _ = write!(out, "(local {} ", bind.name);
        write_expr(ast, bind.body, out);
        out.push(')');
      }
      ObjectMember::Assert(a) => {
        out.push_str("(assert ");
        write_expr(ast, a.cond, out);
        out.push(' ');
        write_opt(ast, a.message, out);
        out.push(')');
      }
      ObjectMember::Field(f) => {
        out.push('(');
        write_expr(ast, f.name, out);
        if f.plus_super {
          out.push('+');
        }
        out.push_str(f.hide.as_str());
        out.push(' ');
        write_expr(ast, f.body, out);
        out.push(')');
      }
    }
  }
}

fn write_specs(ast: &Ast, specs: &[CompSpec], out: &mut String) {
  for spec in specs {
    match spec {
      CompSpec::For { var, iter } => {
        let _ = write!(out, " (for {} ", var);
        write_expr(ast, *iter, out);
      }
      CompSpec::If { cond } => {
        out.push_str(" (if ");
        write_expr(ast, *cond, out);
      }
    }
    out.push(')');
  }
}

fn write_expr(ast: &Ast, id: ExprId, out: &mut String) {
  match ast.kind(id) {
    ExprKind::Apply {
      target,
      args,
      tailstrict,
    } => {
      out.push_str("(call ");
      write_expr(ast, *target, out);
      for arg in args {
        out.push(' ');
        if let Some(name) = &arg.name {
          let _ = write!(out, "{}=", name);
        }
        write_expr(ast, arg.value, out);
      }
      if *tailstrict {
        out.push_str(" tailstrict");
      }
      out.push(')');
    }
    ExprKind::Array { elements } => {
      out.push('[');
      for (i, e) in elements.iter().enumerate() {
        if i > 0 {
          out.push(' ');
        }
        write_expr(ast, *e, out);
      }
      out.push(']');
    }
    ExprKind::ArrayComp { body, specs } => {
      out.push_str("[comp ");
      write_expr(ast, *body, out);
      write_specs(ast, specs, out);
      out.push(']');
    }
    ExprKind::Assert { cond, message, rest } => {
      out.push_str("(assert ");
      write_expr(ast, *cond, out);
      out.push(' ');
      write_opt(ast, *message, out);
      out.push(' ');
      write_expr(ast, *rest, out);
      out.push(')');
    }
    ExprKind::Binary { op, left, right } => {
      let _ = write!(out, "({} ", op.as_str());
      write_expr(ast, *left, out);
      out.push(' ');
      write_expr(ast, *right, out);
      out.push(')');
    }
    ExprKind::Conditional {
      cond,
      then,
      otherwise,
    } => {
      out.push_str("(if ");
      write_expr(ast, *cond, out);
      out.push(' ');
      write_expr(ast, *then, out);
      out.push(' ');
      write_opt(ast, *otherwise, out);
      out.push(')');
    }
    ExprKind::Dollar => out.push('$'),
    ExprKind::Error { expr } => {
      out.push_str("(error ");
      write_expr(ast, *expr, out);
      out.push(')');
    }
    ExprKind::Function { params, body } => {
      out.push_str("(fn (");
      for (i, p) in params.iter().enumerate() {
        if i > 0 {
          out.push(' ');
        }
        out.push_str(&p.name);
        if let Some(default) = p.default {
          out.push('=');
          write_expr(ast, default, out);
        }
      }
      out.push_str(") ");
      write_expr(ast, *body, out);
      out.push(')');
    }
    ExprKind::Import { file } => {
      let _ = write!(out, "(import {:?})", file);
    }
    ExprKind::ImportBin { file } => {
      let _ = write!(out, "(importbin {:?})", file);
    }
    ExprKind::ImportStr { file } => {
      let _ = write!(out, "(importstr {:?})", file);
    }
    ExprKind::Index { target, index } => {
      out.push_str("(index ");
      write_expr(ast, *target, out);
      out.push(' ');
      write_expr(ast, *index, out);
      out.push(')');
    }
    ExprKind::InSuper { element } => {
      out.push_str("(insuper ");
      write_expr(ast, *element, out);
      out.push(')');
    }
    ExprKind::LiteralBoolean { value } => {
      let _ = write!(out, "{}", value);
    }
    ExprKind::LiteralNull => out.push_str("null"),
    ExprKind::LiteralNumber { text } => out.push_str(text),
    ExprKind::LiteralString { value, .. } => {
      let _ = write!(out, "{:?}", value);
    }
    ExprKind::Local { binds, body } => {
      out.push_str("(local (");
      for (i, b) in binds.iter().enumerate() {
        if i > 0 {
          out.push(' ');
        }
        let _ = write!(out, "({} ", b.name);
        write_expr(ast, b.body, out);
        out.push(')');
      }
      out.push_str(") ");
      write_expr(ast, *body, out);
      out.push(')');
    }
    ExprKind::Object { members } => {
      out.push_str("{obj");
      write_members(ast, members, out);
      out.push('}');
    }
    ExprKind::ObjectComp { members, specs } => {
      out.push_str("{comp");
      write_members(ast, members, out);
      write_specs(ast, specs, out);
      out.push('}');
    }
    ExprKind::Parens { inner } => {
      out.push_str("(paren ");
      write_expr(ast, *inner, out);
      out.push(')');
    }
    ExprKind::Partial => out.push('?'),
    ExprKind::SelfRef => out.push_str("self"),
    ExprKind::Slice {
      target,
      begin,
      end,
      step,
    } => {
      out.push_str("(slice ");
      write_expr(ast, *target, out);
      for part in [begin, end, step] {
        out.push(' ');
        write_opt(ast, *part, out);
      }
      out.push(')');
    }
    ExprKind::SuperIndex { index } => {
      out.push_str("(super ");
      write_expr(ast, *index, out);
      out.push(')');
    }
    ExprKind::Unary { op, expr } => {
      let _ = write!(out, "({} ", op.as_str());
      write_expr(ast, *expr, out);
      out.push(')');
    }
    ExprKind::Var { name } => out.push_str(name),
  }
}
