use parse_jsonnet::error::SyntaxResult;
use parse_jsonnet::lex::lex_next;
use parse_jsonnet::lex::string::unescape;
use parse_jsonnet::lex::Lexer;
use parse_jsonnet::loc::LocationRange;
use parse_jsonnet::token::TT;
use serde::Serialize;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub enum ImportKind {
  /// `import`: a Jsonnet file.
  Code,
  /// `importstr`: a file's text.
  Str,
  /// `importbin`: a file's bytes.
  Bin,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImportRef {
  pub kind: ImportKind,
  pub path: String,
  /// The import keyword through the path.
  pub range: LocationRange,
}

/// Find the imports of a file from its tokens alone, so files that don't parse still have their
/// imports found.
pub fn collect_imports(file: Option<&str>, source: &str) -> SyntaxResult<Vec<ImportRef>> {
  let mut lexer = Lexer::new(file, source);
  let mut out = Vec::new();
  let mut pending: Option<(ImportKind, LocationRange)> = None;
  loop {
    let t = lex_next(&mut lexer)?;
    if let Some((kind, start)) = pending.take() {
      if t.typ.is_string() {
        out.push(ImportRef {
          kind,
          path: unescape(&t)?,
          range: start.join(&t.range),
        });
        continue;
      }
    }
    let kind = match t.typ {
      TT::EOF => break,
      TT::KeywordImport => ImportKind::Code,
      TT::KeywordImportstr => ImportKind::Str,
      TT::KeywordImportbin => ImportKind::Bin,
      _ => continue,
    };
    pending = Some((kind, t.range));
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::collect_imports;
  use super::ImportKind;
  use parse_jsonnet::loc::Position;

  #[test]
  fn test_collect_imports() {
    let source = "local a = import 'a.libsonnet';\nlocal b = importstr \"b\\u0041.txt\";\n{ c: importbin @'c.bin', d: import }";
    let imports = collect_imports(None, source).unwrap();
    let found: Vec<_> = imports
      .iter()
      .map(|i| (i.kind, i.path.as_str()))
      .collect();
    assert_eq!(found, vec![
      (ImportKind::Code, "a.libsonnet"),
      (ImportKind::Str, "bA.txt"),
      (ImportKind::Bin, "c.bin"),
    ]);
    assert_eq!(imports[0].range.begin, Position::new(1, 11));
    assert_eq!(imports[0].range.end, Position::new(1, 31));
  }

  #[test]
  fn test_collect_imports_ignores_syntax_errors() {
    let imports = collect_imports(None, "{ a: import 'x.jsonnet' + }}}").unwrap();
    assert_eq!(imports.len(), 1);
    assert!(collect_imports(None, "import 'unterminated").is_err());
  }
}
