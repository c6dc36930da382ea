use super::sort_ranges;
use super::Engine;
use super::QueryResult;
use super::Target;
use crate::file::ParsedFile;
use crate::graph::resolve::FieldRef;
use crate::graph::resolve::Resolver;
use parse_jsonnet::loc::LocationRange;
use parse_jsonnet::loc::Position;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use tracing::debug_span;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum HighlightKind {
  Declaration,
  Reference,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct Highlight {
  pub range: LocationRange,
  pub kind: HighlightKind,
}

/// Where a target is declared, and every use of it found in `file`.
struct Occurrences {
  declaration: Option<LocationRange>,
  uses: Vec<LocationRange>,
}

/// Uses of a field: wherever a reference's literal path reaches it, at any depth.
fn field_uses(file: &Arc<ParsedFile>, resolver: &Resolver<'_>, field: &FieldRef) -> Vec<LocationRange> {
  let mut uses = Vec::new();
  for reference in file.graph.references() {
    for depth in 1..=reference.path.len() {
      if resolver.reference_field(file, reference, depth).as_ref() == Some(field) {
        uses.push(reference.site(depth).clone());
      }
    }
  }
  uses
}

fn occurrences(file: &Arc<ParsedFile>, resolver: &Resolver<'_>, target: &Target) -> Occurrences {
  match target {
    Target::Decl(decl) => Occurrences {
      declaration: file.graph.decl(*decl).range.clone(),
      uses: file.graph.references_to(*decl, &[] as &[&str]),
    },
    Target::Field(field) => Occurrences {
      declaration: Some(field.field.range.clone()),
      uses: field_uses(file, resolver, field),
    },
    Target::Object(_) | Target::Value(_) => Occurrences {
      declaration: None,
      uses: Vec::new(),
    },
  }
}

impl Engine {
  /// The declaration of what's at a position and every use of it in the file, ordered by
  /// position. A field's uses are only those indexing through that field, so for
  /// `local o = {a: 1}; [o, o.a]` the field `a` is used once.
  pub fn references_of(&self, file: &str, source: &str, pos: Position) -> QueryResult<Vec<LocationRange>> {
    let _span = debug_span!("references_of", file, line = pos.line, column = pos.column).entered();
    let libs = self.config.library_paths.clone();
    let imports = self.imports(&libs);
    let parsed = self.load(Some(file), source, &imports)?;
    parsed.analysis.clone()?;
    let resolver = self.resolver(&imports);
    let Some((target, _)) = self.target_at(&parsed, &resolver, pos) else {
      return Ok(Vec::new());
    };
    let found = occurrences(&parsed, &resolver, &target);
    let mut ranges: Vec<LocationRange> = found.declaration.into_iter().chain(found.uses).collect();
    sort_ranges(&mut ranges);
    debug!(count = ranges.len(), "found references");
    Ok(ranges)
  }

  /// Like [`Engine::references_of`], but only ranges within the file itself, marking which one
  /// declares the target.
  pub fn highlights_at(&self, file: &str, source: &str, pos: Position) -> QueryResult<Vec<Highlight>> {
    let _span = debug_span!("highlights_at", file, line = pos.line, column = pos.column).entered();
    let libs = self.config.library_paths.clone();
    let imports = self.imports(&libs);
    let parsed = self.load(Some(file), source, &imports)?;
    parsed.analysis.clone()?;
    let resolver = self.resolver(&imports);
    let Some((target, _)) = self.target_at(&parsed, &resolver, pos) else {
      return Ok(Vec::new());
    };
    let found = occurrences(&parsed, &resolver, &target);
    let in_file = |r: &LocationRange| r.file.as_deref() == Some(file);
    let mut highlights: Vec<Highlight> = found
      .declaration
      .into_iter()
      .filter(in_file)
      .map(|range| Highlight {
        range,
        kind: HighlightKind::Declaration,
      })
      .collect();
    let mut uses = found.uses;
    sort_ranges(&mut uses);
    highlights.extend(uses.into_iter().filter(in_file).map(|range| Highlight {
      range,
      kind: HighlightKind::Reference,
    }));
    highlights.sort_by_key(|h| h.range.begin);
    Ok(highlights)
  }
}
