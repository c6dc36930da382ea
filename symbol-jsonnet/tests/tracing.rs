use std::io;
use std::sync::Arc;
use std::sync::Mutex;
use symbol_jsonnet::Engine;
use symbol_jsonnet::MemoryHost;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct SharedWriter {
  buffer: Arc<Mutex<Vec<u8>>>,
}

impl SharedWriter {
  fn into_inner(self) -> Vec<u8> {
    match Arc::try_unwrap(self.buffer) {
      Ok(buffer) => buffer.into_inner().unwrap(),
      Err(arc) => arc.lock().unwrap().clone(),
    }
  }
}

struct SharedWriterGuard<'a> {
  buffer: &'a Arc<Mutex<Vec<u8>>>,
}

impl<'a> io::Write for SharedWriterGuard<'a> {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.buffer.lock().unwrap().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

impl<'a> MakeWriter<'a> for SharedWriter {
  type Writer = SharedWriterGuard<'a>;

  fn make_writer(&'a self) -> Self::Writer {
    SharedWriterGuard {
      buffer: &self.buffer,
    }
  }
}

#[test]
fn tracing_emits_query_spans() {
  let writer = SharedWriter::default();
  let subscriber = tracing_subscriber::fmt()
    .with_span_events(FmtSpan::CLOSE)
    .with_max_level(tracing::Level::DEBUG)
    .with_ansi(false)
    .with_writer(writer.clone())
    .finish();
  let _guard = tracing::subscriber::set_default(subscriber);

  let host = MemoryHost::new();
  host.write("/util.libsonnet", "{ v: 1 }");
  let engine = Engine::new(Arc::new(host));
  let found = engine
    .hover_at(
      "/main.jsonnet",
      "local u = import 'util.libsonnet'; u.v",
      parse_jsonnet::loc::Position::new(1, 38),
    )
    .unwrap();
  assert_eq!(found.unwrap().text, "(number) 1");

  drop(_guard);
  let output = String::from_utf8(writer.into_inner()).unwrap();
  for span in ["hover_at", "parse", "analyze", "build_scope_graph", "build_cache_entry"] {
    assert!(
      output.contains(span),
      "expected {span} span output, got: {output}"
    );
  }
  assert!(
    output.contains("time.busy"),
    "expected span timings to be recorded"
  );
}
