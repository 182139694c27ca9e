use std::fmt::Debug;

use tracing::field::{Field, Visit};
use tracing_subscriber::{
  field::RecordFields,
  fmt::{
    format::Writer,
    FormatFields
  }
};

/// Prints the message first, then any structured fields, and hides the bookkeeping fields (`threshold`,
/// `critical`) that only steer filtering.
pub(crate) struct HeapFieldFormatter;

impl<'writer> FormatFields<'writer> for HeapFieldFormatter {
  fn format_fields<R: RecordFields>(
    &self,
    writer: Writer<'writer>,
    fields: R,
  ) -> std::fmt::Result {
    let mut visitor = HeapFieldVisitor { writer, result: Ok(()) };
    fields.record(&mut visitor);
    visitor.result
  }
}

struct HeapFieldVisitor<'writer> {
  writer: Writer<'writer>,
  result: std::fmt::Result,
}

impl<'writer> HeapFieldVisitor<'writer> {
  fn write_field(&mut self, name: &str, value: &dyn Debug) {
    if self.result.is_err() {
      return;
    }
    self.result = match name {
      "threshold" => Ok(()),
      "message"   => write!(self.writer, "{:?} ", value),
      _           => write!(self.writer, "{}={:?} ", name, value),
    };
  }
}

impl<'writer> Visit for HeapFieldVisitor<'writer> {
  fn record_bool(&mut self, field: &Field, value: bool) {
    if field.name() == "critical" {
      if value && self.result.is_ok() {
        self.result = write!(self.writer, "[CRITICAL] ");
      }
    } else {
      self.write_field(field.name(), &value);
    }
  }

  fn record_str(&mut self, field: &Field, value: &str) {
    // Strings print without quotes.
    if self.result.is_ok() && field.name() != "threshold" {
      self.result = write!(self.writer, "{}={} ", field.name(), value);
    }
  }

  fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
    self.write_field(field.name(), value);
  }
}
