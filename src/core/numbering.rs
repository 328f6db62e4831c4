use chrono::{Datelike, NaiveDate};

use super::error::FacturxError;

/// Gapless invoice number sequence generator.
///
/// Numbers are rendered from a template with `{year}` and `{seq}`
/// placeholders; `{seq:06}` (or `{seq:06d}`) zero-pads the counter,
/// e.g. `FX-{year}-{seq:06}` gives "FX-2024-000001".
#[derive(Debug, Clone)]
pub struct InvoiceNumberSequence {
    template: Vec<Segment>,
    year: i32,
    next_number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Year,
    Seq { width: usize },
}

impl InvoiceNumberSequence {
    /// Create a new sequence starting at 1.
    pub fn new(format: &str, year: i32) -> Result<Self, FacturxError> {
        Self::starting_at(format, year, 1)
    }

    /// Create a sequence continuing from a given number.
    pub fn starting_at(format: &str, year: i32, next_number: u64) -> Result<Self, FacturxError> {
        let template = parse_template(format)?;
        if !template.iter().any(|s| matches!(s, Segment::Seq { .. })) {
            return Err(FacturxError::Numbering(format!(
                "number format '{format}' has no {{seq}} placeholder"
            )));
        }
        if next_number == 0 {
            return Err(FacturxError::Numbering(
                "sequence numbers start at 1".into(),
            ));
        }
        Ok(Self {
            template,
            year,
            next_number,
        })
    }

    /// Generate the next invoice number.
    pub fn next_number(&mut self) -> String {
        let rendered = self.render(self.next_number);
        self.next_number += 1;
        rendered
    }

    /// Preview the next number without consuming it.
    pub fn peek(&self) -> String {
        self.render(self.next_number)
    }

    /// Get the current year of the sequence.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Get the next number that will be issued (without formatting).
    pub fn next_raw(&self) -> u64 {
        self.next_number
    }

    /// Advance to a new year, resetting the counter to 1.
    pub fn advance_year(&mut self, new_year: i32) -> Result<(), FacturxError> {
        if new_year <= self.year {
            return Err(FacturxError::Numbering(format!(
                "new year {new_year} must be greater than current year {}",
                self.year
            )));
        }
        self.year = new_year;
        self.next_number = 1;
        Ok(())
    }

    /// Auto-advance year if the given date is in a new year.
    /// Returns true if the year was advanced.
    pub fn auto_advance(&mut self, date: NaiveDate) -> bool {
        let date_year = date.year();
        if date_year > self.year {
            self.year = date_year;
            self.next_number = 1;
            true
        } else {
            false
        }
    }

    fn render(&self, seq: u64) -> String {
        let mut out = String::new();
        for segment in &self.template {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Year => out.push_str(&self.year.to_string()),
                Segment::Seq { width } => out.push_str(&format!("{seq:0>w$}", w = *width)),
            }
        }
        out
    }
}

fn parse_template(format: &str) -> Result<Vec<Segment>, FacturxError> {
    let mut segments = Vec::new();
    let mut rest = format;
    while let Some(start) = rest.find('{') {
        if start > 0 {
            segments.push(Segment::Literal(rest[..start].to_string()));
        }
        let end = rest[start..].find('}').ok_or_else(|| {
            FacturxError::Numbering(format!("unclosed placeholder in '{format}'"))
        })? + start;
        segments.push(parse_placeholder(&rest[start + 1..end], format)?);
        rest = &rest[end + 1..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }
    Ok(segments)
}

fn parse_placeholder(inner: &str, format: &str) -> Result<Segment, FacturxError> {
    let (name, spec) = match inner.split_once(':') {
        Some((n, s)) => (n, Some(s)),
        None => (inner, None),
    };
    match (name, spec) {
        ("year", None) => Ok(Segment::Year),
        ("seq", None) => Ok(Segment::Seq { width: 0 }),
        ("seq", Some(spec)) => {
            let digits = spec.trim_end_matches('d');
            let width = digits.trim_start_matches('0');
            let width = if width.is_empty() && !digits.is_empty() {
                Ok(0)
            } else {
                width.parse::<usize>()
            };
            width
                .map(|width| Segment::Seq { width })
                .map_err(|_| {
                    FacturxError::Numbering(format!(
                        "invalid sequence width '{spec}' in '{format}'"
                    ))
                })
        }
        _ => Err(FacturxError::Numbering(format!(
            "unknown placeholder '{{{inner}}}' in '{format}'"
        ))),
    }
}
