use std::fmt::Write;

use chrono::SecondsFormat;
use collector::{aggregate, aggregate_by_asset};
use ledger_api::Record;

use crate::error::ReportError;

pub const DEFAULT_FORMAT: &str =
    "id: {id} -> (asset: {asset}, amount: {amount}, created_at: {created_at})";

// ═══════════════════════════════════════════════════════════════
//  Template
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Asset,
    Opponent,
    Amount,
    CreatedAt,
    Memo,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Field::Id),
            "asset" => Some(Field::Asset),
            "opponent" => Some(Field::Opponent),
            "amount" => Some(Field::Amount),
            "created_at" => Some(Field::CreatedAt),
            "memo" => Some(Field::Memo),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// Per-record line format with `{field}` placeholders.
/// `{{` and `}}` stand for literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(src: &str) -> Result<Self, ReportError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = src.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => name.push(ch),
                            None => return Err(ReportError::Template(format!("unclosed placeholder '{{{name}' in {src:?}"))),
                        }
                    }
                    let field = Field::parse(name.trim())
                        .ok_or_else(|| ReportError::Template(format!("unknown field '{name}'")))?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(field));
                }
                '}' => return Err(ReportError::Template(format!("unmatched '}}' in {src:?}"))),
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    pub fn render(&self, record: &Record) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                Segment::Literal(s) => out.push_str(s),
                Segment::Field(Field::Id) => out.push_str(&record.id),
                Segment::Field(Field::Asset) => out.push_str(&record.asset_id),
                Segment::Field(Field::Opponent) => out.push_str(&record.counterparty_id),
                Segment::Field(Field::Amount) => {
                    let _ = write!(out, "{}", record.amount);
                }
                Segment::Field(Field::CreatedAt) => {
                    out.push_str(&record.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true));
                }
                Segment::Field(Field::Memo) => out.push_str(&record.memo),
            }
        }
        out
    }
}

// ═══════════════════════════════════════════════════════════════
//  Report
// ═══════════════════════════════════════════════════════════════

/// What goes into the textual report besides the summary line.
#[derive(Debug, Clone)]
pub struct Layout {
    pub template: Template,
    pub verbose: bool,
    pub by_asset: bool,
}

pub fn render_report(records: &[Record], layout: &Layout) -> String {
    let mut out = String::new();

    if layout.verbose {
        for r in records {
            out.push_str(&layout.template.render(r));
            out.push('\n');
        }
        out.push('\n');
    }

    let summary = aggregate(records);
    let _ = writeln!(out, "count: {}, total: {}", summary.count, summary.total);

    if layout.by_asset {
        for (asset, s) in aggregate_by_asset(records) {
            let _ = writeln!(out, "asset: {asset} -> (count: {}, total: {})", s.count, s.total);
        }
    }

    out
}

/// Ids quoted and comma-joined, ready to paste into an SQL `IN (...)`.
pub fn render_ids(records: &[Record]) -> String {
    let ids: Vec<String> = records.iter().map(|r| format!("'{}'", r.id)).collect();
    format!("{}\n", ids.join(", "))
}
