//! Line commands and page rendering.

use anyhow::{bail, Result};
use serde_json::Value;
use superpane::types::FieldPath;
use superpane::PageState;

const CELL_WIDTH: usize = 28;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    /// One-based, as typed
    Page(usize),
    PageSize(usize),
    Search(String),
    SearchField(Option<FieldPath>),
    Columns(Vec<FieldPath>),
    Fields,
    Refresh,
    /// Demo only: put a draft title on a document
    Edit { id: String, title: String },
    /// Demo only
    Publish(String),
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let command = match word {
            "n" | "next" => Command::Next,
            "p" | "prev" => Command::Previous,
            "page" => match rest.parse::<usize>() {
                Ok(page) if page > 0 => Command::Page(page),
                _ => bail!("usage: page <number, from 1>"),
            },
            "size" => match rest.parse::<usize>() {
                Ok(size) if size > 0 => Command::PageSize(size),
                _ => bail!("usage: size <rows per page>"),
            },
            "/" | "search" => Command::Search(rest.to_string()),
            "field" if rest.is_empty() || rest == "none" => Command::SearchField(None),
            "field" => Command::SearchField(Some(FieldPath::parse(rest)?)),
            "columns" => Command::Columns(
                rest.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(FieldPath::parse)
                    .collect::<std::result::Result<_, _>>()?,
            ),
            "fields" => Command::Fields,
            "r" | "refresh" => Command::Refresh,
            "edit" => match rest.split_once(char::is_whitespace) {
                Some((id, title)) => Command::Edit {
                    id: id.to_string(),
                    title: title.trim().to_string(),
                },
                None => bail!("usage: edit <id> <title>"),
            },
            "publish" if !rest.is_empty() => Command::Publish(rest.to_string()),
            "publish" => bail!("usage: publish <id>"),
            "h" | "help" | "?" => Command::Help,
            "q" | "quit" | "exit" => Command::Quit,
            "" => bail!("type 'help' for commands"),
            other => bail!("unknown command '{}', type 'help'", other),
        };
        Ok(command)
    }
}

pub const HELP: &str = "\
commands:
  n | next              next page
  p | prev              previous page
  page <n>              jump to page n
  size <n>              rows per page
  search <text>         filter on the search field (empty clears)
  field <path|none>     field the search matches against
  columns a,b.c         fields shown per row
  fields                list selectable fields
  r | refresh           recount and reload
  edit <id> <title>     (demo) save a draft title
  publish <id>          (demo) publish the draft
  q | quit";

/// The current page as a plain text table.
pub fn render(state: &PageState) -> String {
    let mut out = String::new();
    let pages = state.total_pages();
    let shown_page = if pages == 0 { 0 } else { state.page + 1 };
    out.push_str(&format!(
        "page {}/{}  ({} documents",
        shown_page, pages, state.total
    ));
    if !state.user_query.is_empty() {
        out.push_str(&format!(", matching '{}'", state.user_query));
    }
    out.push_str(")\n");

    if state.results.is_empty() {
        out.push_str("  (no documents)\n");
        return out;
    }

    let mut header = format!("  {:<12} {:<16}", "status", "id");
    for column in &state.columns {
        header.push_str(&format!(" {:<width$}", column.as_str(), width = CELL_WIDTH));
    }
    out.push_str(header.trim_end());
    out.push('\n');

    for row in &state.results {
        let mut line = format!("  {:<12} {:<16}", row.status.as_str(), row.logical_id);
        for column in &state.columns {
            let cell = row.field(column.as_str()).map(cell_text).unwrap_or_default();
            line.push_str(&format!(" {:<width$}", clip(&cell), width = CELL_WIDTH));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn clip(text: &str) -> String {
    if text.chars().count() > CELL_WIDTH {
        let mut clipped: String = text.chars().take(CELL_WIDTH - 1).collect();
        clipped.push('…');
        clipped
    } else {
        text.to_string()
    }
}
