//! Human-readable comparison view

use std::fmt::{self, Write};
use std::time::Duration;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use crate::result::{DispatchBatch, ModelResult, Status};
use crate::summary::{ranking, Aggregate, Summary};

/// Render the full comparison: prompt, metrics table, every answer in
/// ranking order, then the summary
pub fn render(batch: &DispatchBatch, summary: &Summary) -> String
{   let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_report(&mut out, batch, summary);
    out
}

fn write_report(
  out: &mut String
, batch: &DispatchBatch
, summary: &Summary
) -> fmt::Result
{   let ranked = ranking(batch);

    writeln!(out, "Prompt")?;
    writeln!(out, "======")?;
    writeln!(out, "{}", batch.prompt.text())?;
    writeln!(out)?;
    writeln!(out, "{}", metrics_table(&ranked))?;
    writeln!(out)?;

    for result in &ranked
    {   match result.status
        {   Status::Success => {
              writeln!(
                out, "── {} ({}) ──",
                result.model, secs(result.elapsed)
              )?;
              writeln!(out, "{}", result.content.as_deref().unwrap_or(""))?;
            }
          , Status::Failure => {
              writeln!(
                out, "── {} ({}) FAILED ──",
                result.model, secs(result.elapsed)
              )?;
              writeln!(
                out, "{}",
                result.error_detail.as_deref().unwrap_or("")
              )?;
            }
        }
        writeln!(out)?;
    }

    write!(out, "{}", summary_lines(summary))
}

fn metrics_table(ranked: &[&ModelResult]) -> Table
{   let mut table = Table::new();
    table
      .load_preset(UTF8_FULL)
      .set_content_arrangement(ContentArrangement::Dynamic)
      .set_header(vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("Model").add_attribute(Attribute::Bold),
        Cell::new("Status").add_attribute(Attribute::Bold),
        Cell::new("Response Time").add_attribute(Attribute::Bold),
        Cell::new("Tokens (Prompt)").add_attribute(Attribute::Bold),
        Cell::new("Tokens (Completion)").add_attribute(Attribute::Bold),
        Cell::new("Tokens (Total)").add_attribute(Attribute::Bold),
        Cell::new("Finish Reason").add_attribute(Attribute::Bold),
      ]);

    for (rank, r) in ranked.iter().enumerate()
    {   let (status, color) = match r.status
        {   Status::Success => ("ok", Color::Green)
          , Status::Failure => ("failed", Color::Red)
        };
        let count = |f: fn(&crate::request::TokenUsage) -> u32| {
          r.usage
            .as_ref()
            .map(|u| f(u).to_string())
            .unwrap_or_else(|| "-".to_string())
        };
        table.add_row(vec![
          Cell::new(rank + 1),
          Cell::new(&r.model).fg(Color::Cyan),
          Cell::new(status).fg(color),
          Cell::new(secs(r.elapsed)),
          Cell::new(count(|u| u.prompt_tokens)),
          Cell::new(count(|u| u.completion_tokens)),
          Cell::new(count(|u| u.total_tokens)),
          Cell::new(r.finish_reason.as_deref().unwrap_or("-"))
            .fg(Color::Magenta),
        ]);
    }
    table
}

/// The closing summary block
pub fn summary_lines(summary: &Summary) -> String
{   let mut out = String::new();
    let _ = write_summary(&mut out, summary);
    out
}

fn write_summary(out: &mut String, summary: &Summary) -> fmt::Result
{   writeln!(
      out, "{} of {} models answered",
      summary.succeeded, summary.total
    )?;
    match &summary.aggregate
    {   Aggregate::Timing(t) => {
          writeln!(
            out, "Fastest: {} ({})  Slowest: {} ({})  Mean: {}",
            t.fastest_model, secs(t.min),
            t.slowest_model, secs(t.max),
            secs(t.mean)
          )?;
          writeln!(
            out, "Tokens: {} total ({} prompt, {} completion)",
            summary.tokens.total,
            summary.tokens.prompt,
            summary.tokens.completion
          )?;
        }
      , Aggregate::NoSuccessfulResults => {
          writeln!(out, "No successful results")?;
        }
    }
    for f in &summary.failed
    {   writeln!(out, "Failed: {}: {}", f.model, f.detail)?;
    }
    Ok(())
}

fn secs(d: Duration) -> String
{   format!("{:.2}s", d.as_secs_f64())
}
