//! Model catalog report, sorted by price

use std::cmp::Ordering;
use std::fmt::{self, Write};
use std::path::Path;
use log::info;
use crate::error::Error;
use crate::request::ModelDescriptor;

/// Render the catalog, priciest (prompt + completion) first
pub fn render_catalog(
  models: &[ModelDescriptor]
, source: &str
) -> String
{   let mut out = String::new();
    let _ = write_catalog_text(&mut out, models, source);
    out
}

fn write_catalog_text(
  out: &mut String
, models: &[ModelDescriptor]
, source: &str
) -> fmt::Result
{   let mut sorted: Vec<&ModelDescriptor> = models.iter().collect();
    sorted.sort_by(|a, b| {
      b.pricing.total()
        .partial_cmp(&a.pricing.total())
        .unwrap_or(Ordering::Equal)
    });

    writeln!(out, "Available Models:")?;
    writeln!(out, "Sorted by Price (priciest to cheapest):")?;
    writeln!(out, "==========================")?;
    writeln!(out)?;

    for model in sorted
    {   writeln!(out, "Model ID: {}", model.id)?;
        writeln!(
          out, "Total Price (prompt + completion): {:.10}",
          model.pricing.total()
        )?;
        if let Some(name) = &model.name
        {   writeln!(out, "Name: {}", name)?;
        }
        if let Some(len) = model.context_length
        {   writeln!(out, "Context Length: {}", len)?;
        }
        writeln!(out, "Pricing:")?;
        if let Some(p) = &model.pricing.prompt
        {   writeln!(out, "  - prompt: {}", p)?;
        }
        if let Some(p) = &model.pricing.completion
        {   writeln!(out, "  - completion: {}", p)?;
        }
        for (key, value) in &model.pricing.other
        {   writeln!(out, "  - {}: {}", key, scalar(value))?;
        }
        for (key, value) in &model.extra
        {   write_field(out, key, value)?;
        }
        writeln!(out)?;
        writeln!(out, "{}", "-".repeat(50))?;
        writeln!(out)?;
    }

    writeln!(out, "Total models available: {}", models.len())?;
    writeln!(out, "Data retrieved from: {}", source)?;
    writeln!(out, "Models are sorted by total price (priciest to cheapest)")
}

fn write_field(
  out: &mut String
, key: &str
, value: &serde_json::Value
) -> fmt::Result
{   match value
    {   serde_json::Value::Object(map) => {
          writeln!(out, "{}:", title(key))?;
          for (k, v) in map
          {   writeln!(out, "  - {}: {}", k, scalar(v))?;
          }
        }
      , serde_json::Value::Array(items) => {
          writeln!(out, "{}:", title(key))?;
          for item in items
          {   match item
              {   serde_json::Value::Object(map) => {
                    for (k, v) in map
                    {   writeln!(out, "  - {}: {}", k, scalar(v))?;
                    }
                  }
                , other => writeln!(out, "  - {}", scalar(other))?
              }
          }
        }
      , other => writeln!(out, "{}: {}", title(key), scalar(other))?
    }
    Ok(())
}

/// Strings without their JSON quotes, everything else as JSON
fn scalar(value: &serde_json::Value) -> String
{   match value
    {   serde_json::Value::String(s) => s.clone()
      , serde_json::Value::Null => "None".to_string()
      , other => other.to_string()
    }
}

/// "context_length" -> "Context_Length"
fn title(key: &str) -> String
{   let mut out = String::with_capacity(key.len());
    let mut start = true;
    for c in key.chars()
    {   if c.is_alphabetic()
        {   if start
            {   out.extend(c.to_uppercase());
            } else
            {   out.extend(c.to_lowercase());
            }
            start = false;
        } else
        {   out.push(c);
            start = true;
        }
    }
    out
}

pub fn write_catalog(
  path: &Path
, models: &[ModelDescriptor]
, source: &str
) -> Result<(), Error>
{   std::fs::write(path, render_catalog(models, source))
      .map_err(|e| {
        Error::Persistence(format!(
          "cannot write {}: {}", path.display(), e
        ))
      })?;
    info!("Saved {} models to {}", models.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests
{   use super::*;

    fn model(raw: serde_json::Value) -> ModelDescriptor
    {   serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_sorted_priciest_first()
    {   let models = vec![
          model(serde_json::json!({
            "id": "cheap/one",
            "pricing": {"prompt": "0.000001", "completion": "0.000002"}
          })),
          model(serde_json::json!({
            "id": "dear/one",
            "pricing": {"prompt": "0.00001", "completion": "0.00003"}
          })),
          model(serde_json::json!({"id": "free/one"})),
        ];
        let text = render_catalog(&models, "test");
        let dear = text.find("Model ID: dear/one").unwrap();
        let cheap = text.find("Model ID: cheap/one").unwrap();
        let free = text.find("Model ID: free/one").unwrap();
        assert!(dear < cheap && cheap < free);
        assert!(text.contains(
          "Total Price (prompt + completion): 0.0000400000"
        ));
        assert!(text.contains("Total models available: 3"));
    }

    #[test]
    fn test_nested_fields_are_listed()
    {   let models = vec![model(serde_json::json!({
          "id": "a/b",
          "architecture": {"modality": "text->text"},
          "supported_parameters": ["tools", "temperature"],
          "created": 1700000000
        }))];
        let text = render_catalog(&models, "test");
        assert!(text.contains("Architecture:\n  - modality: text->text"));
        assert!(text.contains("Supported_Parameters:\n  - tools"));
        assert!(text.contains("Created: 1700000000"));
    }

    #[test]
    fn test_title_case()
    {   assert_eq!(title("context_length"), "Context_Length");
        assert_eq!(title("top_provider"), "Top_Provider");
    }

    #[test]
    fn test_write_catalog_to_file()
    {   let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.txt");
        write_catalog(&path, &[], "test").unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Total models available: 0"));
    }
}
