//! JSON persistence of dispatch batches

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use log::{debug, info, warn};
use crate::error::Error;
use crate::result::DispatchBatch;

pub const FILE_PREFIX: &str = "comparison_results_";

/// File stem for a batch, from its creation time
pub fn file_stem(batch: &DispatchBatch) -> String
{   format!(
      "{}{}",
      FILE_PREFIX,
      batch.created_at.format("%Y%m%d_%H%M%S")
    )
}

/// Write `batch` as pretty JSON under `dir` and return the file path
///
/// Never overwrites: a second batch created in the same second gets a
/// `_1`, `_2`, ... suffix. On error the batch itself is untouched.
pub fn persist(batch: &DispatchBatch, dir: &Path)
  -> Result<PathBuf, Error>
{   let json = serde_json::to_string_pretty(batch)?;
    fs::create_dir_all(dir).map_err(|e| {
      Error::Persistence(format!(
        "cannot create {}: {}", dir.display(), e
      ))
    })?;

    let stem = file_stem(batch);
    let mut attempt = 0usize;
    loop
    {   let name = match attempt
        {   0 => format!("{}.json", stem)
          , n => format!("{}_{}.json", stem, n)
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path)
        {   Ok(file) => {
              fill_or_discard(file, &path, json.as_bytes())?;
              info!("Results saved to {}", path.display());
              return Ok(path);
            }
          , Err(e) if e.kind() == ErrorKind::AlreadyExists => {
              debug!("{} exists, trying next suffix", path.display());
              attempt += 1;
            }
          , Err(e) => {
              return Err(Error::Persistence(format!(
                "cannot create {}: {}", path.display(), e
              )));
            }
        }
    }
}

/// Write `bytes` to the freshly created `path`, removing it again if
/// the write fails so no truncated batch is left behind
fn fill_or_discard<W: Write>(
  mut out: W
, path: &Path
, bytes: &[u8]
) -> Result<(), Error>
{   let written = out.write_all(bytes).and_then(|()| out.flush());
    drop(out);
    match written
    {   Ok(()) => Ok(())
      , Err(e) => {
          if let Err(rm) = fs::remove_file(path)
          {   warn!("cannot remove partial {}: {}", path.display(), rm);
          }
          Err(Error::Persistence(format!(
            "cannot write {}: {}", path.display(), e
          )))
        }
    }
}

/// Read a persisted batch back
pub fn load(path: &Path) -> Result<DispatchBatch, Error>
{   let raw = fs::read_to_string(path).map_err(|e| {
      Error::Persistence(format!(
        "cannot read {}: {}", path.display(), e
      ))
    })?;
    Ok(serde_json::from_str(&raw)?)
}
