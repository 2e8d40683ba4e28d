//! Raw image output: the program bytes verbatim, no header.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::patch::AsmError;
use crate::programs::Program;

/// Writes `<dir>/<name>.bin`, replacing any existing file. Returns the path
/// and the number of bytes written.
pub fn write_program(dir: &Path, program: &Program) -> Result<(PathBuf, usize)> {
    let path = dir.join(program.file_name());
    std::fs::write(&path, &program.bytes)
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), bytes = program.len(), "wrote program");
    Ok((path, program.len()))
}

/// Creates `dir` if needed, then builds and writes one program at a time,
/// calling `on_written` after each file lands. Nothing is built past the
/// first failure; files already written are left in place.
pub fn write_all<I, F>(dir: &Path, programs: I, mut on_written: F) -> Result<Vec<(PathBuf, usize)>>
where
    I: IntoIterator<Item = Result<Program, AsmError>>,
    F: FnMut(&Path, usize),
{
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut written = Vec::new();
    for program in programs {
        let (path, n) = write_program(dir, &program?)?;
        on_written(&path, n);
        written.push((path, n));
    }
    Ok(written)
}
