//! Protocol response documents written to stdout.

use std::io::Write;

use serde::Serialize;

use crate::domain::error::OutputError;
use crate::domain::Version;

#[derive(Debug, Serialize)]
struct VersionResponse<'a> {
    version: &'a Version,
}

/// Write `value` as a single JSON document followed by a newline.
pub fn write_json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> Result<(), OutputError> {
    let mut buf = serde_json::to_vec(value).map_err(OutputError::Encode)?;
    buf.push(b'\n');
    out.write_all(&buf)?;
    out.flush()?;
    Ok(())
}

/// Write `{"version": {"ref": <version>}}`.
pub fn emit_version(out: &mut dyn Write, version: &Version) -> Result<(), OutputError> {
    write_json(out, &VersionResponse { version })
}
