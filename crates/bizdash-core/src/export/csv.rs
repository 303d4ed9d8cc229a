//! CSV rendering. The title is not part of the file; the header row is.

use super::{EXPORT_HEADER, ExportTable};
use crate::DashError;

pub(super) fn render(table: &ExportTable) -> Result<Vec<u8>, DashError> {
    let mut writer = ::csv::Writer::from_writer(Vec::new());
    writer
        .write_record(EXPORT_HEADER)
        .map_err(|e| DashError::Export(e.to_string()))?;
    for row in &table.rows {
        writer
            .write_record(row)
            .map_err(|e| DashError::Export(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| DashError::Export(e.to_string()))
}
