//! Primary ledger (LD) loader.
//!
//! Plays the upstream validator for the CLI: every row is kept, and rows with
//! no vale number or a ragged field count are marked invalid so the engine
//! skips them.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use ldr_ingest::{resolve_columns, sniff_delimiter, PrimaryField, PRIMARY_ALIASES};
use ldr_schemas::{normalize_key, PrimaryRow, RowValidation};
use tracing::info;

pub fn load_primary_csv(path: &Path) -> Result<Vec<PrimaryRow>> {
    let bytes =
        fs::read(path).with_context(|| format!("read primary ledger {}", path.display()))?;
    let source_file = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(&bytes))
        .flexible(true)
        .from_reader(bytes.as_slice());

    let headers: Vec<String> = rdr
        .byte_headers()
        .with_context(|| format!("read header of {}", path.display()))?
        .iter()
        .map(|h| String::from_utf8_lossy(h).trim().to_string())
        .collect();

    let resolved = resolve_columns(&headers, PRIMARY_ALIASES);
    let column = |field: PrimaryField| {
        resolved
            .iter()
            .find(|(f, _)| *f == field)
            .and_then(|(_, found)| found.map(|(i, _)| i))
    };
    let key_col = column(PrimaryField::Key).ok_or_else(|| {
        anyhow!(
            "primary ledger {} has no vale column (headers: {:?})",
            path.display(),
            headers
        )
    })?;
    let rev_col = column(PrimaryField::Revision);
    let date_col = column(PrimaryField::Date);

    let mut rows = Vec::new();
    let mut invalid = 0usize;
    for (n, record) in rdr.byte_records().enumerate() {
        let record =
            record.with_context(|| format!("read row {} of {}", n + 1, path.display()))?;
        let cell = |i: Option<usize>| {
            i.and_then(|i| record.get(i))
                .map(|v| String::from_utf8_lossy(v).trim().to_string())
                .unwrap_or_default()
        };

        let mut row = PrimaryRow::new(
            cell(Some(key_col)),
            source_file.as_str(),
            cell(rev_col),
            cell(date_col),
        );

        let mut messages = Vec::new();
        if normalize_key(&row.key).is_empty() {
            messages.push("missing vale number".to_string());
        }
        if record.len() != headers.len() {
            messages.push(format!(
                "expected {} fields, found {}",
                headers.len(),
                record.len()
            ));
        }
        if !messages.is_empty() {
            invalid += 1;
        }
        row.validation = Some(RowValidation {
            valid: Some(messages.is_empty()),
            messages,
        });
        rows.push(row);
    }

    info!(
        source = %source_file,
        rows = rows.len(),
        invalid,
        date_column = date_col.is_some(),
        "primary ledger loaded"
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_and_flags_rows() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            "Nº Vale;Revisão;Data de Emissão;Título\n\
             LD-001;A;10/01/2024;Planta\n\
             ;0;11/01/2024;Sem vale\n\
             LD-003;0\n"
        )
        .unwrap();
        f.flush().unwrap();

        let rows = load_primary_csv(f.path()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].key, "LD-001");
        assert_eq!(rows[0].revision, "A");
        assert_eq!(rows[0].date, "10/01/2024");
        assert!(rows[0].is_valid());
        assert!(!rows[1].is_valid());
        assert!(!rows[2].is_valid());
        assert_eq!(rows[2].date, "");
    }

    #[test]
    fn missing_key_column_is_an_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "Título,Revisão\nX,0").unwrap();
        let err = load_primary_csv(f.path()).unwrap_err();
        assert!(err.to_string().contains("no vale column"));
    }
}
