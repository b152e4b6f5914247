//! Header resolution for ledgers with unreliable column names.
//!
//! The management ledger is exported by tools that do not agree on accents,
//! case, spacing or even encoding. A header such as `Revisão` may arrive as
//! `REVISAO`, `RevisÃ£o` (UTF-8 read as Latin-1) or `Revis\u{FFFD}o` (Latin-1
//! decoded lossily as UTF-8). Each canonical field therefore carries a list of
//! aliases, including the known garbled spellings, and headers are compared
//! after [`alias_key`] folds both sides.
//!
//! Resolution runs once per file on the first header row. Data rows are then
//! read by column index only.

use std::collections::{BTreeMap, HashSet};

use csv::ByteRecord;
use ldr_schemas::{normalize_key, CanonicalField, LedgerRow};
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

// ---------------------------------------------------------------------------
// Alias tables
// ---------------------------------------------------------------------------

/// Alias list per canonical field of the management ledger, most specific
/// first. The first alias that matches any header wins.
///
/// Mojibake that folds back to the intact spelling (`RevisÃ£o`) needs no
/// entry; `Ã§`, `Ãº`, `Ã³`, `Ã\u{AD}` and `Âº` leave a stray `A` behind and are
/// listed explicitly.
pub const LEDGER_ALIASES: &[(CanonicalField, &[&str])] = &[
    (
        CanonicalField::Key,
        &[
            "Nº Vale",
            "N° Vale",
            "No Vale",
            "Número do Vale",
            "Numero Vale",
            "Vale",
            "N\u{FFFD} Vale",
            "N\u{FFFD}mero do Vale",
            "NÂº Vale",
            "NÂ° Vale",
            "NÃºmero do Vale",
        ],
    ),
    (
        CanonicalField::SecondaryKey,
        &[
            "Nº Documento",
            "Número do Documento",
            "Código do Documento",
            "Documento",
            "N\u{FFFD} Documento",
            "N\u{FFFD}mero do Documento",
            "C\u{FFFD}digo do Documento",
            "NÂº Documento",
            "NÃºmero do Documento",
            "CÃ³digo do Documento",
        ],
    ),
    (
        CanonicalField::Revision,
        &["Revisão", "Rev", "Revis\u{FFFD}o"],
    ),
    (
        CanonicalField::AcceptanceDate,
        &[
            "Data de Aceitação",
            "Data Aceite",
            "Dt Aceite",
            "Data de Recebimento",
            "Data Recebimento",
            "Data de Aceita\u{FFFD}\u{FFFD}o",
            "Data de Aceita\u{FFFD}o",
            "Data de AceitaÃ§Ã£o",
        ],
    ),
    (
        CanonicalField::Disposition,
        &[
            "Código de Disposição",
            "Cod Disposição",
            "Disposição",
            "C\u{FFFD}digo de Disposi\u{FFFD}\u{FFFD}o",
            "Disposi\u{FFFD}\u{FFFD}o",
            "Disposi\u{FFFD}o",
            "CÃ³digo de DisposiÃ§Ã£o",
            "DisposiÃ§Ã£o",
        ],
    ),
    (
        CanonicalField::EmissionType,
        &[
            "Tipo de Emissão",
            "Tipo Emissão",
            "Tipo de Emiss\u{FFFD}o",
            "Tipo Emiss\u{FFFD}o",
        ],
    ),
    (CanonicalField::Project, &["Projeto", "Empreendimento"]),
    (CanonicalField::Company, &["Empresa", "Contratada"]),
    (
        CanonicalField::Title,
        &[
            "Título",
            "Descrição",
            "T\u{FFFD}tulo",
            "Descri\u{FFFD}\u{FFFD}o",
            "TÃ\u{AD}tulo",
            "DescriÃ§Ã£o",
        ],
    ),
    (
        CanonicalField::Status,
        &[
            "Status",
            "Situação",
            "Situa\u{FFFD}\u{FFFD}o",
            "Situa\u{FFFD}o",
            "SituaÃ§Ã£o",
        ],
    ),
    (CanonicalField::Phase, &["Fase", "Etapa"]),
    (CanonicalField::Format, &["Formato", "Tamanho"]),
    (
        CanonicalField::Owner,
        &["Responsável", "Emitente", "Respons\u{FFFD}vel"],
    ),
];

/// Columns the loader needs from a primary ledger (LD).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryField {
    Key,
    Revision,
    Date,
}

pub const PRIMARY_ALIASES: &[(PrimaryField, &[&str])] = &[
    (
        PrimaryField::Key,
        &[
            "Nº Vale",
            "N° Vale",
            "Número do Vale",
            "Vale",
            "N\u{FFFD} Vale",
            "N\u{FFFD}mero do Vale",
            "NÂº Vale",
            "NÃºmero do Vale",
        ],
    ),
    (PrimaryField::Revision, &["Revisão", "Rev", "Revis\u{FFFD}o"]),
    (
        PrimaryField::Date,
        &[
            "Data de Aceitação",
            "Data de Emissão",
            "Data GRD",
            "Data",
            "Data de Aceita\u{FFFD}\u{FFFD}o",
            "Data de Emiss\u{FFFD}o",
            "Data de AceitaÃ§Ã£o",
        ],
    ),
];

// ---------------------------------------------------------------------------
// Comparison key
// ---------------------------------------------------------------------------

/// Fold a header (or alias) for comparison: decompose, keep ASCII letters and
/// digits only, uppercase.
///
/// Replacement characters and stray Latin-1 symbols are not alphanumeric and
/// vanish, so `RevisÃ£o` folds to `REVISAO` like the intact spelling.
pub fn alias_key(s: &str) -> String {
    // Decomposition splits `ã` into `a` + U+0303; the mark is not ASCII.
    s.nfd()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// How a field was bound to a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedBy {
    /// Folded alias comparison.
    Alias,
    /// Literal alias string found verbatim among the raw headers.
    Literal,
}

/// Resolve `table` against `headers`. Returns, per field and in table order,
/// the column index and how it was found.
pub fn resolve_columns<F: Copy>(
    headers: &[String],
    table: &[(F, &[&str])],
) -> Vec<(F, Option<(usize, MatchedBy)>)> {
    let folded: Vec<String> = headers.iter().map(|h| alias_key(h)).collect();

    table
        .iter()
        .map(|(field, aliases)| {
            let by_alias = aliases.iter().find_map(|alias| {
                let want = alias_key(alias);
                if want.is_empty() {
                    return None;
                }
                folded.iter().position(|h| *h == want)
            });

            let found = match by_alias {
                Some(i) => Some((i, MatchedBy::Alias)),
                None => aliases
                    .iter()
                    .find_map(|alias| headers.iter().position(|h| h.trim() == *alias))
                    .map(|i| (i, MatchedBy::Literal)),
            };
            (*field, found)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Management-ledger mapping
// ---------------------------------------------------------------------------

/// Canonical field → column index for one management-ledger file.
#[derive(Clone, Debug)]
pub struct ColumnMapping {
    headers: Vec<String>,
    columns: BTreeMap<CanonicalField, (usize, MatchedBy)>,
    key_alias_keys: HashSet<String>,
    any_alias_keys: HashSet<String>,
}

/// Serializable view of a [`ColumnMapping`] for scan metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MappingReport {
    pub header_count: usize,
    /// Canonical field name → actual header text.
    pub resolved: BTreeMap<String, String>,
    /// Fields bound through the literal fallback.
    pub literal_matches: Vec<String>,
    pub absent: Vec<String>,
}

impl ColumnMapping {
    pub fn resolve(headers: Vec<String>) -> Self {
        let columns = resolve_columns(&headers, LEDGER_ALIASES)
            .into_iter()
            .filter_map(|(field, found)| found.map(|f| (field, f)))
            .collect();

        let key_alias_keys = LEDGER_ALIASES
            .iter()
            .filter(|(f, _)| matches!(f, CanonicalField::Key | CanonicalField::SecondaryKey))
            .flat_map(|(_, aliases)| aliases.iter().map(|a| alias_key(a)))
            .filter(|k| !k.is_empty())
            .collect();

        let any_alias_keys = LEDGER_ALIASES
            .iter()
            .flat_map(|(_, aliases)| aliases.iter().map(|a| alias_key(a)))
            .filter(|k| !k.is_empty())
            .collect();

        Self {
            headers,
            columns,
            key_alias_keys,
            any_alias_keys,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn index_of(&self, field: CanonicalField) -> Option<usize> {
        self.columns.get(&field).map(|(i, _)| *i)
    }

    pub fn column_name(&self, field: CanonicalField) -> Option<&str> {
        self.index_of(field)
            .and_then(|i| self.headers.get(i))
            .map(String::as_str)
    }

    /// True when at least one identifying column was found.
    pub fn has_identifier(&self) -> bool {
        self.index_of(CanonicalField::Key).is_some()
            || self.index_of(CanonicalField::SecondaryKey).is_some()
    }

    pub fn absent_fields(&self) -> Vec<CanonicalField> {
        CanonicalField::ALL
            .iter()
            .copied()
            .filter(|f| !self.columns.contains_key(f))
            .collect()
    }

    pub fn report(&self) -> MappingReport {
        MappingReport {
            header_count: self.headers.len(),
            resolved: self
                .columns
                .iter()
                .map(|(f, (i, _))| (f.as_str().to_string(), self.headers[*i].clone()))
                .collect(),
            literal_matches: self
                .columns
                .iter()
                .filter(|(_, (_, by))| *by == MatchedBy::Literal)
                .map(|(f, _)| f.as_str().to_string())
                .collect(),
            absent: self
                .absent_fields()
                .iter()
                .map(|f| f.as_str().to_string())
                .collect(),
        }
    }

    /// Raw identifier for a row: the key column, or the secondary key column
    /// when the key is blank. `None` when both are blank or missing.
    pub fn identifier(&self, record: &ByteRecord) -> Option<String> {
        [CanonicalField::Key, CanonicalField::SecondaryKey]
            .iter()
            .filter_map(|f| self.cell(record, *f))
            .find(|v| !normalize_key(v).is_empty())
    }

    /// A data row that reads like a header row.
    ///
    /// Either the identifier cell folds to a key-column alias, or it folds to
    /// any ledger alias and at least one other cell does too. The second form
    /// catches a repeated header whose columns were reordered.
    ///
    /// Vale numbers carry digits and headers do not, so rows with a digit in
    /// the identifier skip the fold entirely.
    pub fn looks_like_header(&self, identifier: &str, record: &ByteRecord) -> bool {
        if identifier.bytes().any(|b| b.is_ascii_digit()) {
            return false;
        }
        let folded = alias_key(identifier);
        if self.key_alias_keys.contains(&folded) {
            return true;
        }
        if !self.any_alias_keys.contains(&folded) {
            return false;
        }
        let alias_cells = record
            .iter()
            .filter(|raw| !raw.iter().any(u8::is_ascii_digit))
            .filter(|raw| self.any_alias_keys.contains(&alias_key(&String::from_utf8_lossy(raw))))
            .count();
        alias_cells >= 2
    }

    /// Reduce a raw record to the canonical fields. `key` is the identifier
    /// already extracted by [`ColumnMapping::identifier`].
    pub fn reduce(&self, record: &ByteRecord, row_number: u64, key: String) -> LedgerRow {
        let mut row = LedgerRow {
            row_number,
            key,
            ..LedgerRow::default()
        };
        for field in CanonicalField::ALL {
            if matches!(field, CanonicalField::Key | CanonicalField::SecondaryKey) {
                continue;
            }
            if let (Some(value), Some(slot)) = (self.cell(record, field), row.field_mut(field)) {
                *slot = value;
            }
        }
        row
    }

    fn cell(&self, record: &ByteRecord, field: CanonicalField) -> Option<String> {
        let i = self.index_of(field)?;
        record
            .get(i)
            .map(|raw| String::from_utf8_lossy(raw).trim().to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
