use serde::{Deserialize, Serialize};

/// The fixed set of management-ledger columns the engine keeps.
///
/// Every other column is dropped at read time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Key,
    /// Used as the identifier when `Key` is blank on a row.
    SecondaryKey,
    Revision,
    AcceptanceDate,
    Disposition,
    EmissionType,
    Project,
    Company,
    Title,
    Status,
    Phase,
    Format,
    Owner,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 13] = [
        CanonicalField::Key,
        CanonicalField::SecondaryKey,
        CanonicalField::Revision,
        CanonicalField::AcceptanceDate,
        CanonicalField::Disposition,
        CanonicalField::EmissionType,
        CanonicalField::Project,
        CanonicalField::Company,
        CanonicalField::Title,
        CanonicalField::Status,
        CanonicalField::Phase,
        CanonicalField::Format,
        CanonicalField::Owner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Key => "key",
            CanonicalField::SecondaryKey => "secondary_key",
            CanonicalField::Revision => "revision",
            CanonicalField::AcceptanceDate => "acceptance_date",
            CanonicalField::Disposition => "disposition",
            CanonicalField::EmissionType => "emission_type",
            CanonicalField::Project => "project",
            CanonicalField::Company => "company",
            CanonicalField::Title => "title",
            CanonicalField::Status => "status",
            CanonicalField::Phase => "phase",
            CanonicalField::Format => "format",
            CanonicalField::Owner => "owner",
        }
    }
}

/// Lifecycle stage of one revision inside a key group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EmissionStatus {
    /// Baseline record (revision `-1`).
    #[serde(rename = "FICHA")]
    Initial,
    #[serde(rename = "PRIMEMISSAO")]
    FirstIssue,
    #[serde(rename = "REVISAO")]
    Revision,
}

impl EmissionStatus {
    /// Code used by the management ledger's own reports.
    pub fn code(&self) -> &'static str {
        match self {
            EmissionStatus::Initial => "FICHA",
            EmissionStatus::FirstIssue => "PRIMEMISSAO",
            EmissionStatus::Revision => "REVISAO",
        }
    }
}

/// One management-ledger row reduced to the canonical fields.
///
/// Absent columns read as empty strings. `emission` and `certified` are
/// derived once the whole key group has been seen.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    /// 1-based data-row number in the source file (header excluded).
    pub row_number: u64,
    /// Identifier exactly as read (primary or fallback column).
    pub key: String,
    pub revision: String,
    pub acceptance_date: String,
    pub disposition: String,
    pub emission_type: String,
    pub project: String,
    pub company: String,
    pub title: String,
    pub status: String,
    pub phase: String,
    pub format: String,
    pub owner: String,

    pub emission: Option<EmissionStatus>,
    pub certified: bool,
}

impl LedgerRow {
    /// Mutable slot for a canonical field. `SecondaryKey` has no slot of its
    /// own: it feeds `key` when the primary identifier is blank.
    pub fn field_mut(&mut self, field: CanonicalField) -> Option<&mut String> {
        match field {
            CanonicalField::Key => Some(&mut self.key),
            CanonicalField::SecondaryKey => None,
            CanonicalField::Revision => Some(&mut self.revision),
            CanonicalField::AcceptanceDate => Some(&mut self.acceptance_date),
            CanonicalField::Disposition => Some(&mut self.disposition),
            CanonicalField::EmissionType => Some(&mut self.emission_type),
            CanonicalField::Project => Some(&mut self.project),
            CanonicalField::Company => Some(&mut self.company),
            CanonicalField::Title => Some(&mut self.title),
            CanonicalField::Status => Some(&mut self.status),
            CanonicalField::Phase => Some(&mut self.phase),
            CanonicalField::Format => Some(&mut self.format),
            CanonicalField::Owner => Some(&mut self.owner),
        }
    }
}

/// Result of the upstream validator for one primary row.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowValidation {
    /// `None` when the validator produced nothing usable; treated as valid.
    pub valid: Option<bool>,
    #[serde(default)]
    pub messages: Vec<String>,
}

/// One row of a primary ledger (LD), as handed over by the loader.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryRow {
    pub key: String,
    pub source_file: String,
    pub revision: String,
    /// Date the LD claims for this document; compared against the ledger's
    /// acceptance date.
    pub date: String,
    #[serde(default)]
    pub validation: Option<RowValidation>,
}

impl PrimaryRow {
    pub fn new(
        key: impl Into<String>,
        source_file: impl Into<String>,
        revision: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            source_file: source_file.into(),
            revision: revision.into(),
            date: date.into(),
            validation: None,
        }
    }

    /// Missing or malformed validator output counts as valid.
    pub fn is_valid(&self) -> bool {
        self.validation
            .as_ref()
            .and_then(|v| v.valid)
            .unwrap_or(true)
    }
}
