//! Search constraints, one variant per provider.
//!
//! Every variant carries the shared [`SearchFilters`] year range plus the facets
//! its provider understands. Provider sections of the input file deserialize
//! straight into these types; years are filled in from the top level when the
//! section does not override them.

use serde::{Deserialize, Serialize};

/// Year range shared by every provider.
///
/// `year_from <= year_to` is not enforced here; an inverted range is passed to
/// the provider as given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub year_from: Option<i32>,
    #[serde(default)]
    pub year_to: Option<i32>,
}

impl SearchFilters {
    pub fn new(year_from: Option<i32>, year_to: Option<i32>) -> Self {
        Self { year_from, year_to }
    }

    /// Fill unset bounds from `fallback`.
    pub fn or(self, fallback: SearchFilters) -> Self {
        Self {
            year_from: self.year_from.or(fallback.year_from),
            year_to: self.year_to.or(fallback.year_to),
        }
    }

    pub fn is_inverted(&self) -> bool {
        matches!((self.year_from, self.year_to), (Some(from), Some(to)) if from > to)
    }

    /// "2020 - 2025", with "no limit" for open bounds
    pub fn describe(&self) -> String {
        let bound = |y: Option<i32>| y.map_or_else(|| "no limit".to_string(), |y| y.to_string());
        format!("{} - {}", bound(self.year_from), bound(self.year_to))
    }
}

/// Common surface of the provider filter variants.
pub trait FilterSet: Serialize {
    fn years(&self) -> &SearchFilters;

    fn years_mut(&mut self) -> &mut SearchFilters;

    /// Copy with `overrides` taking precedence over the configured years.
    fn with_year_overrides(&self, overrides: SearchFilters) -> Self
    where
        Self: Clone,
    {
        let mut filters = self.clone();
        let years = overrides.or(*filters.years());
        *filters.years_mut() = years;
        filters
    }

    /// Label/value pairs echoed at the start of a run.
    fn describe(&self) -> Vec<(&'static str, String)>;
}

fn join_or(values: &[String], all: &str) -> String {
    if values.is_empty() {
        all.to_string()
    } else {
        values.join(", ")
    }
}

// ============================================================================
// Scopus
// ============================================================================

/// Known Scopus document type codes
pub const DOC_TYPES: &[(&str, &str)] = &[
    ("ar", "Article"),
    ("re", "Review"),
    ("cp", "Conference Paper"),
    ("ch", "Book Chapter"),
    ("bk", "Book"),
    ("ed", "Editorial"),
    ("le", "Letter"),
    ("no", "Note"),
    ("sh", "Short Survey"),
];

/// Known Scopus subject area codes
pub const SUBJECT_AREAS: &[(&str, &str)] = &[
    ("COMP", "Computer Science"),
    ("MEDI", "Medicine"),
    ("ENGI", "Engineering"),
    ("SOCI", "Social Sciences"),
    ("BUSI", "Business"),
    ("MATH", "Mathematics"),
    ("PHYS", "Physics"),
    ("CHEM", "Chemistry"),
    ("BIOC", "Biochemistry"),
    ("ARTS", "Arts and Humanities"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopusFilters {
    #[serde(flatten)]
    pub years: SearchFilters,
    /// Document type codes (`ar`, `re`, `cp`, ...)
    #[serde(default)]
    pub doc_types: Vec<String>,
    /// Subject area codes (`COMP`, `ENGI`, ...)
    #[serde(default)]
    pub subject_areas: Vec<String>,
}

impl ScopusFilters {
    /// Configured codes that are not in the known tables.
    pub fn unknown_codes(&self) -> Vec<&str> {
        let known = |table: &[(&str, &str)], code: &str| table.iter().any(|(c, _)| *c == code);
        self.doc_types
            .iter()
            .filter(|c| !known(DOC_TYPES, c))
            .chain(self.subject_areas.iter().filter(|c| !known(SUBJECT_AREAS, c)))
            .map(String::as_str)
            .collect()
    }
}

impl FilterSet for ScopusFilters {
    fn years(&self) -> &SearchFilters {
        &self.years
    }

    fn years_mut(&mut self) -> &mut SearchFilters {
        &mut self.years
    }

    fn describe(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Years", self.years.describe()),
            ("Document types", join_or(&self.doc_types, "All")),
            ("Subject areas", join_or(&self.subject_areas, "All")),
        ]
    }
}

// ============================================================================
// IEEE Xplore
// ============================================================================

/// IEEE Xplore content types (case sensitive on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IeeeContentType {
    Books,
    Conferences,
    Courses,
    #[serde(rename = "Early Access")]
    EarlyAccess,
    Journals,
    Magazines,
    Standards,
}

impl IeeeContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IeeeContentType::Books => "Books",
            IeeeContentType::Conferences => "Conferences",
            IeeeContentType::Courses => "Courses",
            IeeeContentType::EarlyAccess => "Early Access",
            IeeeContentType::Journals => "Journals",
            IeeeContentType::Magazines => "Magazines",
            IeeeContentType::Standards => "Standards",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IeeeFilters {
    #[serde(flatten)]
    pub years: SearchFilters,
    #[serde(default)]
    pub content_types: Vec<IeeeContentType>,
}

impl IeeeFilters {
    /// The API accepts a single content type; only the first is sent.
    pub fn active_content_type(&self) -> Option<IeeeContentType> {
        self.content_types.first().copied()
    }
}

impl FilterSet for IeeeFilters {
    fn years(&self) -> &SearchFilters {
        &self.years
    }

    fn years_mut(&mut self) -> &mut SearchFilters {
        &mut self.years
    }

    fn describe(&self) -> Vec<(&'static str, String)> {
        let content = match self.content_types.as_slice() {
            [] => "All".to_string(),
            [only] => only.as_str().to_string(),
            [first, ..] => format!(
                "{} (only the first of {} is sent)",
                first.as_str(),
                self.content_types.len()
            ),
        };
        vec![("Years", self.years.describe()), ("Content type", content)]
    }
}

// ============================================================================
// Web of Science
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WosDatabase {
    /// Web of Science Core Collection
    #[default]
    Wos,
    /// Biological Abstracts
    Bioabs,
    /// BIOSIS Citation Index
    Bci,
    /// BIOSIS Previews
    Biosis,
    /// Current Contents Connect
    Ccc,
    /// Derwent Innovations Index
    Diidw,
    /// Data Citation Index
    Drci,
    Medline,
    /// Zoological Record
    Zoorec,
    /// Preprint Citation Index
    Pprn,
    /// All databases
    Wok,
}

impl WosDatabase {
    pub fn as_str(&self) -> &'static str {
        match self {
            WosDatabase::Wos => "WOS",
            WosDatabase::Bioabs => "BIOABS",
            WosDatabase::Bci => "BCI",
            WosDatabase::Biosis => "BIOSIS",
            WosDatabase::Ccc => "CCC",
            WosDatabase::Diidw => "DIIDW",
            WosDatabase::Drci => "DRCI",
            WosDatabase::Medline => "MEDLINE",
            WosDatabase::Zoorec => "ZOOREC",
            WosDatabase::Pprn => "PPRN",
            WosDatabase::Wok => "WOK",
        }
    }
}

/// Core Collection editions. Accepts both `SCI` and `WOS+SCI` in input files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WosEdition {
    #[serde(rename = "SCI", alias = "WOS+SCI")]
    Sci,
    #[serde(rename = "SSCI", alias = "WOS+SSCI")]
    Ssci,
    #[serde(rename = "AHCI", alias = "WOS+AHCI")]
    Ahci,
    #[serde(rename = "ESCI", alias = "WOS+ESCI")]
    Esci,
    #[serde(rename = "CPCI-S", alias = "WOS+CPCI-S")]
    CpciS,
    #[serde(rename = "CPCI-SSH", alias = "WOS+CPCI-SSH")]
    CpciSsh,
}

impl WosEdition {
    pub fn code(&self) -> &'static str {
        match self {
            WosEdition::Sci => "SCI",
            WosEdition::Ssci => "SSCI",
            WosEdition::Ahci => "AHCI",
            WosEdition::Esci => "ESCI",
            WosEdition::CpciS => "CPCI-S",
            WosEdition::CpciSsh => "CPCI-SSH",
        }
    }

    /// Wire form, `WOS+SCI`
    pub fn as_param(&self) -> String {
        format!("WOS+{}", self.code())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WosSortField {
    /// Load date, descending
    #[default]
    #[serde(rename = "LD+D")]
    LoadDate,
    /// Publication year, descending
    #[serde(rename = "PY+D")]
    PublicationYear,
    /// Times cited, descending
    #[serde(rename = "TC+D")]
    TimesCited,
    /// Relevance, descending
    #[serde(rename = "RS+D")]
    Relevance,
}

impl WosSortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            WosSortField::LoadDate => "LD+D",
            WosSortField::PublicationYear => "PY+D",
            WosSortField::TimesCited => "TC+D",
            WosSortField::Relevance => "RS+D",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WosFilters {
    #[serde(flatten)]
    pub years: SearchFilters,
    #[serde(default)]
    pub database: WosDatabase,
    #[serde(default)]
    pub edition: Option<WosEdition>,
    /// Document type names (`Article`, `Review`, ...)
    #[serde(default)]
    pub document_types: Vec<String>,
    #[serde(default)]
    pub sort_field: WosSortField,
}

impl FilterSet for WosFilters {
    fn years(&self) -> &SearchFilters {
        &self.years
    }

    fn years_mut(&mut self) -> &mut SearchFilters {
        &mut self.years
    }

    fn describe(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Years", self.years.describe()),
            ("Database", self.database.as_str().to_string()),
            (
                "Edition",
                self.edition
                    .map_or_else(|| "All".to_string(), |e| e.as_param()),
            ),
            ("Document types", join_or(&self.document_types, "All")),
            ("Sort", self.sort_field.as_str().to_string()),
        ]
    }
}
