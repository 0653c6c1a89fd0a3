//! Labeling sections and structured table rows.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PillIdError;

/// Value of one table cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    /// The cell held a nested list; one entry per list item.
    List(Vec<String>),
}

/// One table row, `col1..colN` in column order.
pub type TableRow = IndexMap<String, CellValue>;

/// One labeling result's view of a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelingEntry {
    /// Serialized as `null`.
    Absent,
    Text(String),
    Table(Vec<TableRow>),
}

impl LabelingEntry {
    pub fn is_absent(&self) -> bool {
        matches!(self, LabelingEntry::Absent)
    }
}

/// A section across every labeling result returned for a drug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelingSection {
    pub section: SectionKey,
    pub entries: Vec<LabelingEntry>,
}

/// Labeling sections that can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKey {
    AskDoctor,
    AskDoctorOrPharmacist,
    StopUse,
    PregnancyOrBreastfeeding,
    KeepOutOfReach,
    DosageAndAdministration,
    DosageTable,
    IndicationsAndUsage,
    StorageAndHandling,
    Purpose,
}

impl SectionKey {
    /// Every section, in presentation order.
    pub const ALL: [SectionKey; 10] = [
        SectionKey::AskDoctor,
        SectionKey::AskDoctorOrPharmacist,
        SectionKey::StopUse,
        SectionKey::PregnancyOrBreastfeeding,
        SectionKey::KeepOutOfReach,
        SectionKey::DosageAndAdministration,
        SectionKey::DosageTable,
        SectionKey::IndicationsAndUsage,
        SectionKey::StorageAndHandling,
        SectionKey::Purpose,
    ];

    /// Kebab-case name used on the command line and in JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKey::AskDoctor => "ask-doctor",
            SectionKey::AskDoctorOrPharmacist => "ask-doctor-or-pharmacist",
            SectionKey::StopUse => "stop-use",
            SectionKey::PregnancyOrBreastfeeding => "pregnancy-or-breastfeeding",
            SectionKey::KeepOutOfReach => "keep-out-of-reach",
            SectionKey::DosageAndAdministration => "dosage-and-administration",
            SectionKey::DosageTable => "dosage-table",
            SectionKey::IndicationsAndUsage => "indications-and-usage",
            SectionKey::StorageAndHandling => "storage-and-handling",
            SectionKey::Purpose => "purpose",
        }
    }

    /// Field name in the labeling data source.
    pub fn field(&self) -> &'static str {
        match self {
            SectionKey::AskDoctor => "ask_doctor",
            SectionKey::AskDoctorOrPharmacist => "ask_doctor_or_pharmacist",
            SectionKey::StopUse => "stop_use",
            SectionKey::PregnancyOrBreastfeeding => "pregnancy_or_breast_feeding",
            SectionKey::KeepOutOfReach => "keep_out_of_reach_of_children",
            SectionKey::DosageAndAdministration => "dosage_and_administration",
            SectionKey::DosageTable => "dosage_and_administration_table",
            SectionKey::IndicationsAndUsage => "indications_and_usage",
            SectionKey::StorageAndHandling => "storage_and_handling",
            SectionKey::Purpose => "purpose",
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKey {
    type Err = PillIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        SectionKey::ALL
            .into_iter()
            .find(|key| key.as_str() == wanted)
            .ok_or_else(|| PillIdError::Config(format!("unknown labeling section: {}", s)))
    }
}
