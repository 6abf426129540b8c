use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AcxError;

#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub struct AccountCode {
    pub id: i64,
    pub account_code: String,
    pub level: i64,
    pub description: String,
    pub uom: String,
    pub uom2: String,
    pub metric_uom: String,
    pub metric_uom2: String,
    pub notes: String,
    pub personal_notes: Option<String>,
    pub flags: CostFlags,
}

/// A record as it arrives from an import, before it has a row id.
/// `level` is derived from the code when the row is stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewAccountCode {
    pub account_code: String,
    pub description: String,
    pub uom: String,
    pub uom2: String,
    pub metric_uom: String,
    pub metric_uom2: String,
    pub notes: String,
    pub personal_notes: Option<String>,
    pub flags: CostFlags,
}

// ---------------------------------------------------------------------------
// Cost flags
// ---------------------------------------------------------------------------

/// One of the fourteen boolean attributes packed into `account_codes.flags`.
///
/// The bit values are persisted in existing databases. Never renumber them;
/// new flags take the next free bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CostFlag {
    Labor,
    ConstEquipment,
    FomRentedEquipment,
    Supplies,
    Materials,
    Subcontract,
    FixedFeesAndServices,
    ContingencyAllowances,
    GeneralAndAdministrative,
    UomToSupUom,
    UomToSupUom2,
    Uom2ToSupUom2,
    AutoQuantityUom,
    AutoQuantityUom2,
}

pub const ALL_FLAGS: &[CostFlag] = &[
    CostFlag::Labor,
    CostFlag::ConstEquipment,
    CostFlag::FomRentedEquipment,
    CostFlag::Supplies,
    CostFlag::Materials,
    CostFlag::Subcontract,
    CostFlag::FixedFeesAndServices,
    CostFlag::ContingencyAllowances,
    CostFlag::GeneralAndAdministrative,
    CostFlag::UomToSupUom,
    CostFlag::UomToSupUom2,
    CostFlag::Uom2ToSupUom2,
    CostFlag::AutoQuantityUom,
    CostFlag::AutoQuantityUom2,
];

/// The flags a search cost filter can select.
pub const COST_CATEGORIES: &[CostFlag] = &[
    CostFlag::Labor,
    CostFlag::ConstEquipment,
    CostFlag::FomRentedEquipment,
    CostFlag::Supplies,
    CostFlag::Materials,
    CostFlag::Subcontract,
    CostFlag::FixedFeesAndServices,
    CostFlag::ContingencyAllowances,
    CostFlag::GeneralAndAdministrative,
];

impl CostFlag {
    pub fn bit(&self) -> u32 {
        match self {
            Self::Labor => 1,
            Self::ConstEquipment => 1 << 1,
            Self::FomRentedEquipment => 1 << 2,
            Self::Supplies => 1 << 3,
            Self::Materials => 1 << 4,
            Self::Subcontract => 1 << 5,
            Self::FixedFeesAndServices => 1 << 6,
            Self::ContingencyAllowances => 1 << 7,
            Self::GeneralAndAdministrative => 1 << 8,
            Self::UomToSupUom => 1 << 9,
            Self::UomToSupUom2 => 1 << 10,
            Self::Uom2ToSupUom2 => 1 << 11,
            Self::AutoQuantityUom => 1 << 12,
            Self::AutoQuantityUom2 => 1 << 13,
        }
    }

    /// Column header in the account code CSV.
    pub fn csv_column(&self) -> &'static str {
        match self {
            Self::Labor => "Labor",
            Self::ConstEquipment => "Const. EQP",
            Self::FomRentedEquipment => "FOM Rented EQP",
            Self::Supplies => "Supplies",
            Self::Materials => "Materials",
            Self::Subcontract => "Subcontract",
            Self::FixedFeesAndServices => "Fixed Fees and Services",
            Self::ContingencyAllowances => "Contingency (Allowances)",
            Self::GeneralAndAdministrative => "G & A",
            Self::UomToSupUom => "Primary to Sup Primary",
            Self::UomToSupUom2 => "Primary to Sup 2nd",
            Self::Uom2ToSupUom2 => "2nd to Sup 2nd",
            Self::AutoQuantityUom => "Auto Quantity Primary",
            Self::AutoQuantityUom2 => "Auto Quantity 2nd",
        }
    }

    /// CSV value that marks the flag as set. Cost columns use `Yes`,
    /// the conversion toggles use `TRUE`.
    pub fn csv_true_value(&self) -> &'static str {
        if self.is_cost_category() {
            "Yes"
        } else {
            "TRUE"
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Labor => "Labor",
            Self::ConstEquipment => "Equipment",
            Self::FomRentedEquipment => "FOM Equipment",
            Self::Supplies => "Supplies",
            Self::Materials => "Materials",
            Self::Subcontract => "Subcontract",
            Self::FixedFeesAndServices => "Fixed Fees & Services",
            Self::ContingencyAllowances => "Contingency & Allowances",
            Self::GeneralAndAdministrative => "G&A",
            Self::UomToSupUom => "Primary to Sup Primary",
            Self::UomToSupUom2 => "Primary to Sup 2nd",
            Self::Uom2ToSupUom2 => "2nd to Sup 2nd",
            Self::AutoQuantityUom => "Auto Quantity Primary",
            Self::AutoQuantityUom2 => "Auto Quantity 2nd",
        }
    }

    /// Short name accepted on the command line.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Labor => "labor",
            Self::ConstEquipment => "equipment",
            Self::FomRentedEquipment => "fom-equipment",
            Self::Supplies => "supplies",
            Self::Materials => "materials",
            Self::Subcontract => "subcontract",
            Self::FixedFeesAndServices => "fixed-fees",
            Self::ContingencyAllowances => "contingency",
            Self::GeneralAndAdministrative => "ga",
            Self::UomToSupUom => "uom-to-sup-uom",
            Self::UomToSupUom2 => "uom-to-sup-uom2",
            Self::Uom2ToSupUom2 => "uom2-to-sup-uom2",
            Self::AutoQuantityUom => "auto-quantity-uom",
            Self::AutoQuantityUom2 => "auto-quantity-uom2",
        }
    }

    pub fn is_cost_category(&self) -> bool {
        self.bit() <= CostFlag::GeneralAndAdministrative.bit()
    }
}

impl FromStr for CostFlag {
    type Err = AcxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ALL_FLAGS
            .iter()
            .find(|f| f.key() == wanted)
            .copied()
            .ok_or_else(|| AcxError::Other(format!("Unknown cost category: {s}")))
    }
}

/// Fixed-width bit-set over [`CostFlag`], stored as a single integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CostFlags(u32);

impl CostFlags {
    pub const EMPTY: CostFlags = CostFlags(0);

    /// Builds a set from a stored integer, dropping bits no flag owns.
    pub fn from_bits(bits: u32) -> Self {
        let known = ALL_FLAGS.iter().fold(0, |acc, f| acc | f.bit());
        Self(bits & known)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, flag: CostFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    pub fn insert(&mut self, flag: CostFlag) {
        self.0 |= flag.bit();
    }

    pub fn remove(&mut self, flag: CostFlag) {
        self.0 &= !flag.bit();
    }

    pub fn set(&mut self, flag: CostFlag, on: bool) {
        if on {
            self.insert(flag);
        } else {
            self.remove(flag);
        }
    }

    pub fn with(mut self, flag: CostFlag) -> Self {
        self.insert(flag);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = CostFlag> + '_ {
        ALL_FLAGS.iter().copied().filter(move |f| self.contains(*f))
    }
}

impl FromIterator<CostFlag> for CostFlags {
    fn from_iter<I: IntoIterator<Item = CostFlag>>(iter: I) -> Self {
        iter.into_iter().fold(CostFlags::EMPTY, CostFlags::with)
    }
}

impl std::ops::BitOr for CostFlag {
    type Output = CostFlags;

    fn bitor(self, rhs: Self) -> CostFlags {
        CostFlags::EMPTY.with(self).with(rhs)
    }
}

impl std::ops::BitOr<CostFlag> for CostFlags {
    type Output = CostFlags;

    fn bitor(self, rhs: CostFlag) -> CostFlags {
        self.with(rhs)
    }
}

impl From<CostFlag> for CostFlags {
    fn from(flag: CostFlag) -> Self {
        CostFlags::EMPTY.with(flag)
    }
}

// ---------------------------------------------------------------------------
// Searchable text fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Description,
    Notes,
    PersonalNotes,
}

pub const ALL_SEARCH_FIELDS: &[SearchField] = &[
    SearchField::Description,
    SearchField::Notes,
    SearchField::PersonalNotes,
];

impl SearchField {
    /// Column name in both `account_codes` and the FTS5 index.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Notes => "notes",
            Self::PersonalNotes => "personal_notes",
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Description => "Description",
            Self::Notes => "District Notes",
            Self::PersonalNotes => "Personal Notes",
        };
        f.write_str(label)
    }
}

impl FromStr for SearchField {
    type Err = AcxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "description" | "desc" | "d" => Ok(Self::Description),
            "notes" | "district" | "n" => Ok(Self::Notes),
            "personal" | "personal_notes" | "personal-notes" | "p" => Ok(Self::PersonalNotes),
            other => Err(AcxError::Other(format!("Unknown search field: {other}"))),
        }
    }
}
