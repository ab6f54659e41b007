//! Category registry: the closed set of prasad categories, the distribution
//! points they may be handed out at, and the fixed metadata of each category.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Classification of a kitchen plan. Determines accounting, tracking and the
/// distribution point the prasad is handed out at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrasadCategory {
    Annadan,
    CounterPaid,
    SevaPrasadPaid,
    SevaPrasadFree,
}

impl PrasadCategory {
    pub const ALL: [PrasadCategory; 4] = [
        PrasadCategory::Annadan,
        PrasadCategory::CounterPaid,
        PrasadCategory::SevaPrasadPaid,
        PrasadCategory::SevaPrasadFree,
    ];

    pub fn metadata(self) -> CategoryMetadata {
        metadata_of(self)
    }

    pub fn tracking(self) -> TrackingMethod {
        metadata_of(self).tracking
    }

    pub fn is_seva_based(self) -> bool {
        matches!(self.tracking(), TrackingMethod::SevaBased)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PrasadCategory::Annadan => "ANNADAN",
            PrasadCategory::CounterPaid => "COUNTER_PAID",
            PrasadCategory::SevaPrasadPaid => "SEVA_PRASAD_PAID",
            PrasadCategory::SevaPrasadFree => "SEVA_PRASAD_FREE",
        }
    }
}

impl fmt::Display for PrasadCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrasadCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        PrasadCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| format!("unknown prasad category `{}`", value))
    }
}

/// Physical location where prasad is handed out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DistributionPoint {
    AnnadanHall,
    Counter,
    SevaArea,
}

impl DistributionPoint {
    pub const ALL: [DistributionPoint; 3] = [
        DistributionPoint::AnnadanHall,
        DistributionPoint::Counter,
        DistributionPoint::SevaArea,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DistributionPoint::AnnadanHall => "ANNADAN_HALL",
            DistributionPoint::Counter => "COUNTER",
            DistributionPoint::SevaArea => "SEVA_AREA",
        }
    }
}

impl fmt::Display for DistributionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistributionPoint {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        DistributionPoint::ALL
            .into_iter()
            .find(|point| point.as_str() == normalized)
            .ok_or_else(|| format!("unknown distribution point `{}`", value))
    }
}

/// How distributed quantities are tracked for a category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackingMethod {
    CountOnly,
    UnitBased,
    SevaBased,
}

/// How the finance collaborator books a category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountingTreatment {
    Expense,
    Revenue,
    SevaRevenue,
}

/// What a plan of the category must be linked to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Linkage {
    None,
    Counter,
    Seva,
}

/// Immutable facts about a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryMetadata {
    pub category: PrasadCategory,
    pub accounting: AccountingTreatment,
    pub required_point: DistributionPoint,
    pub linkage: Linkage,
    pub tracking: TrackingMethod,
    /// Whether devotees receive the prasad without paying.
    pub is_free: bool,
}

/// Looks up the fixed metadata of a category.
pub fn metadata_of(category: PrasadCategory) -> CategoryMetadata {
    let (accounting, required_point, linkage, tracking, is_free) = match category {
        PrasadCategory::Annadan => (
            AccountingTreatment::Expense,
            DistributionPoint::AnnadanHall,
            Linkage::None,
            TrackingMethod::CountOnly,
            true,
        ),
        PrasadCategory::CounterPaid => (
            AccountingTreatment::Revenue,
            DistributionPoint::Counter,
            Linkage::Counter,
            TrackingMethod::UnitBased,
            false,
        ),
        PrasadCategory::SevaPrasadPaid => (
            AccountingTreatment::SevaRevenue,
            DistributionPoint::SevaArea,
            Linkage::Seva,
            TrackingMethod::SevaBased,
            false,
        ),
        PrasadCategory::SevaPrasadFree => (
            AccountingTreatment::Expense,
            DistributionPoint::SevaArea,
            Linkage::Seva,
            TrackingMethod::SevaBased,
            true,
        ),
    };
    CategoryMetadata {
        category,
        accounting,
        required_point,
        linkage,
        tracking,
        is_free,
    }
}

/// Compatibility matrix between categories and distribution points.
pub fn is_valid_pair(category: PrasadCategory, point: DistributionPoint) -> bool {
    matches!(
        (category, point),
        (PrasadCategory::Annadan, DistributionPoint::AnnadanHall)
            | (PrasadCategory::CounterPaid, DistributionPoint::Counter)
            | (PrasadCategory::SevaPrasadPaid, DistributionPoint::SevaArea)
            | (PrasadCategory::SevaPrasadFree, DistributionPoint::SevaArea)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_accepts_only_required_points() {
        for category in PrasadCategory::ALL {
            for point in DistributionPoint::ALL {
                let expected = metadata_of(category).required_point == point;
                assert_eq!(
                    is_valid_pair(category, point),
                    expected,
                    "{category} at {point}"
                );
            }
        }
    }

    #[test]
    fn seva_categories_differ_only_in_cost() {
        let paid = metadata_of(PrasadCategory::SevaPrasadPaid);
        let free = metadata_of(PrasadCategory::SevaPrasadFree);
        assert_eq!(paid.tracking, free.tracking);
        assert_eq!(paid.required_point, free.required_point);
        assert!(!paid.is_free);
        assert!(free.is_free);
    }

    #[test]
    fn parses_wire_names() {
        assert_eq!(
            "counter_paid".parse::<PrasadCategory>().unwrap(),
            PrasadCategory::CounterPaid
        );
        assert_eq!(
            "Annadan Hall".parse::<DistributionPoint>().unwrap(),
            DistributionPoint::AnnadanHall
        );
        assert!("temple".parse::<PrasadCategory>().is_err());
    }

    #[test]
    fn serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&PrasadCategory::SevaPrasadFree).unwrap();
        assert_eq!(json, "\"SEVA_PRASAD_FREE\"");
    }
}
