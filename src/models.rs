//! Data models for property and appeal records.
//!
//! These are the records a dataset provider hands to the collector, plus
//! the recommendation vocabulary produced by processor agents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Reason string that the analyzer and processors treat specially.
pub const OVERASSESSMENT: &str = "Overassessment";

/// An assessed property as published by the county.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    /// Parcel identifier (e.g. `12-345-67`).
    #[serde(rename = "property_id", alias = "id")]
    pub id: String,
    pub address: String,
    /// Current assessed value in whole currency units.
    pub assessed_value: i64,
    /// Estimated market value in whole currency units.
    pub market_value: i64,
    pub owner_name: String,
    /// Residential, Commercial, and so on.
    pub property_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl PropertyRecord {
    /// Assessed value over market value, with market floored at 1.
    pub fn assessment_ratio(&self) -> f64 {
        self.assessed_value as f64 / self.market_value.max(1) as f64
    }
}

/// Lifecycle state of an appeal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppealStatus {
    Pending,
    #[serde(rename = "Under Review")]
    UnderReview,
    Scheduled,
    Resolved,
}

impl fmt::Display for AppealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppealStatus::Pending => write!(f, "Pending"),
            AppealStatus::UnderReview => write!(f, "Under Review"),
            AppealStatus::Scheduled => write!(f, "Scheduled"),
            AppealStatus::Resolved => write!(f, "Resolved"),
        }
    }
}

/// A formal request to reduce a property's assessed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppealRecord {
    #[serde(rename = "appeal_id", alias = "id")]
    pub id: String,
    /// Foreign key into the property records.
    pub property_id: String,
    /// Filing date, `YYYY-MM-DD`.
    pub appeal_date: String,
    pub status: AppealStatus,
    pub requested_value: i64,
    /// Free-text reason category.
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hearing_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_value: Option<i64>,
}

/// All records fetched from one source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default, alias = "property_records")]
    pub properties: Vec<PropertyRecord>,
    #[serde(default, alias = "appeal_records")]
    pub appeals: Vec<AppealRecord>,
}

impl Dataset {
    pub fn new(properties: Vec<PropertyRecord>, appeals: Vec<AppealRecord>) -> Self {
        Self {
            properties,
            appeals,
        }
    }

    /// Index properties by id for joining appeals to their parcel.
    pub fn property_index(&self) -> HashMap<&str, &PropertyRecord> {
        self.properties.iter().map(|p| (p.id.as_str(), p)).collect()
    }

    /// Summed requested reduction over appeals whose property is known.
    pub fn total_requested_reduction(&self) -> i64 {
        let index = self.property_index();
        self.appeals
            .iter()
            .filter_map(|a| {
                index
                    .get(a.property_id.as_str())
                    .map(|p| (p.assessed_value - a.requested_value).max(0))
            })
            .sum()
    }
}

/// Outcome a processor recommends for one appeal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "Approve reduction")]
    ApproveReduction,
    #[serde(rename = "Partial reduction")]
    PartialReduction,
    #[serde(rename = "Deny appeal")]
    DenyAppeal,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::ApproveReduction => write!(f, "Approve reduction"),
            Recommendation::PartialReduction => write!(f, "Partial reduction"),
            Recommendation::DenyAppeal => write!(f, "Deny appeal"),
        }
    }
}

impl Recommendation {
    /// Returns an emoji representation of the recommendation.
    pub fn emoji(&self) -> &'static str {
        match self {
            Recommendation::ApproveReduction => "🟢",
            Recommendation::PartialReduction => "🟡",
            Recommendation::DenyAppeal => "🔴",
        }
    }

    /// Whether the recommendation grants any reduction.
    pub fn grants_reduction(&self) -> bool {
        !matches!(self, Recommendation::DenyAppeal)
    }
}
