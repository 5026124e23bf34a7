//! Synthetic county records for demos and load tests.
//!
//! Distributions follow typical Pennsylvania assessment patterns: assessed
//! values sit between 75% and 110% of market, roughly 15% of parcels carry
//! an appeal, and "Overassessment" is by far the most common reason.

use super::DatasetProvider;
use crate::error::ProviderError;
use crate::models::{AppealRecord, AppealStatus, Dataset, PropertyRecord, OVERASSESSMENT};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use tracing::info;

const STREET_NAMES: &[&str] = &[
    "Main St", "Oak Ave", "Pine St", "Church St", "Washington Ave", "Jefferson St",
    "Lincoln Ave", "Madison St", "Adams Ave", "Monroe St", "Elm St", "Maple Ave", "Cedar St",
    "Spruce Ave", "Walnut St", "1st Street", "2nd Street", "3rd Street", "Market St",
    "State St", "Pennsylvania Ave", "Mulberry St", "Vine St", "North St", "South St",
];

const PROPERTY_TYPES: &[&str] = &[
    "Residential",
    "Commercial",
    "Industrial",
    "Vacant Land",
    "Apartment Building",
    "Mixed Use",
    "Institutional",
];

const OWNER_NAMES: &[&str] = &[
    "John Smith", "Mary Johnson", "Robert Williams", "Patricia Brown", "Michael Davis",
    "Linda Miller", "David Wilson", "Susan Moore", "James Taylor", "Barbara Anderson",
    "Richard Thomas", "Nancy Jackson", "Joseph White", "Carol Harris", "Thomas Martin",
    "Sarah Thompson",
];

const ASSESSMENT_RATIOS: &[f64] = &[0.75, 0.80, 0.85, 0.90, 0.95, 1.0, 1.05, 1.10];

const REASON_WEIGHTS: &[(&str, f64)] = &[
    (OVERASSESSMENT, 0.40),
    ("Market Value Dispute", 0.20),
    ("Comparable Sales Analysis", 0.15),
    ("Property Condition", 0.10),
    ("Incorrect Property Information", 0.08),
    ("Uniformity Issues", 0.05),
    ("Clerical Error", 0.02),
];

const STATUS_WEIGHTS: &[(AppealStatus, f64)] = &[
    (AppealStatus::Pending, 0.60),
    (AppealStatus::UnderReview, 0.20),
    (AppealStatus::Scheduled, 0.15),
    (AppealStatus::Resolved, 0.05),
];

const OUTCOME_WEIGHTS: &[(&str, f64)] = &[
    ("Approved - Full Reduction", 0.25),
    ("Approved - Partial Reduction", 0.45),
    ("Denied", 0.30),
];

fn round_thousand(value: f64) -> i64 {
    ((value / 1000.0).round() * 1000.0) as i64
}

fn pick_weighted<'a, T, R: Rng>(rng: &mut R, table: &'a [(T, f64)]) -> &'a T {
    // Weight tables are non-empty constants with positive weights
    let dist = WeightedIndex::new(table.iter().map(|(_, w)| *w))
        .unwrap_or_else(|_| unreachable!("weight tables are static and valid"));
    &table[dist.sample(rng)].0
}

/// Seeded generator for property and appeal records.
pub struct MockDataGenerator {
    rng: StdRng,
    reference_date: DateTime<Utc>,
}

impl MockDataGenerator {
    /// Create a generator; `None` seeds from entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            reference_date: Utc::now(),
        }
    }

    /// Anchor generated dates to a fixed instant instead of now.
    pub fn with_reference_date(mut self, reference_date: DateTime<Utc>) -> Self {
        self.reference_date = reference_date;
        self
    }

    /// Generate `count` property records.
    pub fn generate_property_records(&mut self, count: usize) -> Vec<PropertyRecord> {
        let rng = &mut self.rng;
        let mut properties = Vec::with_capacity(count);

        for _ in 0..count {
            let house_number = rng.gen_range(100..=9999);
            let street = STREET_NAMES.choose(rng).copied().unwrap_or("Main St");
            let property_id = format!(
                "{}-{}-{}",
                rng.gen_range(10..=99),
                rng.gen_range(100..=999),
                rng.gen_range(10..=99)
            );

            let property_type = PROPERTY_TYPES.choose(rng).copied().unwrap_or("Residential");
            let market_value: i64 = match property_type {
                "Residential" => rng.gen_range(50_000..=300_000),
                "Commercial" => rng.gen_range(150_000..=1_500_000),
                "Industrial" => rng.gen_range(200_000..=2_000_000),
                "Apartment Building" => rng.gen_range(300_000..=1_200_000),
                _ => rng.gen_range(30_000..=500_000),
            };

            let ratio = ASSESSMENT_RATIOS.choose(rng).copied().unwrap_or(1.0);
            let assessed_value = round_thousand(market_value as f64 * ratio);

            properties.push(PropertyRecord {
                id: property_id,
                address: format!("{} {}, Scranton, PA", house_number, street),
                assessed_value,
                market_value: round_thousand(market_value as f64),
                owner_name: OWNER_NAMES.choose(rng).copied().unwrap_or("John Smith").to_string(),
                property_type: property_type.to_string(),
                last_updated: Some(
                    self.reference_date - Duration::days(rng.gen_range(30..=365)),
                ),
            });
        }

        properties
    }

    /// Generate appeals for `floor(len * appeal_rate)` distinct properties.
    pub fn generate_appeal_records(
        &mut self,
        properties: &[PropertyRecord],
        appeal_rate: f64,
    ) -> Vec<AppealRecord> {
        let rng = &mut self.rng;
        let count = ((properties.len() as f64 * appeal_rate).floor() as usize).min(properties.len());
        let chosen = rand::seq::index::sample(rng, properties.len(), count);

        let mut appeals = Vec::with_capacity(count);
        for (i, idx) in chosen.iter().enumerate() {
            let property = &properties[idx];
            let appeal_date = self.reference_date - Duration::days(rng.gen_range(30..=365));
            let reason = *pick_weighted(rng, REASON_WEIGHTS);

            let reduction_percent = match reason {
                OVERASSESSMENT | "Market Value Dispute" | "Comparable Sales Analysis" => {
                    rng.gen_range(0.10..0.30)
                }
                "Property Condition" | "Uniformity Issues" => rng.gen_range(0.15..0.35),
                _ => rng.gen_range(0.05..0.20),
            };
            let requested_value =
                round_thousand(property.assessed_value as f64 * (1.0 - reduction_percent));

            let status = *pick_weighted(rng, STATUS_WEIGHTS);

            let hearing_date = match status {
                AppealStatus::Scheduled | AppealStatus::UnderReview => Some(
                    (self.reference_date + Duration::days(rng.gen_range(30..=90)))
                        .format("%Y-%m-%d")
                        .to_string(),
                ),
                _ => None,
            };

            let (resolution, final_value) = if status == AppealStatus::Resolved {
                let outcome = *pick_weighted(rng, OUTCOME_WEIGHTS);
                let final_value = if outcome.contains("Full") {
                    requested_value
                } else if outcome.contains("Partial") {
                    let share = rng.gen_range(0.3..0.7);
                    let reduction = property.assessed_value - requested_value;
                    round_thousand((property.assessed_value - (reduction as f64 * share) as i64) as f64)
                } else {
                    property.assessed_value
                };
                (Some(outcome.to_string()), Some(final_value))
            } else {
                (None, None)
            };

            appeals.push(AppealRecord {
                id: format!("AP-{}-{:03}", appeal_date.format("%Y"), i + 1),
                property_id: property.id.clone(),
                appeal_date: appeal_date.format("%Y-%m-%d").to_string(),
                status,
                requested_value,
                reason: reason.to_string(),
                hearing_date,
                resolution,
                final_value,
            });
        }

        appeals
    }

    /// Generate a complete dataset.
    pub fn generate_dataset(&mut self, num_properties: usize, appeal_rate: f64) -> Dataset {
        let properties = self.generate_property_records(num_properties);
        let appeals = self.generate_appeal_records(&properties, appeal_rate);
        Dataset::new(properties, appeals)
    }
}

/// Provider that generates a fresh synthetic dataset on every fetch.
#[derive(Debug, Clone)]
pub struct MockProvider {
    num_properties: usize,
    appeal_rate: f64,
    seed: Option<u64>,
}

impl MockProvider {
    pub fn new(num_properties: usize, appeal_rate: f64, seed: Option<u64>) -> Self {
        Self {
            num_properties,
            appeal_rate,
            seed,
        }
    }
}

#[async_trait]
impl DatasetProvider for MockProvider {
    async fn fetch(&self, source_id: &str) -> Result<Dataset, ProviderError> {
        if !(0.0..=1.0).contains(&self.appeal_rate) {
            return Err(ProviderError::Malformed(format!(
                "appeal rate {} outside [0, 1]",
                self.appeal_rate
            )));
        }

        let dataset = MockDataGenerator::new(self.seed)
            .generate_dataset(self.num_properties, self.appeal_rate);
        info!(
            "Generated {} properties with {} appeals for {}",
            dataset.properties.len(),
            dataset.appeals.len(),
            source_id
        );
        Ok(dataset)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn fixed_generator(seed: u64) -> MockDataGenerator {
        let reference = Utc.with_ymd_and_hms(2024, 7, 14, 10, 0, 0).unwrap();
        MockDataGenerator::new(Some(seed)).with_reference_date(reference)
    }

    #[test]
    fn test_same_seed_same_dataset() {
        let a = fixed_generator(42).generate_dataset(40, 0.15);
        let b = fixed_generator(42).generate_dataset(40, 0.15);
        assert_eq!(a, b);
    }

    #[test]
    fn test_appeal_count_and_distinct_properties() {
        let dataset = fixed_generator(7).generate_dataset(100, 0.15);
        assert_eq!(dataset.properties.len(), 100);
        assert_eq!(dataset.appeals.len(), 15);

        let appealed: HashSet<_> = dataset.appeals.iter().map(|a| &a.property_id).collect();
        assert_eq!(appealed.len(), 15);
    }

    #[test]
    fn test_values_rounded_and_ratio_in_range() {
        let dataset = fixed_generator(3).generate_dataset(60, 0.2);
        for p in &dataset.properties {
            assert_eq!(p.assessed_value % 1000, 0);
            assert_eq!(p.market_value % 1000, 0);
            if p.market_value > 0 {
                let ratio = p.assessment_ratio();
                assert!((0.7..=1.15).contains(&ratio), "ratio {} out of range", ratio);
            }
        }
        for a in &dataset.appeals {
            assert_eq!(a.requested_value % 1000, 0);
            assert!(a.id.starts_with("AP-"));
        }
    }

    #[test]
    fn test_status_specific_fields() {
        let dataset = fixed_generator(11).generate_dataset(400, 0.5);
        for a in &dataset.appeals {
            match a.status {
                AppealStatus::Scheduled | AppealStatus::UnderReview => {
                    assert!(a.hearing_date.is_some());
                    assert!(a.resolution.is_none());
                }
                AppealStatus::Resolved => {
                    assert!(a.resolution.is_some());
                    assert!(a.final_value.is_some());
                }
                AppealStatus::Pending => {
                    assert!(a.hearing_date.is_none());
                    assert!(a.final_value.is_none());
                }
            }
        }
    }

    #[tokio::test]
    async fn test_mock_provider_rejects_bad_rate() {
        let provider = MockProvider::new(10, 1.5, Some(1));
        assert!(provider.fetch("lackawanna").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_provider_fetch() {
        let provider = MockProvider::new(20, 0.25, Some(5));
        let dataset = provider.fetch("lackawanna").await.unwrap();
        assert_eq!(dataset.properties.len(), 20);
        assert_eq!(dataset.appeals.len(), 5);
    }
}
