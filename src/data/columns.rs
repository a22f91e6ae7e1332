//! Column names of the incident dataset.
//!
//! The raw dataset's header is an external contract: request payloads sent to
//! the prediction endpoints must use these names byte for byte.

pub const FIRE_ID: &str = "FireID";
pub const START_DATE: &str = "StartDate";
pub const END_DATE: &str = "EndDate";

pub const ACTUAL_LOSS: &str = "ActualEconomicLoss_USD";
pub const PREDICTED_LOSS: &str = "PredictedEconomicLoss_USD";
pub const SEVERITY_INDEX: &str = "FireSeverityIndex";

pub const CROP_LOSS: &str = "CropLoss_USD";
pub const LIVESTOCK_LOSS: &str = "LivestockLoss_USD";
pub const IRRIGATION_DAMAGE: &str = "IrrigationDamage_USD";
pub const ROAD_DAMAGE: &str = "RoadDamage_USD";
pub const POWER_LINE_DAMAGE: &str = "PowerLineDamage_USD";
pub const BUILDING_DAMAGE: &str = "BuildingDamage_USD";
pub const TIMBER_LOSS: &str = "TimberLoss_USD";
pub const REFORESTATION_COST: &str = "ReforestationCost_USD";
pub const HEALTH_COST: &str = "HealthCost_USD";
pub const TOURISM_REVENUE_LOSS: &str = "TourismRevenueLoss_USD";
pub const AID_RECEIVED: &str = "AidReceived_USD";
pub const INSURANCE_PAYOUT: &str = "InsurancePayout_USD";

pub const TOTAL_AGRI_LOSS: &str = "TotalAgriLoss_USD";
pub const INFRA_LOSS: &str = "InfraLoss_USD";
pub const ENVIRONMENTAL_COST: &str = "EnvironmentalCost_USD";
pub const LOSS_DEVIATION: &str = "LossDeviation_USD";
pub const SUPPORT_RATIO: &str = "SupportRatio";

/// Identifier and date columns: carried through every table, never modeled.
pub const NON_FEATURE_COLUMNS: [&str; 3] = [FIRE_ID, START_DATE, END_DATE];

/// Target columns excluded from the feature schema.
pub const TARGET_COLUMNS: [&str; 2] = [ACTUAL_LOSS, SEVERITY_INDEX];

/// Missing values in these columns mean "no loss reported" and become zero.
pub const ZERO_FILL_COLUMNS: [&str; 6] = [
    CROP_LOSS,
    LIVESTOCK_LOSS,
    IRRIGATION_DAMAGE,
    TOURISM_REVENUE_LOSS,
    AID_RECEIVED,
    INSURANCE_PAYOUT,
];

/// Engineered columns, in the order they are computed.
pub const ENGINEERED_COLUMNS: [&str; 5] = [
    TOTAL_AGRI_LOSS,
    INFRA_LOSS,
    ENVIRONMENTAL_COST,
    LOSS_DEVIATION,
    SUPPORT_RATIO,
];

/// Numeric inputs the engineered columns are derived from.
pub const ENGINEERING_INPUTS: [&str; 14] = [
    CROP_LOSS,
    LIVESTOCK_LOSS,
    IRRIGATION_DAMAGE,
    ROAD_DAMAGE,
    POWER_LINE_DAMAGE,
    BUILDING_DAMAGE,
    TIMBER_LOSS,
    REFORESTATION_COST,
    HEALTH_COST,
    ACTUAL_LOSS,
    PREDICTED_LOSS,
    AID_RECEIVED,
    INSURANCE_PAYOUT,
    SEVERITY_INDEX,
];

/// Every column the raw dataset must provide.
pub fn required_columns() -> Vec<&'static str> {
    let mut columns: Vec<&'static str> = NON_FEATURE_COLUMNS.to_vec();
    columns.extend(ENGINEERING_INPUTS);
    columns.push(TOURISM_REVENUE_LOSS);
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_required_columns_are_unique() {
        let columns = required_columns();
        let unique: HashSet<_> = columns.iter().collect();
        assert_eq!(columns.len(), unique.len());
    }

    #[test]
    fn test_zero_fill_columns_are_required() {
        let required = required_columns();
        for column in ZERO_FILL_COLUMNS {
            assert!(required.contains(&column), "{} not required", column);
        }
    }
}
