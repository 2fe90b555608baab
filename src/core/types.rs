use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::error::ProjectionError;

pub const DEFAULT_LIFE_EXPECTANCY: u32 = 85;
pub const DEFAULT_WITHDRAWAL_RATE: f64 = 0.04;
pub const MAX_LIFE_EXPECTANCY: u32 = 150;
/// Longest horizon the CLI and HTTP surfaces accept for a growth projection.
pub const MAX_PROJECTION_YEARS: u32 = 100;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompoundFrequency {
    Monthly,
    Quarterly,
    Annually,
}

impl CompoundFrequency {
    /// Number of times interest is capitalized per year.
    pub fn periods_per_year(self) -> u32 {
        match self {
            CompoundFrequency::Monthly => 12,
            CompoundFrequency::Quarterly => 4,
            CompoundFrequency::Annually => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompoundFrequency::Monthly => "monthly",
            CompoundFrequency::Quarterly => "quarterly",
            CompoundFrequency::Annually => "annually",
        }
    }
}

impl fmt::Display for CompoundFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompoundFrequency {
    type Err = ProjectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(CompoundFrequency::Monthly),
            "quarterly" => Ok(CompoundFrequency::Quarterly),
            "annually" | "annual" | "yearly" => Ok(CompoundFrequency::Annually),
            other => Err(ProjectionError::invalid(
                "compoundFrequency",
                format!("unrecognized compounding frequency '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrowthInput {
    pub principal: f64,
    pub monthly_contribution: f64,
    /// Nominal annual rate in percent, `7.0` means 7%.
    pub annual_rate_percent: f64,
    pub years: u32,
    pub compound_frequency: CompoundFrequency,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRecord {
    pub year: u32,
    pub starting_amount: f64,
    pub contributions: f64,
    pub interest: f64,
    pub ending_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthResult {
    pub total_amount: f64,
    pub total_contributions: f64,
    pub total_interest: f64,
    pub yearly_breakdown: Vec<YearRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetirementInput {
    pub current_age: u32,
    pub retirement_age: u32,
    pub current_savings: f64,
    pub monthly_contribution: f64,
    pub expected_return_percent: f64,
    /// Accepted and validated, but no formula reads it yet.
    pub inflation_rate_percent: f64,
    pub retirement_goal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementResult {
    pub total_savings: f64,
    pub monthly_retirement_income: f64,
    /// Negative when retirement starts past the assumed life expectancy.
    pub years_of_retirement: i32,
    pub shortfall: f64,
    pub recommended_monthly_contribution: f64,
}

/// Policy constants behind the retirement projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementAssumptions {
    pub life_expectancy: u32,
    /// Annual withdrawal rate as a decimal, `0.04` means 4%.
    pub withdrawal_rate: f64,
}

impl Default for RetirementAssumptions {
    fn default() -> Self {
        Self {
            life_expectancy: DEFAULT_LIFE_EXPECTANCY,
            withdrawal_rate: DEFAULT_WITHDRAWAL_RATE,
        }
    }
}
