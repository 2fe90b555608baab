use tracing::debug;

use super::error::{ProjectionError, ProjectionResult, require_non_negative};
use super::types::{
    GrowthInput, GrowthResult, MAX_LIFE_EXPECTANCY, MAX_PROJECTION_YEARS, RetirementAssumptions,
    RetirementInput, RetirementResult, YearRecord,
};

const MONTHS_PER_YEAR: u32 = 12;

pub fn project_growth(input: &GrowthInput) -> ProjectionResult<GrowthResult> {
    if let Err(err) = validate_growth_input(input) {
        debug!(error = %err, "rejected growth input");
        return Err(err);
    }

    let periods_per_year = input.compound_frequency.periods_per_year();
    let months_per_period = MONTHS_PER_YEAR / periods_per_year;
    let annual_rate = input.annual_rate_percent / 100.0;
    let period_rate = annual_rate / periods_per_year as f64;

    let mut current_amount = input.principal;
    let mut total_contributions = input.principal;
    let mut yearly_breakdown =
        Vec::with_capacity(input.years.min(MAX_PROJECTION_YEARS) as usize);

    for year in 1..=input.years {
        let starting_amount = current_amount;
        let mut year_contributions = 0.0;
        let mut year_interest = 0.0;

        for month in 1..=MONTHS_PER_YEAR {
            current_amount += input.monthly_contribution;
            year_contributions += input.monthly_contribution;
            total_contributions += input.monthly_contribution;

            // Year end always capitalizes, even when the period does not divide 12.
            if month % months_per_period == 0 || month == MONTHS_PER_YEAR {
                let interest = current_amount * period_rate;
                current_amount += interest;
                year_interest += interest;
            }
        }

        yearly_breakdown.push(YearRecord {
            year,
            starting_amount,
            contributions: year_contributions,
            interest: year_interest,
            ending_amount: current_amount,
        });
    }

    let result = GrowthResult {
        total_amount: current_amount,
        total_contributions,
        total_interest: current_amount - total_contributions,
        yearly_breakdown,
    };
    debug!(
        years = input.years,
        frequency = %input.compound_frequency,
        total_amount = result.total_amount,
        total_interest = result.total_interest,
        "projected growth"
    );
    Ok(result)
}

pub fn project_retirement(input: &RetirementInput) -> ProjectionResult<RetirementResult> {
    project_retirement_with(input, &RetirementAssumptions::default())
}

pub fn project_retirement_with(
    input: &RetirementInput,
    assumptions: &RetirementAssumptions,
) -> ProjectionResult<RetirementResult> {
    if let Err(err) = validate_retirement_input(input, assumptions) {
        debug!(error = %err, "rejected retirement input");
        return Err(err);
    }

    let years_to_retirement = input.retirement_age - input.current_age;
    let months_to_retirement = years_to_retirement
        .checked_mul(MONTHS_PER_YEAR)
        .ok_or_else(|| ProjectionError::invalid("retirementAge", "too far from currentAge"))?;
    let annual_return = input.expected_return_percent / 100.0;
    let monthly_return = annual_return / MONTHS_PER_YEAR as f64;
    let years_of_retirement =
        i32::try_from(i64::from(assumptions.life_expectancy) - i64::from(input.retirement_age))
            .map_err(|_| ProjectionError::invalid("retirementAge", "out of range"))?;

    let future_current_savings =
        input.current_savings * (1.0 + annual_return).powf(years_to_retirement as f64);
    let accumulation_factor = annuity_factor(monthly_return, months_to_retirement);
    let future_contributions = input.monthly_contribution * accumulation_factor;
    let total_savings = future_current_savings + future_contributions;

    let monthly_retirement_income =
        total_savings * (assumptions.withdrawal_rate / MONTHS_PER_YEAR as f64);
    let monthly_goal = input.retirement_goal / MONTHS_PER_YEAR as f64;
    let shortfall = (monthly_goal - monthly_retirement_income).max(0.0);

    let additional_needed = input.retirement_goal - total_savings;
    let recommended_monthly_contribution = if additional_needed > 0.0 {
        additional_needed / accumulation_factor + input.monthly_contribution
    } else {
        input.monthly_contribution
    };

    debug!(
        years_to_retirement,
        years_of_retirement,
        total_savings,
        shortfall,
        "projected retirement"
    );

    Ok(RetirementResult {
        total_savings,
        monthly_retirement_income,
        years_of_retirement,
        shortfall,
        recommended_monthly_contribution,
    })
}

/// Future value of one unit paid at the end of each of `periods` periods.
fn annuity_factor(period_rate: f64, periods: u32) -> f64 {
    if period_rate.abs() < 1e-12 {
        return periods as f64;
    }
    ((1.0 + period_rate).powf(periods as f64) - 1.0) / period_rate
}

fn validate_growth_input(input: &GrowthInput) -> ProjectionResult<()> {
    require_non_negative("principal", input.principal)?;
    require_non_negative("monthlyContribution", input.monthly_contribution)?;
    require_non_negative("annualRatePercent", input.annual_rate_percent)?;
    if input.years < 1 {
        return Err(ProjectionError::invalid("years", "must be >= 1"));
    }
    Ok(())
}

fn validate_retirement_input(
    input: &RetirementInput,
    assumptions: &RetirementAssumptions,
) -> ProjectionResult<()> {
    validate_assumptions(assumptions)?;

    if input.retirement_age <= input.current_age {
        return Err(ProjectionError::invalid(
            "retirementAge",
            "must be greater than currentAge",
        ));
    }

    require_non_negative("currentSavings", input.current_savings)?;
    require_non_negative("monthlyContribution", input.monthly_contribution)?;
    require_non_negative("expectedReturnPercent", input.expected_return_percent)?;
    require_non_negative("inflationRatePercent", input.inflation_rate_percent)?;
    require_non_negative("retirementGoal", input.retirement_goal)?;
    Ok(())
}

pub(crate) fn validate_assumptions(assumptions: &RetirementAssumptions) -> ProjectionResult<()> {
    if assumptions.life_expectancy == 0 || assumptions.life_expectancy > MAX_LIFE_EXPECTANCY {
        return Err(ProjectionError::invalid(
            "lifeExpectancy",
            format!("must be within 1..={MAX_LIFE_EXPECTANCY}"),
        ));
    }
    let rate = assumptions.withdrawal_rate;
    if !rate.is_finite() || rate <= 0.0 || rate > 1.0 {
        return Err(ProjectionError::invalid(
            "withdrawalRate",
            "must be within (0, 1]",
        ));
    }
    Ok(())
}
