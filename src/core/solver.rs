use serde::Serialize;
use tracing::debug;

use super::engine::project_growth;
use super::error::{ProjectionError, ProjectionResult, require_non_negative};
use super::types::GrowthInput;

/// Upper bound on bisection steps a caller may request.
pub const MAX_SOLVER_ITERATIONS: u32 = 1_000;

/// Slack that absorbs float noise when comparing a projection to the target.
const TARGET_SLACK: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalSolveConfig {
    pub target_amount: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl GoalSolveConfig {
    pub fn for_target(target_amount: f64) -> Self {
        Self {
            target_amount,
            search_min: 0.0,
            search_max: 100_000.0,
            tolerance: 0.01,
            max_iterations: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_value: f64,
    pub projected_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveResult {
    pub target_amount: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub solved_value: Option<f64>,
    pub projected_amount: Option<f64>,
    pub iterations: Vec<GoalSolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

#[derive(Debug)]
enum SearchOutcome {
    MetAtLowerBound,
    OutOfReach,
    Narrowed(Bisection),
}

#[derive(Debug)]
struct Bisection {
    value: f64,
    converged: bool,
    steps: Vec<GoalSolveIteration>,
}

/// Smallest monthly contribution for which `input` grows to the target amount.
///
/// Every other field of `input` is held fixed; its `monthly_contribution` is ignored.
pub fn solve_monthly_contribution(
    input: &GrowthInput,
    config: GoalSolveConfig,
) -> ProjectionResult<GoalSolveResult> {
    validate_config(config)?;

    let project = |monthly_contribution: f64| -> ProjectionResult<f64> {
        let candidate = GrowthInput {
            monthly_contribution,
            ..input.clone()
        };
        Ok(project_growth(&candidate)?.total_amount)
    };

    let outcome = if reaches(project(config.search_min)?, config.target_amount) {
        SearchOutcome::MetAtLowerBound
    } else if !reaches(project(config.search_max)?, config.target_amount) {
        SearchOutcome::OutOfReach
    } else {
        SearchOutcome::Narrowed(bisect(&config, project)?)
    };

    let (solved_value, converged, iterations, message) = match outcome {
        SearchOutcome::MetAtLowerBound => (
            Some(config.search_min),
            true,
            Vec::new(),
            "Target is met at the lowest contribution searched.",
        ),
        SearchOutcome::OutOfReach => (
            None,
            false,
            Vec::new(),
            "Target is out of reach even at the highest contribution searched.",
        ),
        SearchOutcome::Narrowed(found) => {
            let message = if found.converged {
                "Contribution located within tolerance."
            } else {
                "Iteration limit hit before tolerance; reporting the closest contribution found."
            };
            (Some(found.value), found.converged, found.steps, message)
        }
    };

    let projected_amount = solved_value.map(project).transpose()?;

    debug!(
        target = config.target_amount,
        solved = ?solved_value,
        steps = iterations.len(),
        converged,
        "solved monthly contribution"
    );

    Ok(GoalSolveResult {
        target_amount: config.target_amount,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        feasible: solved_value.is_some(),
        solved_value,
        projected_amount,
        iterations,
        converged,
        message: message.to_string(),
    })
}

fn reaches(projected_amount: f64, target_amount: f64) -> bool {
    projected_amount + TARGET_SLACK >= target_amount
}

/// Halves `[search_min, search_max]` until it is narrower than the tolerance.
///
/// The lower bound must miss the target and the upper bound must reach it.
fn bisect(
    config: &GoalSolveConfig,
    mut project: impl FnMut(f64) -> ProjectionResult<f64>,
) -> ProjectionResult<Bisection> {
    let mut lower = config.search_min;
    let mut upper = config.search_max;
    let mut steps = Vec::new();

    for iteration in 1..=config.max_iterations {
        let candidate_value = lower + (upper - lower) / 2.0;
        let projected_amount = project(candidate_value)?;
        steps.push(GoalSolveIteration {
            iteration,
            lower_bound: lower,
            upper_bound: upper,
            candidate_value,
            projected_amount,
        });

        if reaches(projected_amount, config.target_amount) {
            upper = candidate_value;
        } else {
            lower = candidate_value;
        }

        if upper - lower <= config.tolerance {
            return Ok(Bisection {
                value: upper,
                converged: true,
                steps,
            });
        }
    }

    Ok(Bisection {
        value: upper,
        converged: false,
        steps,
    })
}

fn validate_config(config: GoalSolveConfig) -> ProjectionResult<()> {
    require_non_negative("targetAmount", config.target_amount)?;
    require_non_negative("searchMin", config.search_min)?;
    require_non_negative("searchMax", config.search_max)?;

    if config.search_max <= config.search_min {
        return Err(ProjectionError::invalid(
            "searchMax",
            "must be greater than searchMin",
        ));
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(ProjectionError::invalid("tolerance", "must be > 0"));
    }
    if config.max_iterations == 0 || config.max_iterations > MAX_SOLVER_ITERATIONS {
        return Err(ProjectionError::invalid(
            "maxIterations",
            format!("must be within 1..={MAX_SOLVER_ITERATIONS}"),
        ));
    }
    Ok(())
}
