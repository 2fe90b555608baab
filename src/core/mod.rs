mod engine;
mod error;
mod solver;
mod types;

pub use engine::{project_growth, project_retirement, project_retirement_with};
pub(crate) use engine::validate_assumptions;
pub use error::{ProjectionError, ProjectionResult};
pub use solver::{
    GoalSolveConfig, GoalSolveIteration, GoalSolveResult, MAX_SOLVER_ITERATIONS,
    solve_monthly_contribution,
};
pub use types::{
    CompoundFrequency, DEFAULT_LIFE_EXPECTANCY, DEFAULT_WITHDRAWAL_RATE, GrowthInput,
    GrowthResult, MAX_LIFE_EXPECTANCY, MAX_PROJECTION_YEARS, RetirementAssumptions,
    RetirementInput, RetirementResult, YearRecord,
};
