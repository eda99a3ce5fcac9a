//! Cyclic shift-rota optimisation core.
//!
//! Solves the monthly shift-scheduling problem for staff working a cyclic
//! base pattern: every employee gets one shift code per day such that
//! sequencing rules hold, daily coverage is met exactly, exclusions are
//! honoured, worked hours stay near contract, and the result follows the
//! cyclic pattern so schedules stay recognisable month over month.
//!
//! # Modules
//!
//! - **`models`**: Domain types — `ShiftType`, `Employee`, `SequenceRule`,
//!   `CoverageRule`, `ShiftMatrix`, `Roster`, `PlanningConfig`
//! - **`checker`**: Sequence rule validation (linear and cyclic)
//! - **`evaluator`**: Weighted fitness scoring and KPI summaries
//! - **`baseline`**: Deterministic greedy builder (matrix → month)
//! - **`ga`**: The evolution skeleton and the two optimisation problems
//! - **`planner`**: Job orchestration, wire types, progress, cancellation
//! - **`validation`**: Structural configuration checks
//!
//! # Quick Start
//!
//! ```no_run
//! use rotaplan::models::{
//!     CoverageRule, Employee, PlanningConfig, ShiftMatrix, ShiftType,
//! };
//! use rotaplan::planner::{OptimizerOptions, Planner};
//!
//! let config = PlanningConfig {
//!     year: 2027,
//!     month: 1,
//!     employees: vec![Employee::new("e1"), Employee::new("e2")],
//!     shift_types: vec![
//!         ShiftType::new("M").with_label("Morning").with_hours(8.0),
//!         ShiftType::new("P").with_label("Afternoon").with_hours(8.0),
//!         ShiftType::new("RP").with_label("Rest"),
//!     ],
//!     matrices: vec![ShiftMatrix::new(
//!         "mx",
//!         [["M", "M", "M", "P", "P", "RP", "RP"]; 2],
//!     )],
//!     coverage_rules: vec![CoverageRule::new(1, ["M"])],
//!     ..Default::default()
//! };
//!
//! let mut planner = Planner::new()
//!     .with_progress(|p| println!("gen {} fitness {}", p.generation, p.best_fitness));
//! let result = planner
//!     .generate_monthly_schedule(&config, &OptimizerOptions::default())
//!     .unwrap();
//! println!("valid: {}", result.evaluation.is_valid);
//! ```
//!
//! # Determinism
//!
//! All randomness flows through a seeded generator injected per job
//! (`OptimizerOptions.seed`); equal configuration, options and seed give
//! bit-identical results. The core holds no global state and persists
//! nothing.

pub mod baseline;
pub mod checker;
pub mod error;
pub mod evaluator;
pub mod ga;
pub mod models;
pub mod planner;
pub mod validation;

pub use error::{PlanError, Result};
