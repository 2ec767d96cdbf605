//! Benchmark Harness (spec.md §4.10): loads a labelled suite, drives the
//! engine against it with deterministic sampling, checkpoints per item,
//! scores against declarative rules, and aggregates a report with a
//! regression gate.
//!
//! Grounded on `coordination/src/benchmark/{harness,problem,metrics}.rs`
//! for the session/metrics split, `CortexLM-dataforge`'s seeded-RNG
//! sampling for reproducibility, and spec.md §6's suite/report file
//! formats (YAML in, JSON/Markdown out).

pub mod checkpoint;
pub mod report;
pub mod runner;
pub mod sampling;
pub mod scoring;
pub mod suite;

pub use checkpoint::{CheckpointRecord, CheckpointStore};
pub use report::{aggregate, regression_gate_passes, render_markdown, ItemOutcome, Report};
pub use runner::{run, RunConfig, RunMode, RunOutcome};
pub use sampling::{sample_order, SampledOrder};
pub use scoring::{score_item, ScoreResult};
pub use suite::{Expected, Scoring, ScoringRule, Suite, SuiteItem, SuiteMetadata};
