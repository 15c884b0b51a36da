mod process_evaluator;
mod sandbox;

pub use process_evaluator::{ProcessBacktestEvaluator, parse_statistic};
pub use sandbox::EvaluationSandbox;
