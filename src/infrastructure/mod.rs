// External backtest engine integration
pub mod backtest;

pub use backtest::ProcessBacktestEvaluator;
