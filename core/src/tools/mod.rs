pub mod calculator;

pub use calculator::CalculatorTool;
