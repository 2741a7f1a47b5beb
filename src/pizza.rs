use anyhow::Result;

/// The operation run when no mode flag is given
#[cfg_attr(test, mockall::automock)]
pub trait PizzaOperation {
    /// Accept the positional values in order and produce the text to print
    fn run(&self, values: &[String]) -> Result<String>;
}

/// Placeholder operation: echoes its values separated by single spaces
#[derive(Debug, Clone, Copy, Default)]
pub struct Pizza;

impl PizzaOperation for Pizza {
    fn run(&self, values: &[String]) -> Result<String> {
        Ok(values.join(" "))
    }
}
