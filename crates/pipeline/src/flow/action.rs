/// Actions an observer can take between generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop the run after the current generation.
    StopEarly,
}
