pub use agent::*;
pub use display::*;
pub use host::*;
pub use negotiation::*;
pub use turn::*;

mod agent;
mod display;
mod host;
mod negotiation;
mod turn;

#[cfg(test)]
mod test_support;
