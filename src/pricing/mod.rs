//! Fair-value pricing of vanilla options.

pub mod black_scholes;

pub use black_scholes::{premium, premium_and_delta, BlackScholesOutput};
