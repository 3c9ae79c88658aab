//! Single-expiry volatility smiles.
//!
//! A smile represents how implied volatility varies with strike at a fixed
//! expiry. The surface builds one [`SabrSmile`] per quote from the stored
//! parameter set, so smiles are cheap value types.

pub mod sabr;

pub use sabr::SabrSmile;

use crate::error;
use crate::fixed::Fixed18;

/// A single-tenor volatility smile.
///
/// # Thread Safety
/// All implementations must be `Send + Sync` for use in concurrent pricing.
pub trait SmileSection: Send + Sync {
    /// Implied Black volatility σ at the given strike.
    fn vol(&self, strike: Fixed18) -> error::Result<Fixed18>;

    /// Forward price F at this tenor.
    fn forward(&self) -> Fixed18;

    /// Time to expiry T in years.
    fn expiry(&self) -> Fixed18;
}
