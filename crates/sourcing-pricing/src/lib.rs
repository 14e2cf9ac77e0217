pub mod error;
pub mod multipliers;
pub mod reprice;
pub mod rounding;

pub use error::PricingError;
pub use multipliers::{
    default_multiplier, CategoryMultiplier, CategoryMultiplierTable, MultiplierMatch,
};
pub use reprice::{
    apply_change, compute_margin, compute_price, evaluate, reprice_sweep, run_reprice_sweep,
    PriceChange, PricingPolicy, RepriceOutcome, RepriceReport, RepriceSkip, SkipCounts,
};
pub use rounding::{round_to_tier, tier_step};

