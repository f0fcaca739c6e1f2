//! Capital control
//!
//! - `portfolio_risk` - Global exposure cap, position count and evaluation cooldowns

pub mod portfolio_risk;

pub use portfolio_risk::{PortfolioBlock, PortfolioRiskConfig, PortfolioRiskGovernor, PortfolioState};
