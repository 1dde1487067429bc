//! Security audit of the AHB bridges on Aspeed BMC SoCs.
//!
//! A [Soc] is created from the silicon revision, loads the built-in hardware description for
//! that generation and binds the registered drivers to the devices it describes. Drivers are
//! only initialised when something asks for them. Bridge-controller drivers register a
//! [bridge::BridgeController] when initialised, and [Soc::probe_bridge_controllers] folds their
//! reports into one verdict.

pub mod ahb;
pub mod ast;
pub mod bridge;
mod context;
pub mod dev;
pub mod devicetree;
pub mod drivers;
pub mod error;
pub mod logging;
pub mod rev;

pub use context::Soc;
pub use error::SocError;
