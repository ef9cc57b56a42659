//! Infrastructure configuration modules.

pub mod exchange;
pub mod logging;
pub mod policy;
pub mod settings;
