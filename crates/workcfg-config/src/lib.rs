//! Validation and normalization of worker configuration
//!
//! Turns a raw, loosely typed configuration object into a typed [`Config`],
//! resolving named environments against the top level and collecting every
//! problem in a [`Diagnostics`] tree instead of stopping at the first one.
//!
//! ```text
//!  raw object ──> normalize ──> environment (per env) ──> Config
//!                    │               │
//!                    │        inheritance + bindings
//!                    └──────> validation ──> Diagnostics
//! ```

pub mod bindings;
pub mod diagnostics;
pub mod environment;
pub mod error;
pub mod inheritance;
pub mod normalize;
pub mod types;
pub mod validation;

pub use diagnostics::Diagnostics;
pub use environment::{EnvironmentContext, normalize_environment};
pub use error::{Error, Result};
pub use normalize::{Normalized, normalize_and_validate_config, read_config};
pub use types::{Config, DevConfig, Environment, NormalizeArgs, Protocol};
pub use validation::{JsonType, Severity, Validator};
