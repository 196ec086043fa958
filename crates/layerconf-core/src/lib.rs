//! layerconf-core: Layered configuration resolution
//!
//! This crate loads YAML configuration documents, composes them through
//! `extends` declarations, substitutes `${path}` references until the
//! tree reaches a fixpoint, and returns a fully resolved [`Config`].
//! Caller-supplied [`Overrides`] shadow document values during
//! reference lookup without being written into the output tree.
//!
//! # Example
//!
//! ```rust
//! use layerconf_core::{Config, Overrides};
//!
//! let yaml = r#"
//! database:
//!   host: localhost
//!   url: "${database.host}:5432"
//! "#;
//!
//! let config = Config::from_yaml(yaml, &Overrides::new()).unwrap();
//! assert_eq!(config.get_string("database.url").unwrap(), "localhost:5432");
//! ```

pub mod error;
pub mod interpolation;
pub mod loader;
pub mod overrides;
pub mod resolve;
pub mod value;

mod config;

pub use config::Config;
pub use error::{Error, ErrorKind, Result, SourceLocation};
pub use loader::{load, load_with_options, LoadOptions};
pub use overrides::Overrides;
pub use value::Value;
