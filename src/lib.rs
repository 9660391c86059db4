//! Configuration definition language: validate decoded configuration trees
//! against a small declarative template, and optionally pull validated values
//! into your own variables on the way.
//!
//! ```
//! use cdl::{compile, Configurator, Template};
//! use serde_json::json;
//!
//! let template = Template::new()
//!     .with("/", "{}listen workers? tags?*")
//!     .with("listen", "ipport")
//!     .with("workers", "integer")
//!     .with("tags", "string");
//! let compiled = compile(&template).unwrap();
//!
//! let mut workers = 1i64;
//! let doc = json!({"listen": "0.0.0.0:8080", "workers": 4.0, "tags": ["a"]});
//! compiled
//!     .validate_and_configure(&doc, &mut Configurator::new().assign("workers", &mut workers))
//!     .unwrap();
//! assert_eq!(workers, 4);
//!
//! let err = compiled.validate(&json!({"workers": 2})).unwrap_err();
//! assert_eq!(err.to_string(), "Missing mandatory key; missing 'listen' (code ErrMissingMandatory)");
//! ```
//!
//! Template grammar:
//! - `{}child mods ...` map; mods are `?` optional, `!` mandatory (default),
//!   `*` array of zero or more, `+` array of one or more, `{n,m}` / `{n,}` array
//!   of that many. At most one presence and one cardinality modifier per child.
//! - `[]child` array of `child`, optionally followed by `{n,m}` / `{n,}`.
//! - `number`, `integer`, `ipport` pseudotypes.
//! - any other text is an exact type name (`string`, `bool`, `i64`, `u64`, `f64`,
//!   `null`, `array`, `object`).
//! - the empty string refers back to the root rule `/`.
//!
//! Child names without their own entry are accepted without any check.
pub mod compile;
pub mod configure;
pub mod enums;
pub mod error;
pub mod path;
pub mod rule;
pub mod template;
pub mod validate;

pub use compile::{compile, compile_or_panic, CompiledTemplate};
pub use configure::{Configured, Configurator, Destination, Handler};
pub use enums::{Enum, EnumType};
pub use error::{CdlError, ErrorKind, Result};
pub use path::{Path, Segment};
pub use rule::{Pseudotype, Range, Requirement, Rule, ROOT};
pub use template::{Entry, Template, ValidatorFn};
