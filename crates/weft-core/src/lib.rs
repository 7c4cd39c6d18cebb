//! Weft Core - values and the change algebra
//!
//! This crate holds the immutable value model and the operational
//! transformation rules between changes:
//! - Values: null, atomic scalars, UTF-16 text, lists, maps, schema structs
//! - Changes: `Replace`, `Splice`, `Move`, `PathChange` and `Changes`
//! - Tagged JSON codec for both
//!
//! # Merge convention
//!
//! Two changes `a` and `b` made against the same value converge:
//!
//! ```text
//! (b', a') = a.merge(Some(&b))
//! v.apply(a).apply(b') == v.apply(b).apply(a')
//! ```
//!
//! # Example
//!
//! ```rust
//! use weft_core::{Change, Splice, Value};
//!
//! let v = Value::text("hello");
//! let append: Change = Splice::new(5, Value::text(""), Value::text(" world")).into();
//! let upper: Change = Splice::new(0, Value::text("h"), Value::text("H")).into();
//!
//! let (upper2, append2) = append.merge(Some(&upper));
//! let left = v.apply(&append).apply_opt(upper2.as_ref());
//! let right = v.apply(&upper).apply_opt(append2.as_ref());
//! assert_eq!(left, right);
//! assert_eq!(left, Value::text("Hello world"));
//! ```

pub mod change;
pub mod changes;
pub mod codec;
pub mod error;
pub mod moves;
pub mod path;
pub mod replace;
pub mod schema;
pub mod splice;
pub mod value;

pub use change::{merge, Change, Merged, MAX_POSITION};
pub use changes::Changes;
pub use codec::{encode_change, encode_change_opt, encode_value, CustomDecoder, Registry};
pub use error::{CoreError, Result};
pub use moves::Move;
pub use path::PathChange;
pub use replace::Replace;
pub use schema::{Field, FieldKind, StructDef, StructValue};
pub use splice::Splice;
pub use value::{CustomValue, Key, Scalar, Text, Value};
