//! Weft Stream - persistent version chains
//!
//! A [`Stream`] is an immutable position in a chain of changes over a
//! [`weft_core::Value`]. Any handle can append; appends made at stale
//! positions are merged through the changes that came after them, so every
//! handle sharing a chain reaches the same value via [`Stream::latest`].
//!
//! On top of the chain:
//! - [`Stream::branch`] with [`Stream::push`] / [`Stream::pull`]
//! - [`Stream::undoable`] with [`Stream::undo`] / [`Stream::redo`]
//!
//! # Example
//!
//! ```rust
//! use weft_core::{Splice, Value};
//! use weft_stream::Stream;
//!
//! let parent = Stream::new(Value::text("hello"));
//! let child = parent.branch();
//! child.append(Splice::new(5, Value::text(""), Value::text("!")).into());
//! child.push();
//! assert_eq!(parent.latest().value(), &Value::text("hello!"));
//! ```

mod branch;
pub mod stream;
mod undo;

pub use stream::Stream;
