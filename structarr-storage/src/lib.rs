//! The storage of StructArr.
//!
//! Elements of a fixed shape are packed into one contiguous, aligned
//! buffer and accessed through typed views. The buffer grows
//! geometrically on append, and can be handed off whole to another
//! thread without per-field serialization.
pub mod array;
pub mod element;
pub mod error;
mod macros;
pub mod transfer;

pub use array::{StructArray, StructArrayShape};
pub use element::ElementView;
pub use error::{Error, Result};
pub use structarr_common::layout;
pub use structarr_common::{
    create_layout, MemberSpec, RawBuffer, StructArrayLayout, StructArrayMember, ViewScalar,
    ViewSet, ViewType,
};
pub use transfer::SerializedStructArray;

/// Capacity of the first allocation.
pub const DEFAULT_CAPACITY: usize = 128;
/// Growth factor of capacity on reallocation.
pub const RESIZE_MULTIPLIER: usize = 5;
