//! Common building blocks of StructArr.
//!
//! View types describe numeric members, layout planner computes
//! packed member offsets, and the raw buffer holds elements.
pub mod alloc;
pub mod error;
pub mod layout;
pub mod view_type;

pub use alloc::RawBuffer;
pub use error::{Error, Result};
pub use layout::{create_layout, MemberSpec, StructArrayLayout, StructArrayMember};
pub use view_type::{ViewScalar, ViewSet, ViewType};
