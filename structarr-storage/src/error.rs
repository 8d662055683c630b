pub use structarr_common::error::{Error, Result};
