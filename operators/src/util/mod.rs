pub mod async_util;
pub mod rayon;
pub mod retry;

use crate::error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
