//! Command handlers grouped by concern.

pub(crate) mod inspect;
pub(crate) mod read;
pub(crate) mod settings;
