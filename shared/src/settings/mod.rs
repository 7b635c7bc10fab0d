//! Settings field catalogue and merge policy

pub mod fields;
pub mod merge;

pub use fields::{
    DEFAULT_PROTECTED_FIELDS, REMOVE_SUFFIX, REVISION_FIELD, SECRET_FIELDS, TOGGLE_FIELDS,
    cold_store_defaults, revision_of,
};
pub use merge::merge_settings;
