#![deny(unsafe_code)]

pub mod catalog;
pub mod choices;
pub mod drugs;
pub mod error;
pub mod oncotree;

pub use catalog::MappingCatalog;
pub use choices::{ChoiceEntry, parse_choices, strip_parenthetical};
pub use drugs::DrugCodeMapper;
pub use error::MappingError;
pub use oncotree::{
    OncotreeEntry, OncotreeReference, canonicalize_cohort_labels, invalid_codes_message, validate,
};
