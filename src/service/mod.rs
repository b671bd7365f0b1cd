//! CrudService: generic CRUD using safe SQL builder, plus request normalization and validation.

mod crud;
mod normalize;
mod validation;
pub use crud::{row_to_json, CrudService};
pub use normalize::normalize_body;
pub use validation::RequestValidator;
