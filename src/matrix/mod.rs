pub mod builder;
pub mod error;
pub mod hour_date_matrix;
