pub mod migrator;
pub mod validator;

pub use migrator::MigrationPlan;
pub use validator::{check_required, normalize_row, validate_fields, validate_table_name};
