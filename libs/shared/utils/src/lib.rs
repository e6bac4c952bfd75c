pub mod format;
pub mod test_utils;
pub mod validation;

pub use format::{digits_only, format_cpf, format_phone};
pub use validation::{FormValidator, PasswordStrength, PasswordStrengthResult};
