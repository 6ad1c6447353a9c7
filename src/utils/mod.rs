pub mod price_validation;
