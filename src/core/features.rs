pub mod speech;
pub mod translator;
