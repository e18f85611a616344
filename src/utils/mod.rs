pub mod geo;
pub mod images;
pub mod jwt;
pub mod validation;
