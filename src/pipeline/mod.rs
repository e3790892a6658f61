pub mod analyze;
pub mod background;
pub mod contrast;
pub mod extract;
