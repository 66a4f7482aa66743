//! Individual preprocessing steps

pub mod blur;
pub mod grayscale;
pub mod invert;
pub mod threshold;
