//! Computations over loaded archives. Everything here returns plain arrays for
//! the renderers in [`crate::plot`]; nothing draws.

pub mod psrrates;
pub mod stats;
pub mod time;
