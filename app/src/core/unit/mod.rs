mod degree_celsius;
mod percent;

pub use degree_celsius::DegreeCelsius;
pub use percent::Percent;
