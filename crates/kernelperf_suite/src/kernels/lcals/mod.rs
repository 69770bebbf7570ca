mod first_min;
mod hydro_1d;
mod hydro_2d;

pub use first_min::FirstMin;
pub use hydro_1d::Hydro1d;
pub use hydro_2d::Hydro2d;
