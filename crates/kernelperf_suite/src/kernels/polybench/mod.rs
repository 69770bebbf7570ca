mod gesummv;

pub use gesummv::Gesummv;
