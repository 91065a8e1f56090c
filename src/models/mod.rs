mod budget;

pub use budget::*;
