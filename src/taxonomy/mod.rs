pub mod category;
pub mod registry;
pub mod subjects;
