pub mod belief;
pub mod model;
pub mod tree;
