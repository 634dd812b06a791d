pub mod change;
pub mod node;
pub mod operations;
pub mod tree;
pub mod view;
