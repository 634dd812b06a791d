pub mod accessory;
pub mod dialog;
pub mod status_bar;
pub mod toolbar;
pub mod tree;
