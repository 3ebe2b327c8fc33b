pub mod brush;
pub mod composite;
pub mod fill;
pub mod shapes;
