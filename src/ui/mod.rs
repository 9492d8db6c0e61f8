/// Widgets for the image list
pub mod rows;
