/// Virtualized list module
///
/// A fixed pool of rows (row.rs) is moved and rebound by the
/// controller (controller.rs) as the user scrolls, using the
/// geometry in layout.rs.

pub mod controller;
pub mod layout;
pub mod row;

pub use controller::VirtualScrollController;
pub use layout::ListLayout;
pub use row::RowWidget;
