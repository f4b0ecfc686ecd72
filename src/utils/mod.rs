pub mod dates;
pub mod table;

pub use table::Table;
