pub mod paging;
pub mod period;
pub mod validators;

pub use paging::page_window;
pub use period::Period;
