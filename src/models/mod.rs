pub mod area;
pub mod contract;
pub mod invoice;
pub mod meter;
pub mod notification;
pub mod payment;
pub mod room;
pub mod support_request;
pub mod system_log;
pub mod tenant;
pub mod user;

pub use area::*;
pub use contract::*;
pub use invoice::*;
pub use meter::*;
pub use notification::*;
pub use payment::*;
pub use room::*;
pub use support_request::*;
pub use system_log::*;
pub use tenant::*;
pub use user::*;
