pub mod user;
pub mod media;
pub mod transaction;
pub mod payment;

pub use user::*;
pub use media::*;
pub use transaction::*;
pub use payment::*;
