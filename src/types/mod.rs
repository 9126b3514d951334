mod decimal;
mod timestamp;

pub use self::decimal::*;
pub use self::timestamp::*;
