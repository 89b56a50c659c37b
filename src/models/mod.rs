pub mod diagnosis;
pub mod enums;
pub mod ids;
pub mod lab;
pub mod medication;
pub mod reservation;
pub mod staff;
pub mod user;
pub mod validation;
pub mod vital_sign;

pub use diagnosis::*;
pub use enums::*;
pub use lab::*;
pub use medication::*;
pub use reservation::*;
pub use staff::*;
pub use user::*;
pub use validation::ValidationError;
pub use vital_sign::*;
