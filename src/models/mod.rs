pub mod appointment;
pub mod doctor;
pub mod enums;
pub mod filters;
pub mod identity;
pub mod patient;
pub mod treatment;

pub use appointment::*;
pub use doctor::*;
pub use enums::*;
pub use filters::*;
pub use identity::*;
pub use patient::*;
pub use treatment::*;
