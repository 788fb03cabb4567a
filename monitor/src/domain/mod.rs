// Domain layer - session lifecycle, detection statistics, value objects
// No dependencies on other layers

pub mod aggregates;
pub mod value_objects;
pub mod events;

pub use aggregates::*;
pub use value_objects::*;
pub use events::*;
