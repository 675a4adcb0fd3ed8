// Domain models (JSON camelCase, matching the data file)

mod container;
mod document;
mod group;
mod schedule;

pub use container::Container;
pub use document::{
    DataDocument, Metadata, validate_container, validate_group, validate_schedule,
};
pub use group::Group;
pub use schedule::{Schedule, TargetType, Timer, parse_clock};
