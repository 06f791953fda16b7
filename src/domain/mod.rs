// Domain layer - pure data model, no I/O
pub mod descriptor;
pub mod partition;
pub mod sample;
pub mod series;
pub mod value;
