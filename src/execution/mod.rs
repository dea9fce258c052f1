// Order intent derivation
pub mod position_model;

pub use position_model::PositionModel;
