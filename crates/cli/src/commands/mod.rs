pub mod inspect;
pub mod predict;
