//! Filtering: sigma-point machinery and the UKF controller

pub mod sigma;
pub mod ukf;
