pub mod lifecycle;
pub mod occupancy;
pub mod ranking;
pub mod utilization;
pub mod window;
