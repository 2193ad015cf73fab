pub mod address;
pub mod fragment;
pub mod report;
pub mod role;
pub mod send_order;
pub mod wire;
