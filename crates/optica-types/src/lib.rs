//! optica-types: order domain model and the ports the order core talks to.

pub mod domain;
pub mod ports;
