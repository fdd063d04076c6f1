//! This module contains preset celestial bodies to use in your simulation.
//!
//! Each moon preset takes the gravitational parameter of its parent.
//! If that is `None`, the body is created without an orbit.

pub mod saturn;
