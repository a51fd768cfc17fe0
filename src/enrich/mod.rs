//! Derived and imputed data layered on top of cleaned tables.

pub mod city;
pub mod datetime;
pub mod geo;
pub mod injury;
pub mod keys;
pub mod stats;
