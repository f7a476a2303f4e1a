//! Resource collections and their schemas.

pub mod bootcamp;
pub mod course;
pub mod review;
