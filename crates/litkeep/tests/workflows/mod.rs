use super::*;

mod batch;
mod filing;
mod resolution;
