//! Manifest model and the workspace it describes.
pub mod entities;
pub mod value_objects;
