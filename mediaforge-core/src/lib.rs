//! # Mediaforge Core
//!
//! Core types and utilities for the Mediaforge export pipeline.
//!
//! This crate provides the fundamental building blocks used across all Mediaforge components:
//! - Error handling types
//! - Microsecond time handling with an explicit "unset" sentinel
//! - Rational numbers for timescales and frame rates
//! - Track and codec format descriptions
//! - Frame geometry transforms (scale + rotation output sizing)

pub mod error;
pub mod format;
pub mod geometry;
pub mod rational;
pub mod time;

pub use error::{ContainerError, Error, Result};
pub use format::{AudioCodec, CodecId, ContainerFormat, Format, TrackType, VideoCodec};
pub use geometry::{GeometryTransform, Size};
pub use rational::Rational;
pub use time::{DurationUs, TimeBase, TIME_UNSET};
