//! Mediaforged - command-line driver for ffmpeg and ffprobe
//!
//! This library crate exposes the subcommands and configuration for
//! integration testing.

pub mod commands;
pub mod config;
pub mod signals;
