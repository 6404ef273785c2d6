//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: broker HTTP calls, SMTP
//! delivery, report files, and config file loading.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod broker;
pub mod config;
pub mod mail;
pub mod report_store;
