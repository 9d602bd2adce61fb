//! Azure Data Factory pipeline-status agent dashboards
//!
//! The [`driver`] runs one question through a hosted agent: it registers the
//! documentation MCP tool and the local ADF functions from [`tools`], polls the
//! run, answers approval and function-call pauses, and hands the run to
//! [`normalize`]. The terminal dashboard ([`app`] and [`ui`]), the browser
//! dashboard ([`web`]) and the `adf-ask` CLI are thin front ends over it.

pub mod adf;
pub mod app;
pub mod bootstrap;
pub mod config;
pub mod demo;
pub mod driver;
pub mod history;
pub mod logging;
pub mod normalize;
pub mod tools;
pub mod ui;
pub mod web;
