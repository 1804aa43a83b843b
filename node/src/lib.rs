// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod api;
pub mod callback;
pub mod config;
pub mod errors;
pub mod locator;
pub mod network;
pub mod orchestrator;
pub mod sandbox;
pub mod server;
pub mod telemetry;
