// SPDX-License-Identifier: MIT

pub mod catalog;
pub mod demos;
pub mod server;
pub mod tools;
pub mod workflow;
