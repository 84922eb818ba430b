// SPDX-License-Identifier: MIT

pub mod search;

pub use search::TavilySearchTool;
