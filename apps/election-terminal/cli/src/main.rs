//! `election-terminal` is a command-line client for the BUSA election
//! service. It follows the election live (phase changes and a countdown to
//! the close of voting), shows results, lets a signed-in voter cast votes,
//! and gives administrators access to the management endpoints.
//!
//! All authoritative state lives on the election service; the terminal only
//! remembers the signed-in voter and the last results it fetched, in a small
//! JSON state file.

#![warn(
    clippy::all,
    clippy::todo,
    clippy::empty_enum,
    clippy::enum_glob_use,
    clippy::mem_forget,
    clippy::unused_self,
    clippy::filter_map_next,
    clippy::needless_continue,
    clippy::needless_borrow,
    clippy::match_wildcard_for_single_variants,
    clippy::if_let_mutex,
    clippy::mismatched_target_os,
    clippy::await_holding_lock,
    clippy::match_on_vec_items,
    clippy::imprecise_flops,
    clippy::suboptimal_flops,
    clippy::lossy_float_literal,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::fn_params_excessive_bools,
    clippy::exit,
    clippy::inefficient_to_string,
    clippy::linkedlist,
    clippy::macro_use_imports,
    clippy::option_option,
    clippy::verbose_file_reads,
    clippy::unnested_or_patterns,
    clippy::str_to_string,
    rust_2018_idioms,
    future_incompatible,
    nonstandard_style,
    missing_debug_implementations,
    missing_docs
)]
#![deny(unreachable_pub)]
#![allow(elided_lifetimes_in_paths, clippy::type_complexity)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::float_cmp))]
#![cfg_attr(not(test), warn(clippy::dbg_macro))]

use clap::Parser;

mod api;
mod cache;
mod clock;
mod commands;
mod config;
mod countdown;
mod error;
mod log;
mod phase;
mod render;
mod results;
mod scheduled_task;
mod session;
mod store;
mod watcher;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();
    let config = config::Config::parse();
    log::setup(&config)?;
    commands::run(config).await
}
