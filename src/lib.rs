// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate getset;
#[macro_use]
extern crate derive_new;
#[cfg(test)]
#[macro_use]
extern crate approx;

pub mod calling;
pub mod cli;
pub mod config;
pub mod errors;
pub mod estimation;
pub mod filtration;
pub mod reporting;
pub mod utils;
pub mod variants;

pub use crate::config::Config;
pub use crate::errors::Error;
