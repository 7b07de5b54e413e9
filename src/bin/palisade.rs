// Copyright 2026 the palisade authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#[macro_use]
extern crate clap;

use std::io;

use clap::{App, SubCommand};

use palisade::cli;

fn main() {
    env_logger::init();
    let matches = App::new(crate_name!())
        .version(crate_version!())
        .about(crate_description!())
        .subcommand(SubCommand::with_name("game").about("Configure and play a chess game"))
        .subcommand(
            SubCommand::with_name("benchmark")
                .about("Check the move generator against published perft counts"),
        )
        .get_matches();

    let outcome = if matches.subcommand_matches("game").is_some() {
        cli::setup_game()
    } else if matches.subcommand_matches("benchmark").is_some() {
        cli::run_benchmark();
        Ok(())
    } else {
        cli::Menu::new().run()
    };

    match outcome {
        Ok(()) => {}
        // Running out of piped input is a normal way to leave the menu.
        Err(ref err) if err.kind() == io::ErrorKind::UnexpectedEof => {}
        Err(err) => panic!("terminal input failed: {}", err),
    }
}
