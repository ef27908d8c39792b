mod app;
mod cli;
mod logging;
mod prompt;

use xfer::output as out;

fn main() {
    let args = cli::parse();
    if let Err(e) = app::run(args) {
        out::print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
