//
// main.rs
//
// Entry point of the tplink language server
//

mod backend;
mod handlers;
mod include_link;
mod parser_pool;
mod state;
mod utf16;

use std::env;

fn print_usage() {
    println!(
        "tplink {}, include links for template files.",
        env!("CARGO_PKG_VERSION")
    );
    print!(
        r#"
Usage: tplink [OPTIONS]

Available options:

--stdio                      Start the LSP server using stdio transport
--version                    Print the version
--help                       Print this help message

"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut argv = env::args();
    argv.next(); // skip executable name

    let mut use_stdio = false;

    for arg in argv {
        match arg.as_str() {
            "--stdio" => use_stdio = true,
            "--version" => {
                println!("tplink {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_usage();
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!("Unknown argument: '{other}'"));
            }
        }
    }

    if !use_stdio {
        print_usage();
        return Ok(());
    }

    env_logger::init();

    backend::start_lsp().await
}
