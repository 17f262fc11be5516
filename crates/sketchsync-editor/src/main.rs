//! Console editor entry point.

use anyhow::Context;
use clap::Parser;
use sketchsync_core::EditorCommunicator;
use sketchsync_editor::{ConsoleEditor, HelpRegistry, Input};
use std::io::{self, BufRead};

#[derive(Debug, Parser)]
#[command(name = "sketchsync-editor", version, about = "Console editor for SketchSync")]
struct Args {
    /// Server address.
    #[arg(long, env = "SKETCHSYNC_SERVER", default_value = "127.0.0.1:4242")]
    server: String,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let editor = ConsoleEditor::new(io::stdout());
    let view = editor.view();
    let mut comm = EditorCommunicator::connect(args.server.as_str(), editor)
        .with_context(|| format!("could not connect to {}", args.server))?;
    log::info!("connected to {}", comm.peer_addr());
    println!("{}", HelpRegistry::render());

    for line in io::stdin().lock().lines() {
        let line = line.context("could not read stdin")?;
        match Input::parse(&line) {
            Ok(None) => {}
            Ok(Some(Input::Help)) => println!("{}", HelpRegistry::render()),
            Ok(Some(Input::List)) => println!("{}", view.render()),
            Ok(Some(Input::At { x, y })) => match view.shape_at(x, y) {
                Some(id) => println!(
                    "#{id} {}",
                    view.describe(id).unwrap_or_default()
                ),
                None => println!("nothing at ({x}, {y})"),
            },
            Ok(Some(Input::Quit)) => break,
            Ok(Some(Input::Send(command))) => {
                if let Err(e) = comm.send(&command) {
                    log::error!("send failed: {}", e);
                    break;
                }
            }
            Err(e) => eprintln!("{e}"),
        }
        if !comm.is_connected() {
            eprintln!("server closed the connection");
            break;
        }
    }

    comm.disconnect();
    Ok(())
}
