mod cli;

use cli::Termination;

#[tokio::main]
async fn main() {
    match cli::run().await {
        Ok(Termination::Normal) => {}
        Ok(Termination::Abnormal) => std::process::exit(1),
        Err(err) => {
            eprintln!("application error: {err}");
            std::process::exit(1);
        }
    }
}
