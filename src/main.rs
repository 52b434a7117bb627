use baker::ui::output;

fn main() {
    if let Err(err) = baker::cli::run() {
        output::error(format!("{err:#}"));
        std::process::exit(1);
    }
}
